//! Worker-thread session around an inventory controller
//!
//! The controller blocks on external processes, so interactive front ends hand
//! it to a [`Session`]. Requests are processed one at a time on the worker;
//! each reply carries the sequence number of its request so a caller that gave
//! up on an earlier request can drop the stale reply when it arrives.
use crate::error::ModuleError;
use crate::kernel::controller::{ActionOutcome, InventoryController};
use crate::kernel::lifecycle::Action;
use crate::kernel::Snapshot;
use crate::system::ModuleSystem;
use log::{debug, error};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Refresh,
    Apply(Action, String),
}

#[derive(Debug)]
pub enum Reply {
    Snapshot(Arc<Snapshot>),
    Outcome(ActionOutcome),
}

impl Reply {
    pub fn snapshot(&self) -> Arc<Snapshot> {
        match self {
            Reply::Snapshot(snapshot) => Arc::clone(snapshot),
            Reply::Outcome(outcome) => Arc::clone(&outcome.snapshot),
        }
    }

    /// The outcome of an `Apply` request. Any other reply means the worker
    /// paired a request with the wrong reply kind.
    pub fn into_outcome(self) -> Result<ActionOutcome, ModuleError> {
        match self {
            Reply::Outcome(outcome) => Ok(outcome),
            Reply::Snapshot(_) => {
                error!("session answered an apply request with a snapshot");
                Err(ModuleError::UnexpectedReply("snapshot"))
            }
        }
    }
}

enum Envelope {
    Request(u64, Request),
    Shutdown,
}

pub struct Session {
    requests: Sender<Envelope>,
    replies: Receiver<(u64, Reply)>,
    next_id: u64,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Move `controller` onto a worker thread.
    pub fn spawn<S>(mut controller: InventoryController<S>) -> Self
    where
        S: ModuleSystem + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Envelope>();
        let (reply_tx, reply_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            while let Ok(Envelope::Request(id, request)) = request_rx.recv() {
                debug!("session request #{}: {:?}", id, request);
                let reply = match request {
                    Request::Refresh => Reply::Snapshot(controller.refresh()),
                    Request::Apply(action, name) => Reply::Outcome(controller.request(action, &name)),
                };
                if reply_tx.send((id, reply)).is_err() {
                    break;
                }
            }
            debug!("session worker stopped");
        });

        Self {
            requests: request_tx,
            replies: reply_rx,
            next_id: 0,
            worker: Some(worker),
        }
    }

    /// Queue a request and return its sequence number.
    pub fn submit(&mut self, request: Request) -> Result<u64, ModuleError> {
        self.next_id += 1;
        let id = self.next_id;
        self.requests
            .send(Envelope::Request(id, request))
            .map_err(|_| ModuleError::SessionClosed)?;
        Ok(id)
    }

    /// Wait for the reply to request `id`, discarding replies to older ones.
    ///
    /// `Ok(None)` means the timeout elapsed first; the reply may still arrive
    /// later and will be discarded by the next wait.
    pub fn wait_for(&self, id: u64, timeout: Option<Duration>) -> Result<Option<Reply>, ModuleError> {
        loop {
            let received = match timeout {
                Some(timeout) => match self.replies.recv_timeout(timeout) {
                    Ok(reply) => reply,
                    Err(RecvTimeoutError::Timeout) => return Ok(None),
                    Err(RecvTimeoutError::Disconnected) => return Err(ModuleError::SessionClosed),
                },
                None => self.replies.recv().map_err(|_| ModuleError::SessionClosed)?,
            };
            match received {
                (reply_id, reply) if reply_id == id => return Ok(Some(reply)),
                (reply_id, _) => debug!("discarding stale reply #{}", reply_id),
            }
        }
    }

    /// Submit and block until the matching reply arrives.
    pub fn call(&mut self, request: Request) -> Result<Reply, ModuleError> {
        let id = self.submit(request)?;
        self.wait_for(id, None)?.ok_or(ModuleError::SessionClosed)
    }

    pub fn refresh(&mut self) -> Result<Arc<Snapshot>, ModuleError> {
        Ok(self.call(Request::Refresh)?.snapshot())
    }

    pub fn apply(&mut self, action: Action, name: &str) -> Result<ActionOutcome, ModuleError> {
        self.call(Request::Apply(action, name.to_string()))?
            .into_outcome()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.requests.send(Envelope::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("session worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::system::fake::FakeSystem;

    fn session() -> Session {
        let system = FakeSystem::new("6.1.0")
            .with_file("kernel/fs/ext4/ext4.ko")
            .with_file("kernel/net/dummy.ko")
            .with_resident("ext4");
        Session::spawn(InventoryController::new(system, ControllerConfig::default()))
    }

    #[test]
    fn test_refresh_through_session() {
        let mut session = session();
        let snapshot = session.refresh().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("ext4").unwrap().loaded);
    }

    #[test]
    fn test_apply_through_session() {
        let mut session = session();
        let outcome = session.apply(Action::Load, "dummy").unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.record().unwrap().loaded);

        let outcome = session.apply(Action::Unload, "missing").unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_reply_is_not_an_outcome() {
        let mut session = session();
        let reply = Reply::Snapshot(session.refresh().unwrap());
        let err = reply.into_outcome().unwrap_err();
        assert!(matches!(err, ModuleError::UnexpectedReply("snapshot")));
        assert_eq!(err.to_string(), "unexpected snapshot reply from controller session");
    }

    #[test]
    fn test_stale_replies_are_discarded() {
        let mut session = session();
        let stale = session.submit(Request::Apply(Action::Load, "dummy".to_string())).unwrap();
        let fresh = session.submit(Request::Refresh).unwrap();
        assert!(fresh > stale);

        match session.wait_for(fresh, None).unwrap() {
            Some(Reply::Snapshot(snapshot)) => assert!(snapshot.get("dummy").unwrap().loaded),
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
