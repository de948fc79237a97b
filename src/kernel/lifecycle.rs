//! Privileged load/unload pass-through
use crate::error::ModuleError;
use crate::system::ModuleSystem;
use log::{error, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Load,
    Unload,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Action::Load => write!(f, "load"),
            Action::Unload => write!(f, "unload"),
        }
    }
}

/// Performs no precondition checks: loading a loaded module or unloading an
/// unloaded one is left to the system to reject.
pub struct LifecycleMutator<'a, S: ?Sized> {
    system: &'a S,
    force_remove: bool,
}

impl<'a, S: ModuleSystem + ?Sized> LifecycleMutator<'a, S> {
    pub fn new(system: &'a S, force_remove: bool) -> Self {
        Self {
            system,
            force_remove,
        }
    }

    pub fn load(&self, name: &str) -> Result<(), ModuleError> {
        self.apply(Action::Load, name)
    }

    pub fn unload(&self, name: &str) -> Result<(), ModuleError> {
        self.apply(Action::Unload, name)
    }

    pub fn apply(&self, action: Action, name: &str) -> Result<(), ModuleError> {
        let result = match action {
            Action::Load => self.system.insert(name),
            Action::Unload => self.system.remove(name, self.force_remove),
        };

        match result {
            Ok(()) => {
                info!("{} {}: ok", action, name);
                Ok(())
            }
            Err(ModuleError::MutationFailed { reason, .. }) => {
                error!("{} {} failed: {}", action, name, reason);
                Err(ModuleError::MutationFailed {
                    name: name.to_string(),
                    action,
                    reason,
                })
            }
            Err(other) => {
                error!("{} {} failed: {}", action, name, other);
                Err(ModuleError::MutationFailed {
                    name: name.to_string(),
                    action,
                    reason: other.to_string(),
                })
            }
        }
    }
}
