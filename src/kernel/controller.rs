//! Inventory controller: snapshot construction and mediated transitions
use crate::config::ControllerConfig;
use crate::error::ModuleError;
use crate::kernel::discovery::ModuleDiscoverer;
use crate::kernel::lifecycle::{Action, LifecycleMutator};
use crate::kernel::metadata::MetadataProber;
use crate::kernel::residency::ResidencyChecker;
use crate::kernel::{InventoryNotice, ModuleRecord, Snapshot};
use crate::system::ModuleSystem;
use log::{info, warn};
use std::sync::Arc;

/// Result of a requested load or unload, with the snapshot taken after it.
#[derive(Debug)]
pub struct ActionOutcome {
    pub action: Action,
    pub name: String,
    pub result: Result<(), ModuleError>,
    pub snapshot: Arc<Snapshot>,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Record for the target module in the refreshed snapshot, if installed.
    pub fn record(&self) -> Option<&ModuleRecord> {
        self.snapshot.get(&self.name)
    }

    /// User-facing notification line.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(()) => format!("Module {} {}ed successfully.", self.name, self.action),
            Err(ModuleError::MutationFailed { reason, .. }) => {
                format!("Failed to {} module {}: {}", self.action, self.name, reason)
            }
            Err(e) => format!("Failed to {} module {}: {}", self.action, self.name, e),
        }
    }
}

/// Sole owner and writer of the current snapshot.
///
/// Operations run sequentially and are not re-entrant; `&mut self` on every
/// operation enforces that at compile time.
pub struct InventoryController<S> {
    system: S,
    config: ControllerConfig,
    current: Arc<Snapshot>,
}

impl<S: ModuleSystem> InventoryController<S> {
    pub fn new(system: S, config: ControllerConfig) -> Self {
        Self {
            system,
            config,
            current: Arc::new(Snapshot::empty()),
        }
    }

    /// Latest snapshot, without querying anything.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// Re-derive the whole inventory and replace the current snapshot.
    pub fn refresh(&mut self) -> Arc<Snapshot> {
        let snapshot = Arc::new(self.build_snapshot());
        self.current = Arc::clone(&snapshot);
        snapshot
    }

    /// Record for `name` in the current snapshot.
    pub fn lookup(&self, name: &str) -> Option<ModuleRecord> {
        self.current.get(name).cloned()
    }

    pub fn request_load(&mut self, name: &str) -> ActionOutcome {
        self.request(Action::Load, name)
    }

    pub fn request_unload(&mut self, name: &str) -> ActionOutcome {
        self.request(Action::Unload, name)
    }

    /// Run the mutation, then refresh whether it succeeded or not.
    pub fn request(&mut self, action: Action, name: &str) -> ActionOutcome {
        let mutator = LifecycleMutator::new(&self.system, self.config.force_remove);
        let result = mutator.apply(action, name);
        let snapshot = self.refresh();
        ActionOutcome {
            action,
            name: name.to_string(),
            result,
            snapshot,
        }
    }

    fn build_snapshot(&self) -> Snapshot {
        let discovery = match ModuleDiscoverer::new(&self.config).discover(&self.system) {
            Ok(discovery) => discovery,
            Err(e) => {
                warn!("{}", e);
                let reason = match e {
                    ModuleError::DiscoveryFailed(reason) => reason,
                    other => other.to_string(),
                };
                return Snapshot::unavailable(
                    self.config.kernel_release.clone(),
                    InventoryNotice::DiscoveryFailed(reason),
                );
            }
        };

        if discovery.names.is_empty() {
            info!("No modules found for kernel {}", discovery.kernel_release);
            return Snapshot::new(Some(discovery.kernel_release), Vec::new());
        }

        let prober = MetadataProber::new(&self.system);
        let resident = ResidencyChecker::new(&self.system, self.config.match_mode).resident_modules();

        let records: Vec<ModuleRecord> = discovery
            .names
            .into_iter()
            .map(|name| {
                let metadata = prober.probe(&name);
                let loaded = resident.contains(&name);
                ModuleRecord {
                    name,
                    description: metadata.description,
                    parameters: metadata.parameters,
                    loaded,
                }
            })
            .collect();

        info!(
            "Snapshot built: {} modules, {} loaded",
            records.len(),
            records.iter().filter(|r| r.loaded).count()
        );
        Snapshot::new(Some(discovery.kernel_release), records)
    }
}
