//! Kernel module inventory model
use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod controller;
pub mod discovery;
pub mod lifecycle;
pub mod metadata;
pub mod residency;

use lifecycle::Action;

/// Description used when the metadata source has none.
pub const DESCRIPTION_NOT_FOUND: &str = "not found";

/// Parameters value used when a module declares none.
pub const NO_OPTIONS: &str = "no options";

/// Observed residency of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Loaded,
    Unloaded,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ModuleState::Loaded => write!(f, "loaded"),
            ModuleState::Unloaded => write!(f, "unloaded"),
        }
    }
}

/// Structure to hold one installed module's information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub name: String,
    pub description: String,
    pub parameters: String,
    pub loaded: bool,
}

impl ModuleRecord {
    pub fn state(&self) -> ModuleState {
        if self.loaded {
            ModuleState::Loaded
        } else {
            ModuleState::Unloaded
        }
    }

    /// The one transition that makes sense from the observed state.
    pub fn available_action(&self) -> Action {
        if self.loaded {
            Action::Unload
        } else {
            Action::Load
        }
    }
}

/// Why a snapshot holds no modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum InventoryNotice {
    DiscoveryFailed(String),
    NoModulesFound,
}

impl std::fmt::Display for InventoryNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InventoryNotice::DiscoveryFailed(reason) => {
                write!(f, "No kernel modules found: {}", reason)
            }
            InventoryNotice::NoModulesFound => write!(f, "No kernel modules found."),
        }
    }
}

/// Immutable point-in-time inventory. Replaced, never patched.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    kernel_release: Option<String>,
    taken_at: DateTime<Utc>,
    notice: Option<InventoryNotice>,
    modules: Vec<ModuleRecord>,
}

impl Snapshot {
    pub(crate) fn new(kernel_release: Option<String>, modules: Vec<ModuleRecord>) -> Self {
        let notice = if modules.is_empty() {
            Some(InventoryNotice::NoModulesFound)
        } else {
            None
        };
        Self {
            kernel_release,
            taken_at: Utc::now(),
            notice,
            modules,
        }
    }

    pub(crate) fn unavailable(kernel_release: Option<String>, notice: InventoryNotice) -> Self {
        Self {
            kernel_release,
            taken_at: Utc::now(),
            notice: Some(notice),
            modules: Vec::new(),
        }
    }

    /// Snapshot that exists before the first refresh.
    pub(crate) fn empty() -> Self {
        Self::new(None, Vec::new())
    }

    pub fn records(&self) -> &[ModuleRecord] {
        &self.modules
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn kernel_release(&self) -> Option<&str> {
        self.kernel_release.as_deref()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn notice(&self) -> Option<&InventoryNotice> {
        self.notice.as_ref()
    }

    /// Records passing `keep`, in snapshot order.
    pub fn filtered<F>(&self, keep: F) -> Vec<ModuleRecord>
    where
        F: Fn(&ModuleRecord) -> bool,
    {
        self.modules.iter().filter(|m| keep(m)).cloned().collect()
    }
}
