//! In-memory module system used by unit tests
use super::ModuleSystem;
use crate::error::ModuleError;
use crate::kernel::lifecycle::Action;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    release: Option<String>,
    files: Vec<PathBuf>,
    info: BTreeMap<String, String>,
    resident: Vec<String>,
    listing_fails: bool,
    files_fail: bool,
    refuse: HashSet<String>,
    calls: Vec<String>,
}

/// Module system whose files, metadata and resident set live in memory.
///
/// Inserts and removes behave like the real tools: loading a resident module
/// or unloading a non-resident one fails.
pub struct FakeSystem {
    state: Mutex<State>,
}

impl FakeSystem {
    pub fn new(release: &str) -> Self {
        Self {
            state: Mutex::new(State {
                release: Some(release.to_string()),
                ..State::default()
            }),
        }
    }

    /// A system whose kernel-release query fails.
    pub fn without_release() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_file(self, path: &str) -> Self {
        self.state.lock().unwrap().files.push(PathBuf::from(path));
        self
    }

    pub fn with_info(self, name: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .info
            .insert(name.to_string(), text.to_string());
        self
    }

    pub fn with_resident(self, name: &str) -> Self {
        self.state.lock().unwrap().resident.push(name.to_string());
        self
    }

    pub fn failing_listing(self) -> Self {
        self.state.lock().unwrap().listing_fails = true;
        self
    }

    pub fn failing_files(self) -> Self {
        self.state.lock().unwrap().files_fail = true;
        self
    }

    /// Make every privileged action on `name` fail.
    pub fn refusing(self, name: &str) -> Self {
        self.state.lock().unwrap().refuse.insert(name.to_string());
        self
    }

    /// Simulate another actor loading a module behind the controller's back.
    pub fn load_externally(&self, name: &str) {
        self.state.lock().unwrap().resident.push(name.to_string());
    }

    pub fn is_resident(&self, name: &str) -> bool {
        self.state.lock().unwrap().resident.iter().any(|r| r == name)
    }

    /// Log of calls made against the fake, e.g. `"info usbcore"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ModuleSystem for FakeSystem {
    fn kernel_release(&self) -> Result<String, ModuleError> {
        self.record("release".to_string());
        self.state
            .lock()
            .unwrap()
            .release
            .clone()
            .ok_or_else(|| ModuleError::DiscoveryFailed("uname failed".to_string()))
    }

    fn module_files(&self, root: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>, ModuleError> {
        self.record(format!("files {}", root.display()));
        let state = self.state.lock().unwrap();
        if state.files_fail {
            return Err(ModuleError::DiscoveryFailed(format!(
                "module directory {} does not exist",
                root.display()
            )));
        }
        Ok(state
            .files
            .iter()
            .filter(|p| {
                let name = p.to_string_lossy();
                suffixes.iter().any(|s| name.ends_with(s))
            })
            .map(|p| root.join(p))
            .collect())
    }

    fn module_info(&self, name: &str) -> Result<String, ModuleError> {
        self.record(format!("info {}", name));
        self.state
            .lock()
            .unwrap()
            .info
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::MetadataUnavailable {
                name: name.to_string(),
                reason: format!("modinfo: ERROR: Module {} not found.", name),
            })
    }

    fn resident_listing(&self) -> Result<String, ModuleError> {
        self.record("listing".to_string());
        let state = self.state.lock().unwrap();
        if state.listing_fails {
            return Err(ModuleError::ResidencyQueryFailed("lsmod failed".to_string()));
        }
        let mut listing = String::from("Module                  Size  Used by\n");
        for name in &state.resident {
            listing.push_str(&format!("{:<24}{:>6}  0\n", name, 16384));
        }
        Ok(listing)
    }

    fn insert(&self, name: &str) -> Result<(), ModuleError> {
        self.record(format!("insert {}", name));
        let mut state = self.state.lock().unwrap();
        if state.refuse.contains(name) || state.resident.iter().any(|r| r == name) {
            return Err(ModuleError::MutationFailed {
                name: name.to_string(),
                action: Action::Load,
                reason: "modprobe exited with status 1".to_string(),
            });
        }
        state.resident.push(name.to_string());
        Ok(())
    }

    fn remove(&self, name: &str, force: bool) -> Result<(), ModuleError> {
        self.record(format!("remove {} force={}", name, force));
        let mut state = self.state.lock().unwrap();
        let position = state.resident.iter().position(|r| r == name);
        match position {
            Some(index) if !state.refuse.contains(name) => {
                state.resident.remove(index);
                Ok(())
            }
            _ => Err(ModuleError::MutationFailed {
                name: name.to_string(),
                action: Action::Unload,
                reason: format!("modprobe: FATAL: Module {} is not currently loaded", name),
            }),
        }
    }
}
