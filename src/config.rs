//! Controller configuration for kmodctl
use std::path::PathBuf;
use std::time::Duration;

/// Root under which per-release module trees are installed.
pub const DEFAULT_MODULES_ROOT: &str = "/lib/modules";

/// Default timeout for any single external query or action, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Module file suffixes recognized during discovery, longest first.
pub const DEFAULT_MODULE_SUFFIXES: &[&str] = &[".ko.zst", ".ko.xz", ".ko.gz", ".ko"];

/// How a module name is matched against the resident listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// First field of a listing line, with `-` and `_` treated as equal.
    Exact,
    /// Raw containment anywhere in the listing, header line included.
    Substring,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub modules_root: PathBuf,
    /// Skip the kernel-release query and use this release instead.
    pub kernel_release: Option<String>,
    pub module_suffixes: Vec<String>,
    pub command_timeout: Duration,
    /// Program prefixed to privileged actions (e.g. `sudo`).
    pub elevate: Option<String>,
    pub force_remove: bool,
    pub match_mode: MatchMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            modules_root: PathBuf::from(DEFAULT_MODULES_ROOT),
            kernel_release: None,
            module_suffixes: DEFAULT_MODULE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            command_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            elevate: None,
            force_remove: true,
            match_mode: MatchMode::Exact,
        }
    }
}

impl ControllerConfig {
    /// Suffixes ordered longest first so `.ko.zst` wins over `.ko`.
    pub fn suffixes(&self) -> Vec<&str> {
        let mut suffixes: Vec<&str> = self.module_suffixes.iter().map(|s| s.as_str()).collect();
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
        suffixes
    }
}
