//! Operating-system services kmodctl queries and mutates
//!
//! The inventory logic never touches the host directly; it goes through
//! [`ModuleSystem`], which [`HostSystem`] implements with the usual module
//! tools and tests implement with an in-memory fake.
use crate::config::ControllerConfig;
use crate::error::ModuleError;
use crate::kernel::lifecycle::Action;
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod runner;

#[cfg(test)]
pub mod fake;

use runner::CommandRunner;

/// The external services behind module inventory and control.
pub trait ModuleSystem {
    /// Release identifier of the running kernel.
    fn kernel_release(&self) -> Result<String, ModuleError>;

    /// Paths beneath `root` whose file names end in one of `suffixes`.
    fn module_files(&self, root: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>, ModuleError>;

    /// Labeled metadata text for one module.
    fn module_info(&self, name: &str) -> Result<String, ModuleError>;

    /// Resident-module listing, one module per line after a header.
    fn resident_listing(&self) -> Result<String, ModuleError>;

    /// Privileged insert.
    fn insert(&self, name: &str) -> Result<(), ModuleError>;

    /// Privileged remove.
    fn remove(&self, name: &str, force: bool) -> Result<(), ModuleError>;
}

/// Adapter over `uname`, `modinfo`, `lsmod` and `modprobe`.
pub struct HostSystem {
    runner: CommandRunner,
    elevate: Option<String>,
}

impl HostSystem {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            runner: CommandRunner::new(config.command_timeout),
            elevate: config.elevate.clone(),
        }
    }

    fn run_privileged(&self, action: Action, name: &str, args: &[&str]) -> Result<(), ModuleError> {
        let failed = |reason: String| ModuleError::MutationFailed {
            name: name.to_string(),
            action,
            reason,
        };

        let output = match &self.elevate {
            Some(wrapper) => {
                let mut full = vec!["modprobe"];
                full.extend_from_slice(args);
                self.runner.run(wrapper, &full)
            }
            None => self.runner.run("modprobe", args),
        }
        .map_err(|e| failed(e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(failed(output.failure_reason()))
        }
    }
}

impl ModuleSystem for HostSystem {
    fn kernel_release(&self) -> Result<String, ModuleError> {
        let output = self
            .runner
            .run("uname", &["-r"])
            .map_err(|e| ModuleError::DiscoveryFailed(e.to_string()))?;
        if !output.success() {
            return Err(ModuleError::DiscoveryFailed(output.failure_reason()));
        }
        let release = output.stdout_str().trim().to_string();
        if release.is_empty() {
            return Err(ModuleError::DiscoveryFailed(
                "uname reported an empty kernel release".to_string(),
            ));
        }
        Ok(release)
    }

    fn module_files(&self, root: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>, ModuleError> {
        if !root.is_dir() {
            return Err(ModuleError::DiscoveryFailed(format!(
                "module directory {} does not exist",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let file_name = entry.file_name().to_string_lossy();
                    if suffixes.iter().any(|s| file_name.ends_with(s)) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => debug!("Error walking module directory: {}", e),
            }
        }
        Ok(files)
    }

    fn module_info(&self, name: &str) -> Result<String, ModuleError> {
        let unavailable = |reason: String| ModuleError::MetadataUnavailable {
            name: name.to_string(),
            reason,
        };
        let output = self
            .runner
            .run("modinfo", &[name])
            .map_err(|e| unavailable(e.to_string()))?;
        if output.success() {
            Ok(output.stdout_str())
        } else {
            Err(unavailable(output.failure_reason()))
        }
    }

    fn resident_listing(&self) -> Result<String, ModuleError> {
        let output = self
            .runner
            .run("lsmod", &[])
            .map_err(|e| ModuleError::ResidencyQueryFailed(e.to_string()))?;
        if output.success() {
            Ok(output.stdout_str())
        } else {
            Err(ModuleError::ResidencyQueryFailed(output.failure_reason()))
        }
    }

    fn insert(&self, name: &str) -> Result<(), ModuleError> {
        self.run_privileged(Action::Load, name, &[name])
    }

    fn remove(&self, name: &str, force: bool) -> Result<(), ModuleError> {
        if force {
            self.run_privileged(Action::Unload, name, &["-r", "-f", name])
        } else {
            self.run_privileged(Action::Unload, name, &["-r", name])
        }
    }
}
