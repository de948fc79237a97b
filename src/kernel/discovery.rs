//! Installed module discovery
use crate::config::ControllerConfig;
use crate::error::ModuleError;
use crate::system::ModuleSystem;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Result of one discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub kernel_release: String,
    pub names: Vec<String>,
}

pub struct ModuleDiscoverer<'a> {
    config: &'a ControllerConfig,
}

impl<'a> ModuleDiscoverer<'a> {
    pub fn new(config: &'a ControllerConfig) -> Self {
        Self { config }
    }

    /// Search root for a kernel release, e.g. `/lib/modules/6.1.0-13-amd64`.
    pub fn search_root(&self, release: &str) -> PathBuf {
        self.config.modules_root.join(release)
    }

    /// Enumerate installed module names for the running (or configured) release.
    ///
    /// Names keep enumeration order; a name found twice keeps its first position.
    pub fn discover<S: ModuleSystem + ?Sized>(&self, system: &S) -> Result<Discovery, ModuleError> {
        let release = match &self.config.kernel_release {
            Some(release) => release.clone(),
            None => system.kernel_release()?,
        };
        let root = self.search_root(&release);
        let suffixes = self.config.suffixes();

        let files = system.module_files(&root, &suffixes)?;
        debug!("Found {} module files under {}", files.len(), root.display());

        let mut seen = HashSet::new();
        let names: Vec<String> = files
            .iter()
            .filter_map(|path| module_name(path, &suffixes))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        info!("Discovered {} modules for kernel {}", names.len(), release);
        Ok(Discovery {
            kernel_release: release,
            names,
        })
    }
}

/// Base name of a module file with its directory and module suffix removed.
pub fn module_name(path: &Path, suffixes: &[&str]) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    suffixes
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fake::FakeSystem;

    const SUFFIXES: &[&str] = &[".ko.zst", ".ko.xz", ".ko.gz", ".ko"];

    #[test]
    fn test_module_name_strips_compressed_suffix() {
        let path = Path::new("/lib/modules/6.1.0/kernel/fs/ext4/ext4.ko.zst");
        assert_eq!(module_name(path, SUFFIXES), Some("ext4".to_string()));
        assert_eq!(
            module_name(Path::new("snd-hda-intel.ko"), SUFFIXES),
            Some("snd-hda-intel".to_string())
        );
        assert_eq!(module_name(Path::new("modules.dep"), SUFFIXES), None);
        assert_eq!(module_name(Path::new(".ko"), SUFFIXES), None);
    }

    #[test]
    fn test_discover_uses_running_release() {
        let system = FakeSystem::new("6.1.0-test")
            .with_file("kernel/drivers/usb/core/usbcore.ko.xz")
            .with_file("kernel/fs/ext4/ext4.ko");
        let config = ControllerConfig::default();

        let discovery = ModuleDiscoverer::new(&config).discover(&system).unwrap();
        assert_eq!(discovery.kernel_release, "6.1.0-test");
        assert_eq!(discovery.names, vec!["usbcore", "ext4"]);
        assert!(system
            .calls()
            .contains(&"files /lib/modules/6.1.0-test".to_string()));
    }

    #[test]
    fn test_discover_release_override_skips_query() {
        let system = FakeSystem::without_release().with_file("kernel/fs/xfs/xfs.ko");
        let config = ControllerConfig {
            kernel_release: Some("5.15.0-custom".to_string()),
            ..ControllerConfig::default()
        };

        let discovery = ModuleDiscoverer::new(&config).discover(&system).unwrap();
        assert_eq!(discovery.names, vec!["xfs"]);
        assert!(!system.calls().contains(&"release".to_string()));
    }

    #[test]
    fn test_discover_collapses_duplicates() {
        let system = FakeSystem::new("6.1.0")
            .with_file("updates/dkms/zfs.ko")
            .with_file("kernel/fs/ext4/ext4.ko")
            .with_file("extra/zfs.ko.zst");
        let config = ControllerConfig::default();

        let discovery = ModuleDiscoverer::new(&config).discover(&system).unwrap();
        assert_eq!(discovery.names, vec!["zfs", "ext4"]);
    }

    #[test]
    fn test_discover_failures() {
        let config = ControllerConfig::default();

        let no_release = FakeSystem::without_release();
        let err = ModuleDiscoverer::new(&config).discover(&no_release).unwrap_err();
        assert!(matches!(err, ModuleError::DiscoveryFailed(_)));

        let no_root = FakeSystem::new("6.1.0").failing_files();
        let err = ModuleDiscoverer::new(&config).discover(&no_root).unwrap_err();
        assert!(matches!(err, ModuleError::DiscoveryFailed(_)));
    }
}
