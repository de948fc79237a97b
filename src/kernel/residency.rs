//! Resident (loaded) module checks
use crate::config::MatchMode;
use crate::system::ModuleSystem;
use log::warn;

/// Parsed resident-module listing.
///
/// `lines` keeps the header: substring matching scans the listing exactly as
/// printed, while name matching starts after it.
#[derive(Debug, Clone, Default)]
pub struct ResidentModules {
    lines: Vec<String>,
    mode: Option<MatchMode>,
}

impl ResidentModules {
    /// Parse lsmod-style output whose first line is a column header.
    pub fn parse(listing: &str, mode: MatchMode) -> Self {
        let lines = listing
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            lines,
            mode: Some(mode),
        }
    }

    /// Listing used when the query failed: nothing is resident.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .skip(1)
            .filter_map(|l| l.split_whitespace().next())
    }

    pub fn contains(&self, name: &str) -> bool {
        match self.mode {
            Some(MatchMode::Exact) => {
                let wanted = normalize(name);
                self.names().any(|resident| normalize(resident) == wanted)
            }
            Some(MatchMode::Substring) => self.lines.iter().any(|l| l.contains(name)),
            None => false,
        }
    }
}

/// The kernel reports `snd_hda_intel` for the file `snd-hda-intel.ko`.
fn normalize(name: &str) -> String {
    name.replace('-', "_")
}

pub struct ResidencyChecker<'a, S: ?Sized> {
    system: &'a S,
    mode: MatchMode,
}

impl<'a, S: ModuleSystem + ?Sized> ResidencyChecker<'a, S> {
    pub fn new(system: &'a S, mode: MatchMode) -> Self {
        Self { system, mode }
    }

    /// One resident listing; a failed query yields an empty one.
    pub fn resident_modules(&self) -> ResidentModules {
        match self.system.resident_listing() {
            Ok(listing) => ResidentModules::parse(&listing, self.mode),
            Err(e) => {
                warn!("{}; treating all modules as not loaded", e);
                ResidentModules::unavailable()
            }
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.resident_modules().contains(name)
    }
}
