//! Static module metadata from the module-info source
use crate::kernel::{DESCRIPTION_NOT_FOUND, NO_OPTIONS};
use crate::system::ModuleSystem;
use log::{debug, warn};

const DESCRIPTION_LABEL: &str = "description";
const PARAMETER_LABEL: &str = "parm";
const PARAMETER_SEPARATOR: &str = "; ";

/// Description and parameters of one module, sentinels included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub description: String,
    pub parameters: String,
}

impl ModuleMetadata {
    fn unavailable() -> Self {
        Self {
            description: DESCRIPTION_NOT_FOUND.to_string(),
            parameters: NO_OPTIONS.to_string(),
        }
    }
}

pub struct MetadataProber<'a, S: ?Sized> {
    system: &'a S,
}

impl<'a, S: ModuleSystem + ?Sized> MetadataProber<'a, S> {
    pub fn new(system: &'a S) -> Self {
        Self { system }
    }

    pub fn describe(&self, name: &str) -> String {
        self.probe(name).description
    }

    pub fn options(&self, name: &str) -> String {
        self.probe(name).parameters
    }

    /// One module-info query, both fields extracted. Never fails.
    pub fn probe(&self, name: &str) -> ModuleMetadata {
        match self.system.module_info(name) {
            Ok(text) => parse_metadata(&text),
            Err(e) => {
                warn!("{}", e);
                ModuleMetadata::unavailable()
            }
        }
    }
}

/// Split `label: value` at the first colon.
fn field(line: &str) -> Option<(&str, &str)> {
    let (label, value) = line.split_once(':')?;
    Some((label.trim(), value.trim()))
}

/// Extract the description and parameter declarations from module-info text.
pub fn parse_metadata(text: &str) -> ModuleMetadata {
    let mut description = None;
    let mut parameters = String::new();

    // A label with an empty value counts as absent.
    for (label, value) in text.lines().filter_map(field).filter(|(_, v)| !v.is_empty()) {
        match label {
            DESCRIPTION_LABEL if description.is_none() => description = Some(value.to_string()),
            PARAMETER_LABEL => {
                parameters.push_str(value);
                parameters.push_str(PARAMETER_SEPARATOR);
            }
            _ => {}
        }
    }

    if description.is_none() {
        debug!("module info has no description field");
    }

    ModuleMetadata {
        description: description.unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string()),
        parameters: if parameters.is_empty() {
            NO_OPTIONS.to_string()
        } else {
            parameters
        },
    }
}
