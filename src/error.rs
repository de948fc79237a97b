//! Error types for kmodctl
use thiserror::Error;

use crate::kernel::lifecycle::Action;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("metadata unavailable for {name}: {reason}")]
    MetadataUnavailable { name: String, reason: String },

    #[error("resident module query failed: {0}")]
    ResidencyQueryFailed(String),

    #[error("failed to {action} module {name}")]
    MutationFailed {
        name: String,
        action: Action,
        reason: String,
    },

    #[error("controller session closed")]
    SessionClosed,

    #[error("unexpected {0} reply from controller session")]
    UnexpectedReply(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV into_inner error: {0}")]
    CsvIntoInner(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
