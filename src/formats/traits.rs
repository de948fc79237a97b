//! Output format traits for kmodctl
use crate::error::ModuleError;
use crate::kernel::controller::ActionOutcome;
use crate::kernel::{ModuleRecord, Snapshot};

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Render `modules`, a view over `snapshot`.
    fn format_modules(&self, snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<String, ModuleError>;

    /// Render the result of a load or unload request.
    fn format_outcome(&self, outcome: &ActionOutcome) -> Result<String, ModuleError>;
}

/// Enum for output format types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
    Jsonl,
}

/// Enum for output destination
#[derive(Debug, Clone)]
pub enum OutputDestination {
    Stdout,
    File(std::path::PathBuf),
}

/// Output writer that combines format and destination
pub struct OutputWriter {
    formatter: Box<dyn OutputFormatter>,
    format: OutputFormat,
    destination: OutputDestination,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, destination: OutputDestination) -> Self {
        let formatter: Box<dyn OutputFormatter> = match format {
            OutputFormat::Text => Box::new(crate::formats::text::TextFormatter),
            OutputFormat::Csv => Box::new(crate::formats::csv::CsvFormatter),
            OutputFormat::Json => Box::new(crate::formats::json::JsonFormatter),
            OutputFormat::Jsonl => Box::new(crate::formats::jsonl::JsonlFormatter),
        };

        Self {
            formatter,
            format,
            destination,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Whether output lands on the terminal, where notices and spinners belong.
    pub fn is_stdout(&self) -> bool {
        matches!(self.destination, OutputDestination::Stdout)
    }

    /// Write modules to the configured destination
    pub fn write_modules(&self, snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<(), ModuleError> {
        let content = self.formatter.format_modules(snapshot, modules)?;
        self.emit(content)
    }

    /// Write an action outcome to the configured destination
    pub fn write_outcome(&self, outcome: &ActionOutcome) -> Result<(), ModuleError> {
        let content = self.formatter.format_outcome(outcome)?;
        self.emit(content)
    }

    fn emit(&self, content: String) -> Result<(), ModuleError> {
        match &self.destination {
            OutputDestination::Stdout => {
                println!("{}", content.trim_end());
            }
            OutputDestination::File(path) => {
                std::fs::write(path, content)?;
            }
        }

        Ok(())
    }
}
