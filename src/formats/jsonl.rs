//! JSONL (JSON Lines) output formatter for kmodctl
use crate::error::ModuleError;
use crate::formats::json::OutcomeWrapper;
use crate::formats::traits::OutputFormatter;
use crate::kernel::controller::ActionOutcome;
use crate::kernel::{ModuleRecord, Snapshot};

/// JSONL formatter that outputs data as JSON objects, one per line
pub struct JsonlFormatter;

impl OutputFormatter for JsonlFormatter {
    fn format_modules(&self, _snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<String, ModuleError> {
        let mut output = String::new();

        for module in modules {
            let line = serde_json::to_string(module)?;
            output.push_str(&line);
            output.push('\n');
        }

        Ok(output)
    }

    fn format_outcome(&self, outcome: &ActionOutcome) -> Result<String, ModuleError> {
        let mut output = serde_json::to_string(&OutcomeWrapper::new(outcome))?;
        output.push('\n');
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::fixtures;

    #[test]
    fn test_one_record_per_line() {
        let snapshot = fixtures::snapshot();
        let output = JsonlFormatter
            .format_modules(&snapshot, snapshot.records())
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            r#"{"name":"ext4","description":"not found","parameters":"no options","loaded":false}"#
        );
    }
}
