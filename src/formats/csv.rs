//! CSV output formatter for kmodctl
use crate::error::ModuleError;
use crate::formats::traits::OutputFormatter;
use crate::kernel::controller::ActionOutcome;
use crate::kernel::{ModuleRecord, Snapshot};
use csv::Writer;

/// CSV formatter that outputs data in comma-separated values format
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn format_modules(&self, _snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<String, ModuleError> {
        let mut wtr = Writer::from_writer(vec![]);

        // Write header
        wtr.write_record(["name", "description", "parameters", "loaded"])?;

        // Write data rows
        for module in modules {
            wtr.write_record([
                module.name.as_str(),
                module.description.as_str(),
                module.parameters.as_str(),
                if module.loaded { "true" } else { "false" },
            ])?;
        }

        wtr.flush()?;
        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }

    fn format_outcome(&self, outcome: &ActionOutcome) -> Result<String, ModuleError> {
        let mut wtr = Writer::from_writer(vec![]);

        wtr.write_record(["action", "name", "success", "loaded", "message"])?;
        wtr.write_record([
            outcome.action.to_string(),
            outcome.name.clone(),
            outcome.succeeded().to_string(),
            outcome
                .record()
                .map(|r| r.loaded.to_string())
                .unwrap_or_default(),
            outcome.message(),
        ])?;

        wtr.flush()?;
        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::fixtures;

    #[test]
    fn test_csv_modules() {
        let snapshot = fixtures::snapshot();
        let output = CsvFormatter
            .format_modules(&snapshot, snapshot.records())
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "name,description,parameters,loaded");
        assert_eq!(
            lines[1],
            "usbcore,USB core driver,autosuspend:default autosuspend delay (int); ,true"
        );
        assert_eq!(lines[2], "ext4,not found,no options,false");
    }

    #[test]
    fn test_csv_outcome() {
        let output = CsvFormatter.format_outcome(&fixtures::outcome()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "load,usbcore,true,true,Module usbcore loaded successfully.");
    }
}
