//! Text (table) output formatter for kmodctl
use crate::error::ModuleError;
use crate::formats::traits::OutputFormatter;
use crate::kernel::controller::ActionOutcome;
use crate::kernel::{ModuleRecord, Snapshot};
use prettytable::{Cell, Row, Table};

/// Text formatter that outputs data in a human-readable table format
pub struct TextFormatter;

fn module_table(modules: &[ModuleRecord]) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    // Header
    table.set_titles(Row::new(vec![
        Cell::new("MODULE").style_spec("c"),
        Cell::new("DESCRIPTION").style_spec("c"),
        Cell::new("OPTIONS").style_spec("c"),
        Cell::new("STATE").style_spec("c"),
        Cell::new("ACTION").style_spec("c"),
    ]));

    // Data rows
    for module in modules {
        table.add_row(Row::new(vec![
            Cell::new(&module.name),
            Cell::new(&module.description),
            Cell::new(module.parameters.trim_end()),
            Cell::new(&module.state().to_string()),
            Cell::new(&module.available_action().to_string()),
        ]));
    }

    table
}

impl OutputFormatter for TextFormatter {
    fn format_modules(&self, snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<String, ModuleError> {
        if let Some(notice) = snapshot.notice() {
            return Ok(notice.to_string());
        }
        if modules.is_empty() {
            return Ok("No modules match the specified criteria.".to_string());
        }

        let mut output = module_table(modules).to_string();
        let loaded = modules.iter().filter(|m| m.loaded).count();
        output.push_str(&format!(
            "{} modules ({} loaded) for kernel {} at {}\n",
            modules.len(),
            loaded,
            snapshot.kernel_release().unwrap_or("unknown"),
            snapshot.taken_at().format("%Y-%m-%d %H:%M:%S UTC"),
        ));
        Ok(output)
    }

    fn format_outcome(&self, outcome: &ActionOutcome) -> Result<String, ModuleError> {
        let mut output = outcome.message();
        output.push('\n');
        if let Some(record) = outcome.record() {
            output.push_str(&module_table(std::slice::from_ref(record)).to_string());
        }
        Ok(output)
    }
}
