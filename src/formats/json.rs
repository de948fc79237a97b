//! JSON output formatter for kmodctl
use crate::error::ModuleError;
use crate::formats::traits::OutputFormatter;
use crate::kernel::controller::ActionOutcome;
use crate::kernel::lifecycle::Action;
use crate::kernel::{InventoryNotice, ModuleRecord, Snapshot};

#[derive(serde::Serialize)]
struct OutputWrapper<'a> {
    kernel_release: Option<&'a str>,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a InventoryNotice>,
    count: usize,
    modules: &'a [ModuleRecord],
}

#[derive(serde::Serialize)]
pub(crate) struct OutcomeWrapper<'a> {
    action: Action,
    name: &'a str,
    success: bool,
    message: String,
    timestamp: String,
    module: Option<&'a ModuleRecord>,
}

impl<'a> OutcomeWrapper<'a> {
    pub(crate) fn new(outcome: &'a ActionOutcome) -> Self {
        Self {
            action: outcome.action,
            name: &outcome.name,
            success: outcome.succeeded(),
            message: outcome.message(),
            timestamp: outcome.snapshot.taken_at().to_rfc3339(),
            module: outcome.record(),
        }
    }
}

/// JSON formatter that outputs data in JSON format with metadata
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_modules(&self, snapshot: &Snapshot, modules: &[ModuleRecord]) -> Result<String, ModuleError> {
        let wrapper = OutputWrapper {
            kernel_release: snapshot.kernel_release(),
            timestamp: snapshot.taken_at().to_rfc3339(),
            notice: snapshot.notice(),
            count: modules.len(),
            modules,
        };

        let json = serde_json::to_string_pretty(&wrapper)?;
        Ok(json)
    }

    fn format_outcome(&self, outcome: &ActionOutcome) -> Result<String, ModuleError> {
        let json = serde_json::to_string_pretty(&OutcomeWrapper::new(outcome))?;
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::fixtures;
    use serde_json::Value;

    #[test]
    fn test_json_modules_wrapper() {
        let snapshot = fixtures::snapshot();
        let output = JsonFormatter
            .format_modules(&snapshot, &snapshot.records()[..1])
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["kernel_release"], "6.1.0-test");
        assert_eq!(value["count"], 1);
        assert_eq!(value["modules"][0]["name"], "usbcore");
        assert_eq!(value["modules"][0]["loaded"], true);
        assert!(value.get("notice").is_none());
    }

    #[test]
    fn test_json_notice() {
        let snapshot = Snapshot::unavailable(
            None,
            InventoryNotice::DiscoveryFailed("module directory /x does not exist".to_string()),
        );
        let output = JsonFormatter.format_modules(&snapshot, &[]).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["count"], 0);
        assert_eq!(value["notice"]["kind"], "discovery_failed");
    }

    #[test]
    fn test_json_outcome() {
        let output = JsonFormatter.format_outcome(&fixtures::outcome()).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["action"], "load");
        assert_eq!(value["success"], true);
        assert_eq!(value["module"]["name"], "usbcore");
    }
}
