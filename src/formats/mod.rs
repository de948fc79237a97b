//! Output format module for kmodctl
pub mod csv;
pub mod json;
pub mod jsonl;
pub mod text;
pub mod traits;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::kernel::controller::ActionOutcome;
    use crate::kernel::lifecycle::Action;
    use crate::kernel::{ModuleRecord, Snapshot};
    use std::sync::Arc;

    pub fn snapshot() -> Snapshot {
        Snapshot::new(
            Some("6.1.0-test".to_string()),
            vec![
                ModuleRecord {
                    name: "usbcore".to_string(),
                    description: "USB core driver".to_string(),
                    parameters: "autosuspend:default autosuspend delay (int); ".to_string(),
                    loaded: true,
                },
                ModuleRecord {
                    name: "ext4".to_string(),
                    description: "not found".to_string(),
                    parameters: "no options".to_string(),
                    loaded: false,
                },
            ],
        )
    }

    pub fn outcome() -> ActionOutcome {
        ActionOutcome {
            action: Action::Load,
            name: "usbcore".to_string(),
            result: Ok(()),
            snapshot: Arc::new(snapshot()),
        }
    }
}
