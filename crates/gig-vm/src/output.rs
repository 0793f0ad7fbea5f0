use serde::Serialize;

use crate::error::CliError;

/// Printed on stdout when a pass fails.
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub failed: bool,
    pub changed: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<u64>,
}

impl FailureResponse {
    pub fn from_error(err: &CliError) -> Self {
        let msg = match err {
            CliError::Reconcile(g8_vm::Error::Config(reason)) => {
                format!("VM configuration is incorrect: Reason: {reason}")
            }
            other => other.to_string(),
        };
        Self {
            failed: true,
            changed: err.left_changes(),
            msg,
            vm_id: err.vm_id(),
        }
    }
}
