use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// User-displayable failure carried by snapshots. `code` names the step to retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AlertView {
    pub code: String,
    pub message: String,
}

impl AlertView {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
