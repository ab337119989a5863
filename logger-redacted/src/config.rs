// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default level for CareDesk targets when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of the human readable format
    pub json: bool,
    /// Pass every formatted event through the PII redactor
    pub redact_pii: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            redact_pii: true,
        }
    }
}
