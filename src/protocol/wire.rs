//! JSON request and reply bodies exchanged with the browser client

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /send`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendTextRequest {
    #[serde(default)]
    pub text: String,
}

/// Body of `POST /move_cursor`.
///
/// `direction` is kept as raw JSON: anything that is not one of the four
/// known strings is accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveCursorRequest {
    #[serde(default)]
    pub direction: Option<Value>,
}

impl MoveCursorRequest {
    pub fn direction_str(&self) -> &str {
        self.direction.as_ref().and_then(Value::as_str).unwrap_or("")
    }
}

/// Every response body
///
/// ```json
/// {"status": "success"}
/// {"status": "success", "content": "hello"}
/// {"status": "failed", "msg": "no operation to undo"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Failed {
        msg: String,
    },
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Success { content: None }
    }

    pub fn recovered(content: impl Into<String>) -> Self {
        Reply::Success {
            content: Some(content.into()),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Reply::Failed { msg: msg.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"failed","msg":"serialization error"}"#.to_string())
    }
}
