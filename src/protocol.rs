//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AnalysisRequest, AnalysisResult, Card, ImagePayload, Mode};
use crate::error::ValidationError;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SelectMode {
        mode: String,
    },
    SetCredential {
        credential: String,
    },
    ClearCredential,
    StartCapture,
    CancelCapture,
    Submit {
        image: String,
        #[serde(default)]
        context: Option<String>,
    },
    Dismiss,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    State {
        state: &'static str,
        mode: Mode,
    },
    Result {
        result: AnalysisResult,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

/// Body of `POST /v1/analyze`. Fields stay untyped so validation can report
/// them in a fixed order instead of failing on the first serde mismatch.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeIn {
    #[serde(default, alias = "base64Image")]
    pub image: Option<Value>,
    #[serde(default)]
    pub mode: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default, alias = "apiKey")]
    pub credential: Option<Value>,
}

impl AnalyzeIn {
    pub fn validate(self) -> Result<AnalysisRequest, ValidationError> {
        validate_fields(
            self.image.as_ref().and_then(Value::as_str),
            self.mode.as_ref().and_then(Value::as_str),
            as_string(self.context),
            as_string(self.credential),
        )
    }
}

fn as_string(v: Option<Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Image first, then mode. Shared by the JSON, multipart and WebSocket paths.
pub fn validate_fields(
    image: Option<&str>,
    mode: Option<&str>,
    context: Option<String>,
    credential: Option<String>,
) -> Result<AnalysisRequest, ValidationError> {
    let image = image
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingImage)?;
    let mode = mode
        .and_then(|m| m.parse::<Mode>().ok())
        .ok_or(ValidationError::InvalidMode)?;
    Ok(AnalysisRequest::new(ImagePayload::from_wire(image), mode, context, credential))
}

#[derive(Debug, Deserialize)]
pub struct ExportIn {
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub model: String,
}
