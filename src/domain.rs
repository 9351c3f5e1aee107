//! Domain models: analysis modes, the image payload, cards, and the result envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidMode;

/// MIME type used when the caller sends a bare base64 payload.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// What the user wants done with the photographed page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
  /// Solve the problem and explain the steps.
  Solve,
  /// Grade an answer sheet and emit a score.
  Grade,
  /// Transcribe the text in the image.
  Ocr,
  /// Produce spaced-repetition flashcards.
  Anki,
}

impl Mode {
  pub const ALL: [Mode; 4] = [Mode::Solve, Mode::Grade, Mode::Ocr, Mode::Anki];

  pub fn as_str(&self) -> &'static str {
    match self {
      Mode::Solve => "SOLVE",
      Mode::Grade => "GRADE",
      Mode::Ocr => "OCR",
      Mode::Anki => "ANKI",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Mode {
  type Err = InvalidMode;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Mode::ALL
      .into_iter()
      .find(|m| m.as_str() == s)
      .ok_or_else(|| InvalidMode(s.to_string()))
  }
}

/// Image ready to be forwarded to the model: base64 data plus its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
  pub mime_type: String,
  pub data: String,
}

impl ImagePayload {
  /// Accepts either `data:<mime>;base64,<payload>` or a raw base64 string.
  /// Anything that does not look like a complete data URL is forwarded as-is.
  pub fn from_wire(s: &str) -> Self {
    if let Some(rest) = s.strip_prefix("data:") {
      if let Some((mime, data)) = rest.split_once(";base64,") {
        if !mime.is_empty() && !data.is_empty() {
          return Self { mime_type: mime.to_string(), data: data.to_string() };
        }
      }
    }
    Self { mime_type: DEFAULT_MIME_TYPE.to_string(), data: s.to_string() }
  }
}

/// A validated request, ready for the pipeline.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
  pub image: ImagePayload,
  pub mode: Mode,
  pub context: Option<String>,
  pub credential: Option<String>,
}

impl AnalysisRequest {
  /// Empty context and credential strings count as "not supplied".
  pub fn new(image: ImagePayload, mode: Mode, context: Option<String>, credential: Option<String>) -> Self {
    Self {
      image,
      mode,
      context: context.filter(|c| !c.is_empty()),
      credential: credential.filter(|c| !c.is_empty()),
    }
  }
}

/// One flashcard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
  pub front: String,
  pub back: String,
}

/// Mode-specific payload of the envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisData {
  pub content: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cards: Option<Vec<Card>>,
}

/// Uniform response envelope returned for every analysis request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub success: bool,
  pub data: AnalysisData,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl AnalysisResult {
  pub fn ok(data: AnalysisData) -> Self {
    Self { success: true, data, error: None }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self { success: false, data: AnalysisData::default(), error: Some(message.into()) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_parses_only_exact_upper_case() {
    assert_eq!("SOLVE".parse::<Mode>().unwrap(), Mode::Solve);
    assert_eq!("ANKI".parse::<Mode>().unwrap(), Mode::Anki);
    assert!("solve".parse::<Mode>().is_err());
    assert!("".parse::<Mode>().is_err());
    assert!("TRANSLATE".parse::<Mode>().is_err());
  }

  #[test]
  fn mode_serializes_as_wire_string() {
    assert_eq!(serde_json::to_string(&Mode::Ocr).unwrap(), "\"OCR\"");
    let m: Mode = serde_json::from_str("\"GRADE\"").unwrap();
    assert_eq!(m, Mode::Grade);
  }

  #[test]
  fn data_url_is_split() {
    let img = ImagePayload::from_wire("data:image/png;base64,iVBORw0KGgo=");
    assert_eq!(img.mime_type, "image/png");
    assert_eq!(img.data, "iVBORw0KGgo=");
  }

  #[test]
  fn raw_base64_gets_default_mime() {
    let img = ImagePayload::from_wire("/9j/4AAQSkZJRg==");
    assert_eq!(img.mime_type, DEFAULT_MIME_TYPE);
    assert_eq!(img.data, "/9j/4AAQSkZJRg==");
  }

  #[test]
  fn incomplete_data_url_is_forwarded_verbatim() {
    let img = ImagePayload::from_wire("data:;base64,abc");
    assert_eq!(img.mime_type, DEFAULT_MIME_TYPE);
    assert_eq!(img.data, "data:;base64,abc");
  }

  #[test]
  fn empty_optional_fields_are_dropped() {
    let req = AnalysisRequest::new(ImagePayload::from_wire("abc"), Mode::Solve, Some(String::new()), Some(String::new()));
    assert!(req.context.is_none());
    assert!(req.credential.is_none());
  }

  #[test]
  fn failure_envelope_has_empty_content_and_no_extras() {
    let v = serde_json::to_value(AnalysisResult::failure("boom")).unwrap();
    assert_eq!(v, serde_json::json!({ "success": false, "data": { "content": "" }, "error": "boom" }));
  }
}
