//! Error types for request validation, model invocation, configuration and session transitions.

use thiserror::Error;

/// Message returned to callers for any failed model invocation. Upstream detail is logged, never echoed.
pub const INVOCATION_FAILURE_MESSAGE: &str =
  "AI analysis failed. Please check your API key and network connection.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid mode: {0:?}")]
pub struct InvalidMode(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown card policy {0:?}, expected strict or partial")]
pub struct UnknownCardPolicy(pub String);

/// Malformed or missing request fields. Detected before the model is called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("image is required.")]
  MissingImage,

  #[error("mode must be one of SOLVE / GRADE / OCR / ANKI.")]
  InvalidMode,

  #[error("request body must be a JSON object.")]
  MalformedBody,

  #[error("cards must be a non-empty list.")]
  NoCards,
}

/// Failure talking to the generative model.
#[derive(Error, Debug)]
pub enum InvocationError {
  #[error("model request timed out")]
  Timeout,

  #[error("model transport error: {0}")]
  Transport(String),

  #[error("model returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("model response could not be decoded: {0}")]
  Decode(String),
}

impl From<reqwest::Error> for InvocationError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      InvocationError::Timeout
    } else if e.is_decode() {
      InvocationError::Decode(e.without_url().to_string())
    } else {
      InvocationError::Transport(e.without_url().to_string())
    }
  }
}

/// Everything that can stop the pipeline after validation.
#[derive(Error, Debug)]
pub enum AnalyzeError {
  #[error("no API key available from the request or the server configuration")]
  MissingCredential,

  #[error(transparent)]
  Invocation(#[from] InvocationError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: String, source: std::io::Error },

  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },

  #[error("invalid value for {key}: {value:?}")]
  Invalid { key: &'static str, value: String },
}

/// Rejected session state change. The session is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} while {from}")]
pub struct TransitionError {
  pub from: &'static str,
  pub action: &'static str,
}
