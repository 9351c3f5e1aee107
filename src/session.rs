//! Per-client application state: the selected mode, the stored API key, and the
//! capture → process → show-result flow as an explicit state machine.
//!
//! Each WebSocket connection owns one `Session`. Transitions that do not apply to the
//! current state are rejected with `TransitionError` and leave the session untouched.

use std::collections::HashMap;

use crate::domain::{AnalysisRequest, AnalysisResult, ImagePayload, Mode};
use crate::error::TransitionError;

/// Fixed key under which the user's API key is stored.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

/// Simple key-value store for the user-supplied credential.
pub trait CredentialStore: Send {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&mut self, key: &str, value: String);
  fn delete(&mut self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
  values: HashMap<String, String>,
}

impl CredentialStore for MemoryCredentialStore {
  fn get(&self, key: &str) -> Option<String> {
    self.values.get(key).cloned()
  }

  fn set(&mut self, key: &str, value: String) {
    self.values.insert(key.to_string(), value);
  }

  fn delete(&mut self, key: &str) {
    self.values.remove(key);
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
  Idle,
  Capturing,
  Processing,
  ShowingResult(AnalysisResult),
  ShowingError(String),
}

impl SessionState {
  pub fn name(&self) -> &'static str {
    match self {
      SessionState::Idle => "idle",
      SessionState::Capturing => "capturing",
      SessionState::Processing => "processing",
      SessionState::ShowingResult(_) => "showing_result",
      SessionState::ShowingError(_) => "showing_error",
    }
  }

  fn is_settled(&self) -> bool {
    matches!(self, SessionState::Idle | SessionState::ShowingResult(_) | SessionState::ShowingError(_))
  }
}

pub struct Session<S: CredentialStore = MemoryCredentialStore> {
  mode: Mode,
  state: SessionState,
  store: S,
}

impl Session<MemoryCredentialStore> {
  pub fn new() -> Self {
    Self::with_store(MemoryCredentialStore::default())
  }
}

impl Default for Session<MemoryCredentialStore> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: CredentialStore> Session<S> {
  /// Starts idle in SOLVE mode.
  pub fn with_store(store: S) -> Self {
    Self { mode: Mode::Solve, state: SessionState::Idle, store }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn credential(&self) -> Option<String> {
    self.store.get(CREDENTIAL_KEY)
  }

  /// Blank keys delete the stored one.
  pub fn set_credential(&mut self, key: &str) {
    let key = key.trim();
    if key.is_empty() {
      self.store.delete(CREDENTIAL_KEY);
    } else {
      self.store.set(CREDENTIAL_KEY, key.to_string());
    }
  }

  pub fn clear_credential(&mut self) {
    self.store.delete(CREDENTIAL_KEY);
  }

  /// Changing mode discards any shown result.
  pub fn select_mode(&mut self, mode: Mode) -> Result<(), TransitionError> {
    self.require(self.state.is_settled(), "select a mode")?;
    self.mode = mode;
    self.state = SessionState::Idle;
    Ok(())
  }

  pub fn start_capture(&mut self) -> Result<(), TransitionError> {
    self.require(self.state.is_settled(), "start capturing")?;
    self.state = SessionState::Capturing;
    Ok(())
  }

  pub fn cancel_capture(&mut self) -> Result<(), TransitionError> {
    self.require(self.state == SessionState::Capturing, "cancel capturing")?;
    self.state = SessionState::Idle;
    Ok(())
  }

  /// Moves to Processing and returns the request to run.
  pub fn begin_processing(&mut self, image: ImagePayload, context: Option<String>) -> Result<AnalysisRequest, TransitionError> {
    self.require(self.state == SessionState::Capturing, "submit an image")?;
    self.state = SessionState::Processing;
    Ok(AnalysisRequest::new(image, self.mode, context, self.credential()))
  }

  pub fn complete(&mut self, result: AnalysisResult) -> Result<(), TransitionError> {
    self.require(self.state == SessionState::Processing, "complete processing")?;
    self.state = if result.success {
      SessionState::ShowingResult(result)
    } else {
      SessionState::ShowingError(result.error.unwrap_or_default())
    };
    Ok(())
  }

  pub fn dismiss(&mut self) -> Result<(), TransitionError> {
    let showing = matches!(self.state, SessionState::ShowingResult(_) | SessionState::ShowingError(_));
    self.require(showing, "dismiss")?;
    self.state = SessionState::Idle;
    Ok(())
  }

  fn require(&self, allowed: bool, action: &'static str) -> Result<(), TransitionError> {
    if allowed {
      Ok(())
    } else {
      Err(TransitionError { from: self.state.name(), action })
    }
  }
}
