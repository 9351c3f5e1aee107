//! Core behaviors shared by the HTTP and WebSocket handlers.
//!
//! This includes:
//!   - running one analysis (credential → prompt → model → interpretation)
//!   - turning pipeline errors into the generic failure envelope

use std::time::Instant;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{AnalysisRequest, AnalysisResult, Mode};
use crate::error::{AnalyzeError, INVOCATION_FAILURE_MESSAGE};
use crate::interpret::interpret;
use crate::state::AppState;

#[instrument(level = "info", skip(state, req),
             fields(request_id = %Uuid::new_v4(), mode = %req.mode, image_len = req.image.data.len(), has_context = req.context.is_some()))]
pub async fn analyze(state: &AppState, req: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
  let credential = state
    .resolve_credential(req.credential.as_deref())
    .ok_or(AnalyzeError::MissingCredential)?;

  let prompt = state.prompts.build(req.mode, req.context.as_deref());

  let start = Instant::now();
  let raw = state.model.generate(&req.image, &prompt, credential).await?;
  let data = interpret(&raw, req.mode, state.card_policy);

  match req.mode {
    Mode::Grade if data.score.is_none() => {
      warn!(target: "analysis", elapsed = ?start.elapsed(), raw_len = raw.len(), "No score found in GRADE reply")
    }
    Mode::Anki if data.cards.as_ref().map_or(true, |c| c.is_empty()) => {
      warn!(target: "analysis", elapsed = ?start.elapsed(), raw_len = raw.len(), "No usable cards in ANKI reply")
    }
    _ => info!(
      target: "analysis",
      elapsed = ?start.elapsed(),
      raw_len = raw.len(),
      score = ?data.score,
      cards = data.cards.as_ref().map(|c| c.len()),
      "Analysis completed"
    ),
  }

  Ok(AnalysisResult::ok(data))
}

/// Run the pipeline and always return an envelope. Failures are logged in full
/// and reported to the caller with a fixed message.
pub async fn analyze_envelope(state: &AppState, req: &AnalysisRequest) -> AnalysisResult {
  match analyze(state, req).await {
    Ok(result) => result,
    Err(e) => {
      error!(target: "analysis", mode = %req.mode, error = %e, "Analysis failed");
      AnalysisResult::failure(INVOCATION_FAILURE_MESSAGE)
    }
  }
}
