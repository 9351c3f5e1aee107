//! HTTP endpoint handlers. These are thin wrappers that validate input and forward to core logic.
//! Each handler is instrumented; logs carry sizes and outcomes, never image data or keys.

use std::sync::Arc;

use axum::{
  extract::{
    multipart::MultipartRejection,
    rejection::JsonRejection,
    Multipart, State,
  },
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{error, info, instrument, warn};

use crate::domain::{AnalysisRequest, AnalysisResult, DEFAULT_MIME_TYPE};
use crate::error::{ValidationError, INVOCATION_FAILURE_MESSAGE};
use crate::export::{cards_to_csv, CSV_FILENAME};
use crate::logic::analyze;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { status: "ok", model: state.model.name().to_string() })
}

#[instrument(level = "info", skip_all)]
pub async fn http_post_analyze(
  State(state): State<Arc<AppState>>,
  body: Result<Json<AnalyzeIn>, JsonRejection>,
) -> Response {
  let Json(body) = match body {
    Ok(b) => b,
    Err(e) => {
      warn!(target: "analysis", error = %e, "Rejected analyze body");
      return rejected(ValidationError::MalformedBody);
    }
  };
  match body.validate() {
    Ok(req) => run(&state, req).await,
    Err(e) => rejected(e),
  }
}

/// Multipart variant: `image` file part plus `mode`, `context`, `credential` text parts.
#[instrument(level = "info", skip_all)]
pub async fn http_post_analyze_upload(
  State(state): State<Arc<AppState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Response {
  let mut multipart = match multipart {
    Ok(m) => m,
    Err(e) => {
      warn!(target: "analysis", error = %e, "Rejected upload body");
      return rejected(ValidationError::MalformedBody);
    }
  };

  let mut image: Option<String> = None;
  let mut mode: Option<String> = None;
  let mut context: Option<String> = None;
  let mut credential: Option<String> = None;

  loop {
    let field = match multipart.next_field().await {
      Ok(Some(f)) => f,
      Ok(None) => break,
      Err(e) => {
        warn!(target: "analysis", error = %e, "Malformed multipart field");
        return rejected(ValidationError::MalformedBody);
      }
    };
    let name = field.name().unwrap_or_default().to_string();
    let result = match name.as_str() {
      "image" => {
        let mime = field
          .content_type()
          .filter(|m| m.starts_with("image/"))
          .unwrap_or(DEFAULT_MIME_TYPE)
          .to_string();
        field.bytes().await.map(|bytes| {
          if !bytes.is_empty() {
            image = Some(format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)));
          }
        })
      }
      "mode" => field.text().await.map(|t| mode = Some(t)),
      "context" => field.text().await.map(|t| context = Some(t)),
      "credential" => field.text().await.map(|t| credential = Some(t)),
      _ => Ok(()),
    };
    if let Err(e) = result {
      warn!(target: "analysis", field = %name, error = %e, "Failed reading multipart field");
      return rejected(ValidationError::MalformedBody);
    }
  }

  match validate_fields(image.as_deref(), mode.as_deref(), context, credential) {
    Ok(req) => run(&state, req).await,
    Err(e) => rejected(e),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_post_anki_export(body: Result<Json<ExportIn>, JsonRejection>) -> Response {
  let cards = match body {
    Ok(Json(b)) => b.cards,
    Err(e) => {
      warn!(target: "analysis", error = %e, "Rejected export body");
      return rejected(ValidationError::MalformedBody);
    }
  };
  if cards.is_empty() {
    return rejected(ValidationError::NoCards);
  }
  info!(target: "analysis", cards = cards.len(), "Exporting cards as CSV");
  (
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", CSV_FILENAME)),
    ],
    cards_to_csv(&cards),
  )
    .into_response()
}

async fn run(state: &AppState, req: AnalysisRequest) -> Response {
  match analyze(state, &req).await {
    Ok(result) => Json(result).into_response(),
    Err(e) => {
      error!(target: "analysis", mode = %req.mode, error = %e, "Analysis failed");
      (StatusCode::INTERNAL_SERVER_ERROR, Json(AnalysisResult::failure(INVOCATION_FAILURE_MESSAGE))).into_response()
    }
  }
}

fn rejected(e: ValidationError) -> Response {
  (StatusCode::BAD_REQUEST, Json(AnalysisResult::failure(e.to_string()))).into_response()
}
