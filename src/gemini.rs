//! Minimal Gemini client for image + prompt generation.
//!
//! We only call `models/{model}:generateContent` with one inline image and one text part.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: The API key travels in the `x-goog-api-key` header, never in the URL, and is never logged.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::{GeminiSettings, GenerationSettings};
use crate::domain::ImagePayload;
use crate::error::InvocationError;
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// The generative model as seen by the pipeline: image + prompt in, free text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
  /// Model identifier reported by the health endpoint.
  fn name(&self) -> &str;

  async fn generate(&self, image: &ImagePayload, prompt: &str, credential: &str) -> Result<String, InvocationError>;
}

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  pub base_url: String,
  pub model: String,
  pub generation: GenerationSettings,
}

impl GeminiClient {
  /// Build the HTTP client with the configured request timeout.
  pub fn new(settings: &GeminiSettings) -> Result<Self, InvocationError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self {
      client,
      base_url: settings.base_url.clone(),
      model: settings.model.clone(),
      generation: settings.generation.clone(),
    })
  }

  fn endpoint(&self) -> String {
    format!("{}/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl VisionModel for GeminiClient {
  fn name(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, image, prompt, credential),
               fields(model = %self.model, mime = %image.mime_type, image_len = image.data.len(), prompt_len = prompt.len()))]
  async fn generate(&self, image: &ImagePayload, prompt: &str, credential: &str) -> Result<String, InvocationError> {
    let req = GenerateContentRequest {
      contents: vec![Content {
        parts: vec![
          Part::InlineData {
            inline_data: InlineData { mime_type: image.mime_type.clone(), data: image.data.clone() },
          },
          Part::Text { text: prompt.to_string() },
        ],
      }],
      generation_config: GenerationConfig {
        temperature: self.generation.temperature,
        top_p: self.generation.top_p,
        max_output_tokens: self.generation.max_output_tokens,
      },
    };

    let start = Instant::now();
    let res = self.client.post(self.endpoint())
      .header(USER_AGENT, "study-partner/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, credential)
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), status, "Gemini returned an error status");
      return Err(InvocationError::Status { status, body: trunc_for_log(&msg, 300) });
    }

    let body: GenerateContentResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = body.candidates.into_iter().next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .and_then(|p| p.text)
      .unwrap_or_default();

    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content { parts: Vec<Part> }
#[derive(Serialize)]
#[serde(untagged)]
enum Part {
  InlineData { #[serde(rename = "inlineData")] inline_data: InlineData },
  Text { text: String },
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData { mime_type: String, data: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig { temperature: f32, top_p: f32, max_output_tokens: u32 }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<CandidateContent> }
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<CandidatePart> }
#[derive(Deserialize)]
struct CandidatePart { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
