//! Study Partner · photo-to-study-artifact backend
//!
//! A photographed problem, answer sheet or notes page goes to a multimodal model with a
//! mode-specific instruction; the free-form reply comes back as a worked solution, a
//! graded score, a transcription, or a set of flashcards.

pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod gemini;
pub mod interpret;
pub mod logic;
pub mod prompts;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;

pub use domain::{AnalysisData, AnalysisRequest, AnalysisResult, Card, ImagePayload, Mode};
pub use gemini::{GeminiClient, VisionModel};
pub use interpret::{interpret, CardExtraction, CardPolicy};
pub use prompts::Prompts;
pub use routes::build_router;
pub use state::AppState;
