//! Application state shared by all handlers: the model client, prompts, and analysis settings.
//!
//! Nothing in here is mutated after startup; every request works on its own values.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::InvocationError;
use crate::gemini::{GeminiClient, VisionModel};
use crate::interpret::CardPolicy;
use crate::prompts::Prompts;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn VisionModel>,
    pub prompts: Prompts,
    /// Used when the caller does not send its own key.
    pub default_credential: Option<String>,
    pub card_policy: CardPolicy,
}

impl AppState {
    /// Build state from configuration, creating the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &ServerConfig) -> Result<Self, InvocationError> {
        let client = GeminiClient::new(&cfg.gemini)?;
        info!(target: "study_partner", base_url = %client.base_url, model = %client.model, timeout = ?cfg.gemini.timeout, card_policy = ?cfg.card_policy, "Gemini client ready");
        if cfg.default_credential.is_none() {
            warn!(target: "study_partner", "GEMINI_API_KEY not set; callers must send their own API key");
        }
        Ok(Self::with_model(Arc::new(client), cfg.prompts.clone(), cfg.default_credential.clone(), cfg.card_policy))
    }

    /// Assemble state around any model implementation.
    pub fn with_model(
        model: Arc<dyn VisionModel>,
        prompts: Prompts,
        default_credential: Option<String>,
        card_policy: CardPolicy,
    ) -> Self {
        Self { model, prompts, default_credential, card_policy }
    }

    /// The request's own key wins over the server default.
    pub fn resolve_credential<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .filter(|k| !k.is_empty())
            .or(self.default_credential.as_deref())
    }
}
