//! Runtime configuration: environment variables plus an optional TOML file.
//!
//! Environment:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : default credential when the caller sends none
//!   GEMINI_BASE_URL     : default "https://generativelanguage.googleapis.com/v1beta/models"
//!   GEMINI_MODEL        : default "gemini-2.5-flash"
//!   GEMINI_TIMEOUT_SECS : default 90
//!   ANKI_CARD_POLICY    : "strict" (default) or "partial"
//!   PROMPTS_CONFIG_PATH : TOML file with `[prompts]` and `[generation]` overrides
//!
//! The binary loads a `.env` file from the working directory first, if present.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::interpret::CardPolicy;
use crate::prompts::Prompts;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Sampling parameters forwarded as Gemini `generationConfig`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
  pub temperature: f32,
  pub top_p: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self { temperature: 0.2, top_p: 0.8, max_output_tokens: 8192 }
  }
}

/// Schema of the PROMPTS_CONFIG_PATH file. Every section is optional.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
  pub prompts: Prompts,
  pub generation: GenerationSettings,
}

#[derive(Clone, Debug)]
pub struct GeminiSettings {
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
  pub generation: GenerationSettings,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub port: u16,
  pub default_credential: Option<String>,
  pub card_policy: CardPolicy,
  pub gemini: GeminiSettings,
  pub prompts: Prompts,
}

impl ServerConfig {
  /// Read the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = match get("PORT") {
      Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid { key: "PORT", value: v })?,
      None => DEFAULT_PORT,
    };
    let timeout_secs = match get("GEMINI_TIMEOUT_SECS") {
      Some(v) => match v.parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => return Err(ConfigError::Invalid { key: "GEMINI_TIMEOUT_SECS", value: v }),
      },
      None => DEFAULT_TIMEOUT_SECS,
    };
    let card_policy = match get("ANKI_CARD_POLICY") {
      Some(v) => v.parse::<CardPolicy>().map_err(|_| ConfigError::Invalid { key: "ANKI_CARD_POLICY", value: v })?,
      None => CardPolicy::default(),
    };

    let file = match get("PROMPTS_CONFIG_PATH") {
      Some(path) => match load_file_config(&path) {
        Ok(cfg) => {
          info!(target: "study_partner", %path, "Loaded prompts config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "study_partner", %path, error = %e, "Prompts config unusable; using built-in defaults");
          FileConfig::default()
        }
      },
      None => FileConfig::default(),
    };

    Ok(Self {
      port,
      default_credential: get("GEMINI_API_KEY"),
      card_policy,
      gemini: GeminiSettings {
        base_url: get("GEMINI_BASE_URL")
          .map(|u| u.trim_end_matches('/').to_string())
          .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
        timeout: Duration::from_secs(timeout_secs),
        generation: file.generation,
      },
      prompts: file.prompts,
    })
  }
}

pub fn load_file_config(path: &str) -> Result<FileConfig, ConfigError> {
  let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  toml::from_str::<FileConfig>(&s).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_when_environment_is_empty() {
    let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.default_credential, None);
    assert_eq!(cfg.card_policy, CardPolicy::Strict);
    assert_eq!(cfg.gemini.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.gemini.model, DEFAULT_MODEL);
    assert_eq!(cfg.gemini.timeout, Duration::from_secs(90));
    assert_eq!(cfg.gemini.generation, GenerationSettings::default());
    assert_eq!(cfg.prompts, Prompts::default());
  }

  #[test]
  fn environment_overrides() {
    let cfg = ServerConfig::from_lookup(lookup(&[
      ("PORT", "8080"),
      ("GEMINI_API_KEY", "server-key"),
      ("GEMINI_BASE_URL", "http://127.0.0.1:9999/models/"),
      ("GEMINI_MODEL", "gemini-test"),
      ("GEMINI_TIMEOUT_SECS", "120"),
      ("ANKI_CARD_POLICY", "partial"),
    ]))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.default_credential.as_deref(), Some("server-key"));
    assert_eq!(cfg.gemini.base_url, "http://127.0.0.1:9999/models");
    assert_eq!(cfg.gemini.model, "gemini-test");
    assert_eq!(cfg.gemini.timeout, Duration::from_secs(120));
    assert_eq!(cfg.card_policy, CardPolicy::Partial);
  }

  #[test]
  fn blank_api_key_counts_as_unset() {
    let cfg = ServerConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
    assert_eq!(cfg.default_credential, None);
  }

  #[test]
  fn invalid_values_are_rejected() {
    assert!(matches!(
      ServerConfig::from_lookup(lookup(&[("PORT", "http")])),
      Err(ConfigError::Invalid { key: "PORT", .. })
    ));
    assert!(matches!(
      ServerConfig::from_lookup(lookup(&[("GEMINI_TIMEOUT_SECS", "0")])),
      Err(ConfigError::Invalid { key: "GEMINI_TIMEOUT_SECS", .. })
    ));
    assert!(matches!(
      ServerConfig::from_lookup(lookup(&[("ANKI_CARD_POLICY", "lenient")])),
      Err(ConfigError::Invalid { key: "ANKI_CARD_POLICY", .. })
    ));
  }

  #[test]
  fn toml_file_overrides_prompts_and_generation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "[prompts]\nocr = \"Just transcribe.\"\n\n[generation]\ntemperature = 0.0\nmax_output_tokens = 1024\n"
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let cfg = ServerConfig::from_lookup(lookup(&[("PROMPTS_CONFIG_PATH", path.as_str())])).unwrap();
    assert_eq!(cfg.prompts.ocr, "Just transcribe.");
    assert_eq!(cfg.prompts.solve, Prompts::default().solve);
    assert_eq!(cfg.gemini.generation.temperature, 0.0);
    assert_eq!(cfg.gemini.generation.top_p, 0.8);
    assert_eq!(cfg.gemini.generation.max_output_tokens, 1024);
  }

  #[test]
  fn unreadable_file_falls_back_to_defaults() {
    let cfg = ServerConfig::from_lookup(lookup(&[("PROMPTS_CONFIG_PATH", "/nonexistent/prompts.toml")])).unwrap();
    assert_eq!(cfg.prompts, Prompts::default());
    assert!(matches!(load_file_config("/nonexistent/prompts.toml"), Err(ConfigError::Read { .. })));
  }

  #[test]
  fn malformed_file_reports_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[prompts\nsolve = ").unwrap();
    let path = file.path().to_string_lossy().to_string();
    assert!(matches!(load_file_config(&path), Err(ConfigError::Parse { .. })));
  }
}
