//! Gateway configuration
//!
//! Loaded from TOML at startup; falls back to defaults if the file is
//! missing or malformed. Environment variables override the file.

use cedar_core::GatewayConfig;
use cedar_dialogue::DialogueConfig;
use cedar_llm::openai::{
    DEFAULT_SPEECH_MODEL, DEFAULT_TRANSCRIPTION_MODEL, DEFAULT_VOICE, OPENAI_API_URL,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CedarConfig {
    /// Listen address, port and auth.
    pub server: GatewayConfig,
    /// OpenAI-compatible endpoint.
    pub llm: LlmConfig,
    /// Persona, router and summarizer tuning.
    pub dialogue: DialogueConfig,
    pub storage: StorageConfig,
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Usually supplied through `OPENAI_API_KEY` instead.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// One `{id}.json` per summarized conversation.
    pub memory_dir: PathBuf,
    /// `{notes_dir}/{username}/{id}.json`.
    pub notes_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub chat_model: String,
    pub system_prompt: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_API_URL.into(),
            api_key: None,
            timeout_secs: 60,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.into(),
            speech_model: DEFAULT_SPEECH_MODEL.into(),
            voice: DEFAULT_VOICE.into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_dir: PathBuf::from("data/memories"),
            notes_dir: PathBuf::from("data/notes"),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o-mini".into(),
            system_prompt: "You are helpful and concise.".into(),
            temperature: 0.7,
        }
    }
}

impl CedarConfig {
    /// Load from a TOML file. Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `CEDAR_GATEWAY_TOKEN`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(token) = non_empty("CEDAR_GATEWAY_TOKEN") {
            self.server.auth.token = Some(token);
        }
    }
}
