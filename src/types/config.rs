//! Configuration types for OpenVision.
//!
//! Process-wide settings are read once at startup and shared read-only by
//! every analysis call. The prompt defaults live here as well so that the
//! tool schema, the pipeline and the tests all agree on one value.

use crate::error::{VisionError, VisionResult};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::warn;

/// Environment variable holding the gateway credential.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Environment variable selecting the default vision model.
pub const DEFAULT_MODEL_ENV: &str = "OPENROUTER_DEFAULT_MODEL";

/// Environment variable overriding the gateway base URL.
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Gateway base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Query sent when the caller does not supply one.
pub const DEFAULT_QUERY: &str = "Describe this image in detail";

/// System prompt sent when the caller does not supply one.
///
/// This text steers the model towards factual, agent-oriented descriptions.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert vision analyzer with exceptional attention to detail. \
Your purpose is to provide accurate, comprehensive descriptions of images that help AI agents understand \
visual content they cannot directly perceive. Focus on describing all relevant elements in the image - \
objects, people, text, colors, spatial relationships, actions, and context. Be precise but concise, \
organizing information from most to least important. Avoid making assumptions beyond what's visible and \
clearly indicate any uncertainty. When text appears in images, transcribe it verbatim within quotes. \
Respond only with factual descriptions without subjective judgments or creative embellishments. \
Your descriptions should enable an agent to make informed decisions based solely on your analysis.";

/// Default completion length.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Vision models known to work through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisionModel {
    /// `anthropic/claude-3-5-sonnet`
    Claude35Sonnet,
    /// `anthropic/claude-3-opus`
    Claude3Opus,
    /// `anthropic/claude-3-sonnet`
    Claude3Sonnet,
    /// `openai/gpt-4o`
    Gpt4o,
    /// `qwen/qwq-32b:free`
    QwenQwq32b,
    /// `qwen/qwen2.5-vl-32b-instruct:free`
    #[default]
    Qwen25Vl,
}

impl VisionModel {
    /// Every catalogued model.
    pub const ALL: [Self; 6] = [
        Self::Claude35Sonnet,
        Self::Claude3Opus,
        Self::Claude3Sonnet,
        Self::Gpt4o,
        Self::QwenQwq32b,
        Self::Qwen25Vl,
    ];

    /// Returns the gateway identifier for this model.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude35Sonnet => "anthropic/claude-3-5-sonnet",
            Self::Claude3Opus => "anthropic/claude-3-opus",
            Self::Claude3Sonnet => "anthropic/claude-3-sonnet",
            Self::Gpt4o => "openai/gpt-4o",
            Self::QwenQwq32b => "qwen/qwq-32b:free",
            Self::Qwen25Vl => "qwen/qwen2.5-vl-32b-instruct:free",
        }
    }

    /// Looks up a model by its exact gateway identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == id)
    }

    /// Picks the default model from an optional configured identifier.
    ///
    /// An unrecognized identifier logs a warning and falls back to
    /// [`VisionModel::default`].
    #[must_use]
    pub fn resolve_default(configured: Option<&str>) -> Self {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::default(),
            Some(id) => Self::from_id(id).unwrap_or_else(|| {
                let fallback = Self::default();
                warn!(
                    configured = id,
                    fallback = fallback.as_str(),
                    "default model is not recognized, using fallback"
                );
                fallback
            }),
        }
    }
}

impl fmt::Display for VisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide configuration.
///
/// # Security Note
///
/// The credential is held as a [`SecretString`] so it never shows up in
/// `Debug` output or logs.
#[derive(Debug)]
pub struct Config {
    /// Bearer credential for the gateway.
    pub api_key: SecretString,

    /// Model used when a call does not name one.
    pub default_model: VisionModel,

    /// Gateway base URL, without a trailing slash.
    pub base_url: String,
}

impl Config {
    /// Builds a configuration from already-parsed values.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Configuration`] if the credential is missing or
    /// empty.
    pub fn new(
        api_key: Option<SecretString>,
        default_model: Option<&str>,
        base_url: Option<&str>,
    ) -> VisionResult<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                VisionError::configuration(format!(
                    "{API_KEY_ENV} environment variable not set. \
                     Please set it to your OpenRouter API key."
                ))
            })?;

        let base_url = base_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            default_model: VisionModel::resolve_default(default_model),
            base_url,
        })
    }

    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Configuration`] if [`API_KEY_ENV`] is unset.
    pub fn from_env() -> VisionResult<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok().map(SecretString::from);
        let default_model = std::env::var(DEFAULT_MODEL_ENV).ok();
        let base_url = std::env::var(BASE_URL_ENV).ok();
        Self::new(api_key, default_model.as_deref(), base_url.as_deref())
    }

    /// Returns the chat-completions endpoint.
    #[must_use]
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}
