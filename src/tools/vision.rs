//! The `image_analysis` operation.
//!
//! One call is one linear pass with an early exit at every stage:
//!
//! 1. validate generation parameters (no I/O has happened yet)
//! 2. classify and resolve the image
//! 3. build the chat-completion request
//! 4. send it to the gateway
//! 5. extract the answer text
//!
//! The tool holds no mutable state, so calls may run concurrently.
//!
//! # Example
//!
//! ```no_run
//! use openvision::tools::vision::{AnalyzeImageArgs, VisionTool};
//! use openvision::types::config::Config;
//! use std::sync::Arc;
//!
//! # async fn example() -> openvision::error::VisionResult<()> {
//! let tool = VisionTool::new(Arc::new(Config::from_env()?));
//! let answer = tool
//!     .analyze(AnalyzeImageArgs::new("screenshots/login.png").with_query("Is there an error banner?"))
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

use crate::api::request::{MessageStrategy, RequestBuilder};
use crate::api::response::extract_content;
use crate::api::GatewayClient;
use crate::error::{ImageResolutionError, VisionError, VisionResult};
use crate::tools::image_input::{ImageInput, ImageReference, ImageResolver};
use crate::tools::params::{GenerationParams, MAX_TOKENS_RANGE};
use crate::types::config::{
    Config, DEFAULT_MAX_TOKENS, DEFAULT_QUERY, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use crate::types::message::ChatMessage;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// The `image` argument as sent by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageArg {
    /// URL, data URI, base64 text or path.
    Reference(String),
    /// Binary payload, base64 encoded for transport.
    Binary {
        /// Base64 image bytes.
        data: String,
        /// MIME type claimed by the host.
        #[serde(default, rename = "mimeType", alias = "mime_type")]
        mime_type: Option<String>,
    },
}

impl ImageArg {
    fn into_input(self) -> VisionResult<ImageInput> {
        match self {
            Self::Reference(text) => Ok(ImageInput::Text(text)),
            Self::Binary { data, mime_type } => {
                let data = STANDARD
                    .decode(data.trim())
                    .map_err(|e| ImageResolutionError::InvalidInlineData(e.to_string()))?;
                Ok(ImageInput::Bytes {
                    data,
                    mime_hint: mime_type,
                })
            }
        }
    }
}

/// Arguments of one `image_analysis` call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzeImageArgs {
    /// The image to analyze.
    pub image: ImageArg,
    /// Question about the image; defaults to [`DEFAULT_QUERY`].
    #[serde(default)]
    pub query: Option<String>,
    /// Model instructions; defaults to [`DEFAULT_SYSTEM_PROMPT`].
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Model identifier; defaults to the configured model.
    #[serde(default)]
    pub model: Option<String>,
    /// Completion length; defaults to [`DEFAULT_MAX_TOKENS`].
    #[serde(default)]
    pub max_tokens: Option<serde_json::Number>,
    /// Sampling temperature; defaults to [`DEFAULT_TEMPERATURE`].
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling.
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    /// Root for relative image paths.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    /// Full conversation replacing `query` and `system_prompt`.
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

impl AnalyzeImageArgs {
    /// Creates arguments for a textual image reference with all defaults.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self::from_image(ImageArg::Reference(image.into()))
    }

    /// Creates arguments for any image argument with all defaults.
    #[must_use]
    pub fn from_image(image: ImageArg) -> Self {
        Self {
            image,
            query: None,
            system_prompt: None,
            model: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            project_root: None,
            messages: None,
        }
    }

    /// Sets the query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the project root.
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Collects the generation parameters, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Validation`] if `max_tokens` is not a whole,
    /// non-negative number that fits a token count. Range checks happen in
    /// [`GenerationParams::validate`].
    pub fn generation_params(&self) -> VisionResult<GenerationParams> {
        let max_tokens = match &self.max_tokens {
            None => DEFAULT_MAX_TOKENS,
            Some(value) => token_count(value).ok_or_else(|| {
                VisionError::validation(
                    "max_tokens",
                    format!(
                        "must be an integer between {} and {}, got {value}",
                        MAX_TOKENS_RANGE.start(),
                        MAX_TOKENS_RANGE.end()
                    ),
                )
            })?,
        };
        Ok(GenerationParams {
            max_tokens,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        })
    }

    fn message_strategy(&mut self) -> MessageStrategy {
        match self.messages.take() {
            Some(messages) => MessageStrategy::Custom(messages),
            None => MessageStrategy::Query {
                query: self
                    .query
                    .take()
                    .unwrap_or_else(|| DEFAULT_QUERY.to_string()),
                system_prompt: self
                    .system_prompt
                    .take()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            },
        }
    }
}

// Integral JSON numbers, including ones written as `500.0`, that fit a u32.
fn token_count(value: &serde_json::Number) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let n = value.as_f64()?;
    if n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&n) {
        Some(n as u32)
    } else {
        None
    }
}

/// Runs image analyses against the configured gateway.
pub struct VisionTool {
    config: Arc<Config>,
    gateway: GatewayClient,
    resolver: ImageResolver,
}

impl VisionTool {
    /// Creates a tool for `config`.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let gateway = GatewayClient::new(&config);
        Self::with_parts(config, gateway, ImageResolver::new())
    }

    /// Creates a tool from explicit components.
    #[must_use]
    pub fn with_parts(config: Arc<Config>, gateway: GatewayClient, resolver: ImageResolver) -> Self {
        Self {
            config,
            gateway,
            resolver,
        }
    }

    /// Analyzes an image and returns the model's answer.
    ///
    /// # Errors
    ///
    /// Returns the first [`VisionError`] raised by any stage; nothing is
    /// retried.
    pub async fn analyze(&self, mut args: AnalyzeImageArgs) -> VisionResult<String> {
        let params = args.generation_params()?;
        params.validate()?;

        let strategy = args.message_strategy();
        strategy.validate()?;

        let model = args
            .model
            .take()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.default_model.as_str().to_string());

        let reference = ImageReference::from_input(args.image.into_input()?);
        info!(variant = reference.variant_name(), "resolving image");
        let image = self
            .resolver
            .resolve(reference, args.project_root.as_deref())
            .await?;

        info!(model = %model, mime_type = %image.mime_type, "analyzing image");
        let request = RequestBuilder::new(&model, params).build(&strategy, &image)?;

        let body = self.gateway.complete(&request).await?;
        let answer = extract_content(&body)?;

        info!(chars = answer.len(), "analysis completed");
        Ok(answer)
    }
}
