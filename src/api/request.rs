//! Chat-completion request construction.
//!
//! A request always carries the resolved image exactly once. How the
//! conversation around it is shaped depends on the [`MessageStrategy`]:
//!
//! - [`MessageStrategy::Query`] builds the standard two-message exchange,
//!   a system prompt followed by a user message of `[text, image]`.
//! - [`MessageStrategy::Custom`] takes a caller-supplied conversation and
//!   attaches the image to its first user message.
//!
//! Building is side-effect free; caller-supplied values are cloned, never
//! modified in place.

use crate::error::{VisionError, VisionResult};
use crate::tools::params::GenerationParams;
use crate::types::image::ResolvedImage;
use crate::types::message::{
    ChatMessage, CompletionRequest, ContentPart, MessageContent, Role,
};

/// Placeholder URL that custom conversations use to mark where the image goes.
pub const IMAGE_PLACEHOLDER: &str = "{{image}}";

/// How the messages around the image are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageStrategy {
    /// A system prompt plus a single user query.
    Query {
        /// The user's question about the image.
        query: String,
        /// Instructions for the model.
        system_prompt: String,
    },
    /// A full conversation supplied by the caller.
    Custom(Vec<ChatMessage>),
}

impl MessageStrategy {
    /// Checks that the strategy can carry an image, without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Validation`] for a custom conversation with no
    /// user message.
    pub fn validate(&self) -> VisionResult<()> {
        match self {
            Self::Custom(messages) if !messages.iter().any(|m| m.role == Role::User) => {
                Err(no_user_message())
            }
            _ => Ok(()),
        }
    }

    fn messages(&self, data_uri: String) -> VisionResult<Vec<ChatMessage>> {
        match self {
            Self::Query {
                query,
                system_prompt,
            } => Ok(query_messages(query, system_prompt, data_uri)),
            Self::Custom(messages) => attach_to_custom(messages, data_uri),
        }
    }
}

/// Assembles [`CompletionRequest`]s for one model and parameter set.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    model: &'a str,
    params: GenerationParams,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder. `params` are expected to be validated already.
    #[must_use]
    pub fn new(model: &'a str, params: GenerationParams) -> Self {
        Self { model, params }
    }

    /// Builds the request body for `image`.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Validation`] if a custom conversation has no
    /// user message to carry the image.
    pub fn build(
        &self,
        strategy: &MessageStrategy,
        image: &ResolvedImage,
    ) -> VisionResult<CompletionRequest> {
        Ok(CompletionRequest {
            model: self.model.to_string(),
            messages: strategy.messages(image.to_data_uri())?,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            presence_penalty: self.params.presence_penalty,
            frequency_penalty: self.params.frequency_penalty,
        })
    }
}

fn no_user_message() -> VisionError {
    VisionError::validation("messages", "no user message to attach the image to")
}

fn query_messages(query: &str, system_prompt: &str, data_uri: String) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_parts(vec![
            ContentPart::text(query),
            ContentPart::image_url(data_uri),
        ]),
    ]
}

fn attach_to_custom(messages: &[ChatMessage], data_uri: String) -> VisionResult<Vec<ChatMessage>> {
    let mut messages = messages.to_vec();
    let user = messages
        .iter_mut()
        .find(|m| m.role == Role::User)
        .ok_or_else(no_user_message)?;

    let content = std::mem::replace(&mut user.content, MessageContent::Parts(Vec::new()));
    user.content = match content {
        MessageContent::Text(text) => MessageContent::Parts(vec![
            ContentPart::text(text),
            ContentPart::image_url(data_uri),
        ]),
        MessageContent::Parts(mut parts) => {
            let has_image = parts.iter().any(ContentPart::is_image);
            let placeholder = parts.iter_mut().find_map(|part| match part {
                ContentPart::ImageUrl { image_url } if image_url.url == IMAGE_PLACEHOLDER => {
                    Some(image_url)
                }
                _ => None,
            });

            match placeholder {
                Some(image_url) => image_url.url = data_uri,
                None if !has_image => {
                    parts.push(ContentPart::image_url(data_uri));
                }
                // The caller already placed an image of their own.
                None => {}
            }
            MessageContent::Parts(parts)
        }
    };

    Ok(messages)
}
