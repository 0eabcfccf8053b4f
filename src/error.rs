//! Error types for OpenVision.
//!
//! Every failure in the analysis pipeline is a [`VisionError`]. The variants
//! map one-to-one onto the kinds a tool host needs to tell apart:
//!
//! - configuration problems (missing credential)
//! - invalid generation parameters
//! - image references that cannot be resolved
//! - gateway, network and decoding failures
//! - well-formed but unexpected gateway responses
//!
//! Nothing is retried. Errors are raised as soon as they are detected and the
//! host-facing layer renders them with [`VisionError::tool_message`].
//!
//! # Example
//!
//! ```
//! use openvision::error::{VisionError, VisionResult};
//!
//! fn check(max_tokens: u32) -> VisionResult<()> {
//!     if max_tokens < 100 {
//!         return Err(VisionError::validation("max_tokens", "must be at least 100"));
//!     }
//!     Ok(())
//! }
//!
//! let err = check(50).unwrap_err();
//! assert_eq!(err.kind(), "ValidationError");
//! assert!(err.tool_message().starts_with("ValidationError: "));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `VisionError`.
pub type VisionResult<T> = Result<T, VisionError>;

/// Top-level error for an image analysis call.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Required configuration is missing or invalid.
    #[error("{0}")]
    Configuration(String),

    /// A generation parameter is out of range or an argument is malformed.
    #[error("{parameter}: {message}")]
    Validation {
        /// Name of the offending parameter.
        parameter: String,
        /// The violated constraint.
        message: String,
    },

    /// The image reference could not be turned into bytes.
    #[error(transparent)]
    ImageResolution(#[from] ImageResolutionError),

    /// The gateway answered with a non-200 status.
    #[error("gateway returned {status_code}: {message}")]
    Gateway {
        /// HTTP status code.
        status_code: u16,
        /// Response body, verbatim.
        message: String,
    },

    /// The gateway could not be reached.
    #[error("failed to reach gateway: {0}")]
    Network(String),

    /// The gateway body was not valid JSON.
    #[error("gateway response is not valid JSON: {0}")]
    Decode(String),

    /// The gateway body was JSON but lacked the expected fields.
    #[error("unexpected gateway response: {0}")]
    MalformedResponse(String),
}

/// Failures while resolving an image reference.
#[derive(Debug, Error)]
pub enum ImageResolutionError {
    /// The remote URL could not be fetched or returned a non-2xx status.
    #[error("failed to download image from {url}: {reason}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// Status or transport failure.
        reason: String,
    },

    /// No file exists at the resolved path.
    #[error("image file not found at {}", .path.display())]
    FileNotFound {
        /// The absolute path that was tried.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read image file at {}: {reason}", .path.display())]
    FileUnreadable {
        /// The absolute path that was tried.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },

    /// Inline image data could not be decoded.
    #[error("invalid inline image data: {0}")]
    InvalidInlineData(String),
}

impl VisionError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a validation error for `parameter`.
    #[must_use]
    pub fn validation(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Creates a gateway error from a status code and body text.
    #[must_use]
    pub fn gateway(status_code: u16, message: impl Into<String>) -> Self {
        Self::Gateway {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a malformed response error.
    #[must_use]
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Returns the stable kind label for this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Validation { .. } => "ValidationError",
            Self::ImageResolution(_) => "ImageResolutionError",
            Self::Gateway { .. } => "GatewayError",
            Self::Network(_) => "NetworkError",
            Self::Decode(_) => "DecodeError",
            Self::MalformedResponse(_) => "MalformedResponseError",
        }
    }

    /// Returns `true` if the caller can fix this error by changing its input.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::ImageResolution(_))
    }

    /// Renders the error for a tool host as `"<kind>: <message>"`.
    #[must_use]
    pub fn tool_message(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
