//! OpenVision - image analysis over MCP
//!
//! Exposes a single `image_analysis` tool to MCP hosts. Images given as
//! paths, URLs or base64 data are resolved, sent to a vision model behind
//! the OpenRouter chat-completions gateway, and the model's answer is
//! returned as text.
//!
//! This library exposes the core types and functionality for testing and extension.

pub mod api;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod types;

// Re-export core types for convenient access
pub use error::{VisionError, VisionResult};
pub use types::{Config, VisionModel};
