//! Core type definitions for OpenVision.
//!
//! - [`config`] - process configuration and the vision model catalogue
//! - [`image`] - resolved images, MIME inference and data URIs
//! - [`message`] - chat-completion wire types
//!
//! # Re-exports
//!
//! ```
//! use openvision::types::{ChatMessage, Config, ResolvedImage, Role};
//! ```

pub mod config;
pub mod image;
pub mod message;

pub use config::{Config, VisionModel};
pub use image::ResolvedImage;
pub use message::{ChatMessage, Role};
