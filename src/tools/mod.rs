//! The image analysis tool and its input handling.

pub mod image_input;
pub mod params;
pub mod vision;

pub use vision::{AnalyzeImageArgs, VisionTool};
