//! Tool definitions advertised to the host.
//!
//! The host lists tools before calling them; each definition carries a name,
//! a description the agent reads to decide when to call it, and a JSON
//! schema for the arguments.
//!
//! # Example
//!
//! ```rust
//! use openvision::api::tools::image_analysis_tool;
//!
//! let tool = image_analysis_tool();
//! assert_eq!(tool.name, "image_analysis");
//! ```

use crate::tools::params::{MAX_TOKENS_RANGE, PENALTY_RANGE, UNIT_RANGE};
use crate::types::config::{
    DEFAULT_MAX_TOKENS, DEFAULT_QUERY, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name under which the analysis operation is exposed.
pub const IMAGE_ANALYSIS_TOOL: &str = "image_analysis";

/// A tool definition as listed to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// The unique name of the tool.
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// JSON Schema defining the input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Returns every tool this server exposes.
#[must_use]
pub fn default_tools() -> Vec<ToolDefinition> {
    vec![image_analysis_tool()]
}

/// Creates the `image_analysis` tool definition.
#[must_use]
pub fn image_analysis_tool() -> ToolDefinition {
    ToolDefinition::new(
        IMAGE_ANALYSIS_TOOL,
        "Analyze an image with a vision-capable model. The image may be a local file path \
         (absolute, or relative to project_root), an http(s) URL, a data URI, or base64 data. \
         For best results, explain in the query why you need the analysis and what to focus on.",
        json!({
            "type": "object",
            "properties": {
                "image": {
                    "description": "File path, URL, data URI or base64 string; or an object with base64 `data` and optional `mimeType`",
                    "oneOf": [
                        {"type": "string"},
                        {
                            "type": "object",
                            "properties": {
                                "data": {"type": "string"},
                                "mimeType": {"type": "string"}
                            },
                            "required": ["data"]
                        }
                    ]
                },
                "query": {
                    "type": "string",
                    "description": "What to look for in the image",
                    "default": DEFAULT_QUERY
                },
                "system_prompt": {
                    "type": "string",
                    "description": "Instructions defining the model's role",
                    "default": DEFAULT_SYSTEM_PROMPT
                },
                "model": {
                    "type": "string",
                    "description": "Vision model identifier; defaults to the server's configured model"
                },
                "max_tokens": {
                    "type": "integer",
                    "minimum": MAX_TOKENS_RANGE.start(),
                    "maximum": MAX_TOKENS_RANGE.end(),
                    "default": DEFAULT_MAX_TOKENS
                },
                "temperature": {
                    "type": "number",
                    "minimum": UNIT_RANGE.start(),
                    "maximum": UNIT_RANGE.end(),
                    "default": DEFAULT_TEMPERATURE
                },
                "top_p": {
                    "type": "number",
                    "minimum": UNIT_RANGE.start(),
                    "maximum": UNIT_RANGE.end()
                },
                "presence_penalty": {
                    "type": "number",
                    "minimum": PENALTY_RANGE.start(),
                    "maximum": PENALTY_RANGE.end()
                },
                "frequency_penalty": {
                    "type": "number",
                    "minimum": PENALTY_RANGE.start(),
                    "maximum": PENALTY_RANGE.end()
                },
                "project_root": {
                    "type": "string",
                    "description": "Directory that relative image paths are resolved against"
                },
                "messages": {
                    "type": "array",
                    "description": "Full conversation to send instead of query/system_prompt. \
                                    The image is attached to the first user message, replacing \
                                    an image_url part whose url is \"{{image}}\" if present.",
                    "items": {"type": "object"}
                }
            },
            "required": ["image"]
        }),
    )
}
