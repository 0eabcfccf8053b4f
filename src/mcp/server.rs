//! Stdio MCP server exposing the `image_analysis` tool.
//!
//! Requests arrive one JSON object per line. Each request is handled on its
//! own task so a slow analysis never blocks `ping` or `tools/list`; answers
//! are funnelled through a single writer task and may therefore leave in a
//! different order than the requests arrived.

use crate::api::tools::{default_tools, IMAGE_ANALYSIS_TOOL};
use crate::mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::vision::{AnalyzeImageArgs, VisionTool};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Protocol revision announced when the host does not name one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "openvision";

const INSTRUCTIONS: &str = "Vision analysis for images. Call image_analysis with a file path, \
                            URL or base64 image and a query describing what you need.";

/// Dispatches JSON-RPC requests to the vision tool.
pub struct McpServer {
    tool: VisionTool,
}

impl McpServer {
    /// Creates a server around `tool`.
    #[must_use]
    pub fn new(tool: VisionTool) -> Self {
        Self { tool }
    }

    /// Serves the process's stdin and stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn serve_stdio(self) -> Result<()> {
        Arc::new(self)
            .serve(tokio::io::stdin(), tokio::io::stdout())
            .await
    }

    /// Serves newline-delimited JSON-RPC over `reader` and `writer`.
    ///
    /// Returns once `reader` reaches EOF and every in-flight request has
    /// been answered.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure of either stream.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer_tx, mut writer_rx) = mpsc::channel::<String>(32);

        let mut writer = writer;
        let writer_task = tokio::spawn(async move {
            while let Some(data) = writer_rx.recv().await {
                writer.write_all(data.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let tx = writer_tx.clone();
            tokio::spawn(async move {
                let Some(response) = server.handle_line(&line).await else {
                    return;
                };
                match serde_json::to_string(&response) {
                    Ok(data) => {
                        if tx.send(data).await.is_err() {
                            tracing::warn!("writer closed before response was sent");
                        }
                    }
                    Err(e) => tracing::error!("Failed to serialize response: {e}"),
                }
            });
        }

        tracing::debug!("input closed, draining pending responses");
        drop(writer_tx);
        writer_task.await??;
        Ok(())
    }

    /// Handles one raw input line. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line.trim()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse request: {e}");
                return Some(JsonRpcResponse::new_error(None, JsonRpcError::parse_error()));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(_) => Some(JsonRpcResponse::new_error(
                id,
                JsonRpcError::invalid_request(),
            )),
        }
    }

    /// Handles one parsed request. Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id().map(|id| id.to_value()) else {
            tracing::debug!(method = request.method(), "notification received");
            return None;
        };

        let response = match request.method() {
            "initialize" => JsonRpcResponse::success(id, initialize_result(request.params())),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": default_tools() })),
            "tools/call" => match self.call_tool(request.params()).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(error) => JsonRpcResponse::new_error(Some(id), error),
            },
            method => {
                tracing::warn!(method, "unknown method");
                JsonRpcResponse::new_error(Some(id), JsonRpcError::method_not_found(method))
            }
        };
        Some(response)
    }

    async fn call_tool(&self, params: &Value) -> std::result::Result<Value, JsonRpcError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        if name != IMAGE_ANALYSIS_TOOL {
            return Err(JsonRpcError::invalid_params(&format!("unknown tool '{name}'")));
        }

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        let args: AnalyzeImageArgs = serde_json::from_value(arguments)
            .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;

        let result = match self.tool.analyze(args).await {
            Ok(answer) => tool_result(answer, false),
            Err(e) => {
                if e.is_input_error() {
                    tracing::warn!(kind = e.kind(), "image analysis rejected: {e}");
                } else {
                    tracing::error!(kind = e.kind(), "image analysis failed: {e}");
                }
                tool_result(e.tool_message(), true)
            }
        };
        Ok(result)
    }
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": INSTRUCTIONS
    })
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}
