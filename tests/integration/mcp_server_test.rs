//! MCP server tests over in-memory stdio.
//!
//! The server is driven exactly like a host would: newline-delimited
//! JSON-RPC in, newline-delimited JSON-RPC out.

use crate::common::{completion_body, tool_for, TestContext, PNG_1X1};
use openvision::mcp::McpServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sends `requests` to a fresh server, closes input, and returns every
/// response keyed by id.
async fn exchange(gateway: &str, requests: &[Value]) -> HashMap<String, Value> {
    let (mut host_out, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, host_in) = tokio::io::duplex(64 * 1024);

    let server = Arc::new(McpServer::new(tool_for(gateway)));
    let handle = tokio::spawn(server.serve(server_in, server_out));

    for request in requests {
        host_out
            .write_all(format!("{request}\n").as_bytes())
            .await
            .unwrap();
    }
    host_out.write_all(b"this is not json\n").await.unwrap();
    drop(host_out);

    let mut responses = HashMap::new();
    let mut lines = BufReader::new(host_in).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["jsonrpc"], "2.0");
        responses.insert(response["id"].to_string(), response);
    }

    handle.await.unwrap().unwrap();
    responses
}

#[tokio::test]
async fn test_handshake_and_listing() {
    let responses = exchange(
        "http://127.0.0.1:9",
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05", "capabilities": {},
                              "clientInfo": {"name": "test-host", "version": "0.0.1"}}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/list"}),
        ],
    )
    .await;

    // Four requests plus the parse error; the notification is not answered.
    assert_eq!(responses.len(), 5);

    let init = &responses["1"]["result"];
    assert_eq!(init["protocolVersion"], "2024-11-05");
    assert_eq!(init["serverInfo"]["name"], "openvision");

    let tools = responses["2"]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "image_analysis");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["image"]));

    assert_eq!(responses["\"p\""]["result"], json!({}));
    assert_eq!(responses["3"]["error"]["code"], -32601);
    assert_eq!(responses["null"]["error"]["code"], -32700);
}

#[tokio::test]
async fn test_tool_call_success_and_failures() {
    let ctx = TestContext::new();
    ctx.create_file("ui.png", PNG_1X1);

    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A login form.")))
        .expect(1)
        .mount(&gateway)
        .await;

    let root = ctx.path();
    let responses = exchange(
        &gateway.uri(),
        &[
            json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call", "params": {
                "name": "image_analysis",
                "arguments": {"image": "ui.png", "project_root": root, "query": "What is shown?"}
            }}),
            json!({"jsonrpc": "2.0", "id": 11, "method": "tools/call", "params": {
                "name": "image_analysis",
                "arguments": {"image": "absent.png", "project_root": root}
            }}),
            json!({"jsonrpc": "2.0", "id": 12, "method": "tools/call", "params": {
                "name": "image_analysis",
                "arguments": {"image": "ui.png", "project_root": root, "top_p": 7}
            }}),
            json!({"jsonrpc": "2.0", "id": 13, "method": "tools/call", "params": {
                "name": "image_analysis",
                "arguments": {"image": 42}
            }}),
            json!({"jsonrpc": "2.0", "id": 14, "method": "tools/call", "params": {
                "name": "image_analysis",
                "arguments": {"image": "ui.png", "project_root": root, "max_tokens": 1e20}
            }}),
        ],
    )
    .await;

    let ok = &responses["10"]["result"];
    assert_eq!(ok["isError"], false);
    assert_eq!(ok["content"][0]["type"], "text");
    assert_eq!(ok["content"][0]["text"], "A login form.");

    let missing = &responses["11"]["result"];
    assert_eq!(missing["isError"], true);
    let text = missing["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("ImageResolutionError: "));
    assert!(text.contains("absent.png"));

    let invalid = &responses["12"]["result"];
    assert_eq!(invalid["isError"], true);
    assert!(invalid["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("ValidationError: top_p"));

    assert_eq!(responses["13"]["error"]["code"], -32602);

    // Float token counts reach the range check instead of failing to parse.
    let fractional = &responses["14"]["result"];
    assert_eq!(fractional["isError"], true);
    assert!(fractional["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("ValidationError: max_tokens"));
}
