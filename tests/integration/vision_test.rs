//! End-to-end tests for the `image_analysis` pipeline.
//!
//! A wiremock server stands in for both the image host and the gateway, so
//! every test can assert exactly which outbound calls were made.

use crate::common::{completion_body, tool_for, TestContext, JPEG_STUB, PNG_1X1};
use base64::{engine::general_purpose::STANDARD, Engine};
use openvision::api::request::IMAGE_PLACEHOLDER;
use openvision::error::{ImageResolutionError, VisionError};
use openvision::tools::vision::{AnalyzeImageArgs, ImageArg};
use openvision::types::message::{ChatMessage, ContentPart};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use serial_test::serial;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_gateway(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-or-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(answer)))
        .expect(1)
        .mount(server)
        .await;
}

async fn gateway_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let request = requests
        .iter()
        .find(|r| r.url.path() == "/chat/completions")
        .expect("gateway should have been called");
    serde_json::from_slice(&request.body).expect("gateway body should be JSON")
}

fn user_image_url(body: &Value) -> &str {
    body["messages"][1]["content"]
        .as_array()
        .and_then(|parts| parts.iter().find(|p| p["type"] == "image_url"))
        .and_then(|p| p["image_url"]["url"].as_str())
        .expect("user message should carry an image")
}

// ============================================================================
// Scenario tests
// ============================================================================

/// A remote image is downloaded, inlined as a JPEG data URI, and the answer
/// comes back unchanged.
#[tokio::test]
async fn test_remote_url_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(JPEG_STUB),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_gateway(&server, "It is a cat.\n").await;

    let tool = tool_for(&server.uri());
    let args = AnalyzeImageArgs::new(format!("{}/cat.jpg", server.uri()))
        .with_query("What animal is this?");
    let answer = tool.analyze(args).await.unwrap();
    assert_eq!(answer, "It is a cat.\n");

    let body = gateway_body(&server).await;
    assert_eq!(body["model"], "qwen/qwen2.5-vl-32b-instruct:free");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"][0]["text"], "What animal is this?");
    assert_eq!(
        user_image_url(&body),
        format!("data:image/jpeg;base64,{}", STANDARD.encode(JPEG_STUB))
    );
    assert!(body.get("top_p").is_none());
}

/// Out-of-range parameters fail before any outbound traffic.
#[tokio::test]
async fn test_invalid_max_tokens_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_STUB))
        .expect(0)
        .mount(&server)
        .await;

    let tool = tool_for(&server.uri());
    let mut args = AnalyzeImageArgs::new(format!("{}/cat.jpg", server.uri()));
    args.max_tokens = Some(50u32.into());

    let err = tool.analyze(args).await.unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
    assert!(err.to_string().starts_with("max_tokens"));
}

/// Non-200 gateway answers keep the status and body verbatim.
#[tokio::test]
async fn test_gateway_rate_limit() {
    let ctx = TestContext::new();
    ctx.create_file("shot.png", PNG_1X1);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let tool = tool_for(&server.uri());
    let args = AnalyzeImageArgs::new("shot.png").with_project_root(ctx.path());
    match tool.analyze(args).await.unwrap_err() {
        VisionError::Gateway {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
}

/// A missing relative file names the absolute path that was tried.
#[tokio::test]
#[serial]
async fn test_missing_file_reports_absolute_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;

    let tool = tool_for(&server.uri());
    let err = tool
        .analyze(AnalyzeImageArgs::new("missing.jpg"))
        .await
        .unwrap_err();

    let expected = std::env::current_dir().unwrap().join("missing.jpg");
    match err {
        VisionError::ImageResolution(ImageResolutionError::FileNotFound { path }) => {
            assert!(path.is_absolute());
            assert_eq!(path, expected);
        }
        other => panic!("expected missing file, got {other:?}"),
    }
}

// ============================================================================
// Resolution behavior
// ============================================================================

/// Relative paths without a project root resolve against the working directory.
#[tokio::test]
#[serial]
async fn test_relative_path_uses_working_directory() {
    let ctx = TestContext::new();
    ctx.create_file("frames/first.gif", b"GIF89a\x01\x00\x01\x00");

    let server = MockServer::start().await;
    mount_gateway(&server, "a frame").await;
    let tool = tool_for(&server.uri());

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(ctx.path()).unwrap();
    let result = tool.analyze(AnalyzeImageArgs::new("frames/first.gif")).await;
    std::env::set_current_dir(previous).unwrap();

    assert_eq!(result.unwrap(), "a frame");
    let body = gateway_body(&server).await;
    assert!(user_image_url(&body).starts_with("data:image/gif;base64,"));
}

/// Base64 that decodes to an image wins over a file with the same name.
#[tokio::test]
async fn test_base64_wins_over_existing_file() {
    let ctx = TestContext::new();
    ctx.create_file("iVBORw0KGgo=", JPEG_STUB);

    let server = MockServer::start().await;
    mount_gateway(&server, "png").await;

    let tool = tool_for(&server.uri());
    let args = AnalyzeImageArgs::new("iVBORw0KGgo=").with_project_root(ctx.path());
    tool.analyze(args).await.unwrap();

    let body = gateway_body(&server).await;
    assert_eq!(user_image_url(&body), "data:image/png;base64,iVBORw0KGgo=");
}

/// Files with unknown extensions are sniffed, then fall back to JPEG.
#[tokio::test]
async fn test_unknown_extension_mime() {
    let ctx = TestContext::new();
    ctx.create_file("capture.bin", PNG_1X1);
    ctx.create_file("blob.dat", b"not an image at all");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(2)
        .mount(&server)
        .await;
    let tool = tool_for(&server.uri());

    for name in ["capture.bin", "blob.dat"] {
        tool.analyze(AnalyzeImageArgs::new(name).with_project_root(ctx.path()))
            .await
            .unwrap();
    }

    let requests = server.received_requests().await.unwrap();
    let urls: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            user_image_url(&body).to_string()
        })
        .collect();
    assert!(urls[0].starts_with("data:image/png;base64,"));
    assert!(urls[1].starts_with("data:image/jpeg;base64,"));
}

/// A failing image download is a resolution error and skips the gateway.
#[tokio::test]
async fn test_remote_404_is_resolution_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;

    let tool = tool_for(&server.uri());
    let url = format!("{}/gone.png", server.uri());
    let err = tool.analyze(AnalyzeImageArgs::new(url.clone())).await.unwrap_err();

    assert_eq!(err.kind(), "ImageResolutionError");
    assert!(err.to_string().contains(&url));
}

/// Host-supplied binary data is used without touching the filesystem.
#[tokio::test]
async fn test_binary_argument() {
    let server = MockServer::start().await;
    mount_gateway(&server, "bytes").await;

    let tool = tool_for(&server.uri());
    let args = AnalyzeImageArgs::from_image(ImageArg::Binary {
        data: STANDARD.encode(PNG_1X1),
        mime_type: Some("image/png".into()),
    });
    assert_eq!(tool.analyze(args).await.unwrap(), "bytes");

    let body = gateway_body(&server).await;
    assert_eq!(
        user_image_url(&body),
        format!("data:image/png;base64,{}", STANDARD.encode(PNG_1X1))
    );
}

// ============================================================================
// Request options
// ============================================================================

/// Caller-supplied model and sampling options reach the gateway.
#[tokio::test]
async fn test_options_forwarded() {
    let ctx = TestContext::new();
    ctx.create_file("a.png", PNG_1X1);

    let server = MockServer::start().await;
    mount_gateway(&server, "ok").await;
    let tool = tool_for(&server.uri());

    let args: AnalyzeImageArgs = serde_json::from_value(json!({
        "image": "a.png",
        "project_root": ctx.path(),
        "model": "openai/gpt-4o",
        "system_prompt": "Be brief.",
        "max_tokens": 300,
        "temperature": 0.1,
        "top_p": 0.8,
        "presence_penalty": 1.5
    }))
    .unwrap();
    tool.analyze(args).await.unwrap();

    let body = gateway_body(&server).await;
    assert_eq!(body["model"], "openai/gpt-4o");
    assert_eq!(body["messages"][0]["content"], "Be brief.");
    assert_eq!(body["max_tokens"], 300);
    assert_eq!(body["temperature"], 0.1);
    assert_eq!(body["top_p"], 0.8);
    assert_eq!(body["presence_penalty"], 1.5);
    assert!(body.get("frequency_penalty").is_none());
}

/// A custom conversation gets the image in place of its placeholder.
#[tokio::test]
async fn test_custom_messages() {
    let ctx = TestContext::new();
    ctx.create_file("a.png", PNG_1X1);

    let server = MockServer::start().await;
    mount_gateway(&server, "ok").await;
    let tool = tool_for(&server.uri());

    let mut args = AnalyzeImageArgs::new("a.png").with_project_root(ctx.path());
    args.messages = Some(vec![
        ChatMessage::system("You grade screenshots."),
        ChatMessage::user_parts(vec![
            ContentPart::text("Grade this:"),
            ContentPart::image_url(IMAGE_PLACEHOLDER),
            ContentPart::text("Explain."),
        ]),
    ]);
    tool.analyze(args).await.unwrap();

    let body = gateway_body(&server).await;
    let parts = body["messages"][1]["content"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2]["text"], "Explain.");
    assert!(parts[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

/// Custom conversations without a user turn are rejected before any I/O.
#[tokio::test]
async fn test_custom_messages_without_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;

    let tool = tool_for(&server.uri());
    let mut args = AnalyzeImageArgs::new("does-not-exist.png");
    args.messages = Some(vec![ChatMessage::system("alone")]);

    let err = tool.analyze(args).await.unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

/// Inline payloads that decode to nothing are rejected before the gateway.
#[tokio::test]
async fn test_empty_inline_images_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("x")))
        .expect(0)
        .mount(&server)
        .await;
    let tool = tool_for(&server.uri());

    let empty_uri = AnalyzeImageArgs::new("data:image/png;base64,");
    let empty_binary: AnalyzeImageArgs =
        serde_json::from_value(json!({"image": {"data": ""}})).unwrap();

    for args in [empty_uri, empty_binary] {
        let err = tool.analyze(args).await.unwrap_err();
        assert_eq!(err.kind(), "ImageResolutionError");
        assert!(err.to_string().contains("empty image payload"));
    }
}
