//! OpenVision - MCP server for image analysis

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openvision::mcp::McpServer;
use openvision::tools::VisionTool;
use openvision::types::config::{API_KEY_ENV, BASE_URL_ENV, DEFAULT_MODEL_ENV};
use openvision::Config;

#[derive(Parser, Debug)]
#[command(name = "openvision")]
#[command(about = "OpenVision - MCP server for image analysis via OpenRouter")]
#[command(version)]
struct Args {
    /// OpenRouter API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<SecretString>,

    /// Model used when a call does not name one
    #[arg(long, env = DEFAULT_MODEL_ENV)]
    default_model: Option<String>,

    /// Gateway base URL
    #[arg(long, env = BASE_URL_ENV)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match Config::new(
        args.api_key,
        args.default_model.as_deref(),
        args.base_url.as_deref(),
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e.tool_message());
            std::process::exit(1);
        }
    };

    tracing::info!(
        default_model = %config.default_model,
        base_url = %config.base_url,
        "starting openvision MCP server"
    );

    let server = McpServer::new(VisionTool::new(Arc::new(config)));
    server
        .serve_stdio()
        .await
        .context("stdio transport failed")?;

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
