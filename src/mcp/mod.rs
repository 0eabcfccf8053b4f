//! MCP (Model Context Protocol) server surface.
//!
//! - [`protocol`] - JSON-RPC 2.0 message types
//! - [`server`] - the stdio request loop and method dispatch

pub mod protocol;
pub mod server;

pub use server::McpServer;
