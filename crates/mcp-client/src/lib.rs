//! `codial-mcp-client` — MCP (Model Context Protocol) client.
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for communicating with an MCP server
//!   over HTTP.
//! - An [`McpClient`] that performs the MCP handshake (`initialize` +
//!   `notifications/initialized`), auto-paginating discovery
//!   (`tools/list`, `prompts/list`, `resources/list`,
//!   `resources/templates/list`), `tools/call`, and `ping`.
//!
//! The client is absent when no MCP server URL is configured; the turn
//! engine then runs with empty tool metadata.

pub mod client;
pub mod protocol;

pub use client::{McpClient, McpError};
pub use protocol::{McpToolDef, ToolCallResult};
