//! MCP tool layer for Ferrochat.
//!
//! Presents one flat namespace of callable tools to the agent loop, sourced
//! from an arbitrary number of independently-managed MCP servers. Two
//! transport bindings are supported — a local subprocess speaking
//! newline-delimited JSON-RPC over stdio, and a remote streamable-HTTP
//! endpoint — both exposing the same list/call operations to the registry.

pub mod http;
pub mod protocol;
pub mod registry;
pub mod stdio;
pub mod validate;

pub use http::HttpToolServer;
pub use registry::ToolRegistry;
pub use stdio::StdioToolServer;
