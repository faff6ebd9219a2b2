//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides protocol-level request validation, method routing, response
//! formatting, and the stdio transport loop.

pub mod rpc;
pub mod server;
pub mod stdio;
