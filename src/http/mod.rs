//! HTTP transport layer for the Model Context Protocol
//!
//! One JSON-RPC request per `POST /`, answered in the response body.

pub mod handlers;
