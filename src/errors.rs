use thiserror::Error;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_NOT_INITIALIZED: i32 = -32002;

/// Failure raised by a tool handler while running a call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Protocol-level failures, surfaced to the client as JSON-RPC error objects.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Server not initialized")]
    NotInitialized,
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },
    #[error("Tool execution failed: {0}")]
    ToolExecution(#[from] ToolError),
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl RpcError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NotInitialized => SERVER_NOT_INITIALIZED,
            Self::MethodNotFound { .. } | Self::ToolNotFound { .. } => METHOD_NOT_FOUND,
            Self::ToolExecution(_) | Self::Internal { .. } => INTERNAL_ERROR,
        }
    }
}
