//! JSON-RPC envelope construction
//!
//! Builds response objects around results and [`RpcError`]s, echoing the
//! request id back with its original JSON type.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult,
    RpcError as SdkRpcError,
};
use serde_json::{json, Value};

use crate::errors::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn rpc_error_to_json_rpc(id: Option<Value>, err: &RpcError) -> Value {
    json_rpc_error(id, err.code(), &err.to_string())
}

/// Error envelope. Ids the SDK cannot represent (fractional numbers, null)
/// are written back verbatim.
pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let response = JsonrpcErrorResponse::new(
            SdkRpcError {
                code: i64::from(code),
                data: None,
                message: message.to_string(),
            },
            Some(request_id),
        );
        if let Ok(value) = serde_json::to_value(response) {
            return value;
        }
    }

    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id.unwrap_or(Value::Null),
        "error": {
            "code": code,
            "message": message
        }
    })
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let (Some(request_id), Some(extra)) = (
        id.as_ref().and_then(value_to_request_id),
        result.as_object().cloned(),
    ) {
        let response = JsonrpcResultResponse::new(
            request_id,
            McpResult {
                meta: None,
                extra: Some(extra),
            },
        );
        if let Ok(value) = serde_json::to_value(response) {
            return value;
        }
    }

    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id.unwrap_or(Value::Null),
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    if value.is_i64() {
        return value.as_i64().map(RequestId::Integer);
    }

    None
}
