//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC requests, tracks the session's initialization state, and
//! routes each method to its handler. Transports feed raw frames in through
//! [`Dispatcher::handle_line`] and write back whatever [`Outcome`] it yields.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_mcp_sdk::schema::{
    CallToolResult, ContentBlock, Implementation, InitializeResult, ListToolsResult,
    ProtocolVersion, ServerCapabilities, ServerCapabilitiesTools, TextContent,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::tools::ToolRegistry;
use crate::errors::{RpcError, ToolError};
use crate::mcp::rpc::{is_json_rpc_error, json_rpc_result, rpc_error_to_json_rpc, JSONRPC_VERSION};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Methods that are answered when the request carries an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
    Unknown(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Cancelled,
    Initialized,
}

impl Notification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "notifications/cancelled",
            Self::Initialized => "notifications/initialized",
        }
    }
}

/// Where an incoming method name is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Request(Method),
    Notification(Notification),
    Shutdown,
}

impl Route {
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Self::Request(Method::Initialize),
            "ping" => Self::Request(Method::Ping),
            "tools/list" => Self::Request(Method::ToolsList),
            "tools/call" => Self::Request(Method::ToolsCall),
            "notifications/cancelled" => Self::Notification(Notification::Cancelled),
            "notifications/initialized" => Self::Notification(Notification::Initialized),
            "shutdown" => Self::Shutdown,
            other => Self::Request(Method::Unknown(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Request(method) => method.as_str(),
            Self::Notification(notification) => notification.as_str(),
            Self::Shutdown => "shutdown",
        }
    }
}

/// Per-process session state. Only ever moves from uninitialized to initialized.
#[derive(Debug, Default)]
pub struct Session {
    initialized: AtomicBool,
}

impl Session {
    /// Returns whether the session was already initialized.
    pub fn mark_initialized(&self) -> bool {
        self.initialized.swap(true, Ordering::AcqRel)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

impl From<&Config> for ServerIdentity {
    fn from(config: &Config) -> Self {
        Self {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
            description: Some(config.server_description.clone())
                .filter(|description| !description.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Respond(Value),
    Silent,
    Shutdown,
}

impl Outcome {
    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Respond(value) => Some(value),
            Self::Silent | Self::Shutdown => None,
        }
    }
}

pub struct Dispatcher {
    identity: ServerIdentity,
    registry: ToolRegistry,
    session: Session,
}

impl Dispatcher {
    pub fn new(identity: ServerIdentity, registry: ToolRegistry) -> Self {
        Self {
            identity,
            registry,
            session: Session::default(),
        }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Byte-level entry point: one request line in, at most one serialized
    /// response out.
    pub async fn dispatch(&self, raw_line: &[u8]) -> Option<Vec<u8>> {
        let response = self.handle_line(raw_line).await.into_response()?;
        match serde_json::to_vec(&response) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!(error = %err, "failed to serialize response");
                None
            }
        }
    }

    /// Undecodable input carries no trustworthy id, so it is logged and
    /// dropped instead of answered.
    pub async fn handle_line(&self, raw_line: &[u8]) -> Outcome {
        let payload: Value = match serde_json::from_slice(raw_line) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "discarding undecodable request line");
                return Outcome::Silent;
            }
        };
        self.handle_value(payload).await
    }

    pub async fn handle_value(&self, payload: Value) -> Outcome {
        debug!(request = %payload, "received");

        let Value::Object(mut request) = payload else {
            warn!("discarding request that is not a JSON object");
            return Outcome::Silent;
        };

        let id = request.remove("id");
        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            debug!("request does not declare jsonrpc 2.0");
        }
        let route = match request.get("method") {
            Some(Value::String(name)) => Route::parse(name),
            Some(_) => {
                return reply(id, Err(RpcError::internal("method must be a string")));
            }
            None => return reply(id, Err(RpcError::internal("method is required"))),
        };
        let params = request.remove("params");

        let method = match route {
            Route::Request(method) => method,
            Route::Notification(notification) => {
                debug!(method = notification.as_str(), "notification acknowledged");
                return Outcome::Silent;
            }
            Route::Shutdown => {
                info!("shutdown requested");
                return Outcome::Shutdown;
            }
        };

        let result = self.handle_request(&method, params).await;
        match &result {
            Err(err @ RpcError::ToolExecution(_)) => {
                error!(method = method.as_str(), error = %err, "tool call failed");
            }
            Err(err) => {
                info!(
                    method = method.as_str(),
                    error = %err,
                    outcome = "failure",
                    "mcp action audited"
                );
            }
            Ok(_) => info!(method = method.as_str(), outcome = "success", "mcp action audited"),
        }

        reply(id, result)
    }

    async fn handle_request(
        &self,
        method: &Method,
        params: Option<Value>,
    ) -> Result<Value, RpcError> {
        match method {
            Method::Initialize => self.initialize(params.as_ref()),
            Method::Ping => Ok(json!({})),
            Method::ToolsList => {
                self.require_initialized()?;
                to_result_value(ListToolsResult {
                    meta: None,
                    next_cursor: None,
                    tools: self.registry.descriptors(),
                })
            }
            Method::ToolsCall => {
                self.require_initialized()?;
                self.call_tool(params).await
            }
            Method::Unknown(name) => Err(RpcError::MethodNotFound {
                method: name.clone(),
            }),
        }
    }

    fn require_initialized(&self) -> Result<(), RpcError> {
        if self.session.is_initialized() {
            Ok(())
        } else {
            Err(RpcError::NotInitialized)
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let client_name = params
            .and_then(|params| params.get("clientInfo"))
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let offered_version = params
            .and_then(|params| params.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or("unspecified");
        let already = self.session.mark_initialized();
        info!(
            client = client_name,
            offered_version,
            reinitialized = already,
            "session initialized"
        );

        to_result_value(InitializeResult {
            server_info: Implementation {
                name: self.identity.name.clone(),
                version: self.identity.version.clone(),
                title: None,
                description: self.identity.description.clone(),
                icons: vec![],
                website_url: None,
            },
            capabilities: ServerCapabilities {
                tools: Some(ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::V2024_11_05.into(),
            instructions: None,
            meta: None,
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = match params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(RpcError::internal("params must be an object")),
        };

        let name = match params.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(RpcError::internal("params.name must be a string")),
            None => return Err(RpcError::internal("params.name is required")),
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(_) => return Err(RpcError::internal("params.arguments must be an object")),
        };

        let handler = self
            .registry
            .get(&name)
            .ok_or_else(|| RpcError::ToolNotFound { name: name.clone() })?;

        // A spawned task turns a panicking handler into a JoinError.
        let text = tokio::spawn(async move { handler.invoke(arguments).await })
            .await
            .map_err(|err| {
                if err.is_panic() {
                    ToolError::failed("tool handler panicked")
                } else {
                    ToolError::failed("tool handler was cancelled")
                }
            })??;

        debug!(tool = %name, "tool call completed");
        to_result_value(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(text, None, None))],
            is_error: None,
            meta: None,
            structured_content: None,
        })
    }
}

fn to_result_value<T: serde::Serialize>(result: T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|err| RpcError::internal(err.to_string()))
}

fn reply(id: Option<Value>, result: Result<Value, RpcError>) -> Outcome {
    let Some(id) = id else {
        return Outcome::Silent;
    };

    let response = match result {
        Ok(value) => json_rpc_result(Some(id), value),
        Err(err) => rpc_error_to_json_rpc(Some(id), &err),
    };
    debug!(
        response = %response,
        is_error = is_json_rpc_error(&response),
        "sending"
    );
    Outcome::Respond(response)
}
