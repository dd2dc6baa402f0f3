//! JSON-RPC 2.0 server speaking the tool protocol over stdio.
//!
//! Requests arrive one per line on stdin; responses leave one per line on
//! stdout. All logging goes to stderr so the protocol stream stays clean.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::handlers::handle_tool_call;
use super::SharedState;
use crate::error::{AppResult, CommandError};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

// JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Incoming JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Absent for notifications; notifications get no response.
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// Outgoing JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Content block within a tool call result
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Result envelope for a tool call
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    /// Successful result carrying a text payload
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: text.into(),
            }],
            is_error: None,
        }
    }

    /// Failed result carrying an error message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

/// Stdio JSON-RPC server.
pub struct RpcServer {
    state: SharedState,
}

impl RpcServer {
    /// Create a server over the shared state
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve requests from stdin until EOF.
    pub async fn run(&self) -> AppResult<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        info!(protocol = PROTOCOL_VERSION, "Server listening on stdio");

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => {
                    let is_notification = request.id.is_none();
                    let response = self.handle_request(request).await;
                    if is_notification {
                        None
                    } else {
                        response
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut serialized =
                    serde_json::to_string(&response).map_err(CommandError::Json)?;
                serialized.push('\n');
                if stdout.write_all(serialized.as_bytes()).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
        }

        info!("Stdin closed, shutting down");
        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone().unwrap_or(Value::Null);
        debug!(method = %request.method, "Handling request");

        match request.method.as_str() {
            "initialize" => Some(JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )),
            "notifications/initialized" => None,
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            "tools/list" => Some(JsonRpcResponse::success(
                id,
                json!({ "tools": tool_definitions() }),
            )),
            "tools/call" => {
                let params = match request.params {
                    Some(p) => p,
                    None => {
                        return Some(JsonRpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            "tools/call requires params",
                        ));
                    }
                };
                let name = match params.get("name").and_then(Value::as_str) {
                    Some(n) => n.to_string(),
                    None => {
                        return Some(JsonRpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            "tools/call requires a tool name",
                        ));
                    }
                };
                let arguments = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                match handle_tool_call(&self.state, &name, arguments).await {
                    Ok(result) => match serde_json::to_value(&result) {
                        Ok(value) => Some(JsonRpcResponse::success(id, value)),
                        Err(e) => Some(JsonRpcResponse::error(
                            id,
                            INTERNAL_ERROR,
                            format!("Failed to serialize result: {}", e),
                        )),
                    },
                    Err(CommandError::UnknownCommand { command }) => Some(
                        JsonRpcResponse::error(
                            id,
                            METHOD_NOT_FOUND,
                            format!("Unknown tool: {}", command),
                        ),
                    ),
                    Err(CommandError::InvalidParameters { command, message }) => Some(
                        JsonRpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            format!("Invalid parameters for {}: {}", command, message),
                        ),
                    ),
                    Err(e) => Some(JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string())),
                }
            }
            other => Some(JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }
}

/// Definitions of every exposed tool, with input schemas.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "metathink_start",
            "description": "Start a multi-phase thinking chain on a topic and execute its first step",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Topic to reason about" },
                    "chain": { "type": "string", "description": "Chain preset key (general, problem_solving, creative, decision)" },
                    "context": { "type": "string", "description": "Extra context for the first step" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "metathink_step",
            "description": "Execute one more step on an existing chain, advancing its phase when ready",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain_id": { "type": "string", "description": "Chain to advance" },
                    "input": { "type": "string", "description": "Extra input for this step" }
                },
                "required": ["chain_id"]
            }
        }),
        json!({
            "name": "metathink_think",
            "description": "One-shot reasoning pass addressing every phase of a chain preset in a single response",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Topic to reason about" },
                    "chain": { "type": "string", "description": "Chain preset key" },
                    "depth": { "type": "string", "enum": ["quick", "normal", "deep"], "description": "Response depth" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "metathink_vcp",
            "description": "Run a sequential multi-cluster deliberation (each reasoning stance sees the stances before it)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Topic to deliberate on" },
                    "chain": { "type": "string", "description": "Cluster preset key (quick, standard, deep, creative)" },
                    "context": { "type": "string", "description": "Extra context for every cluster" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "metathink_reflect",
            "description": "Meta-review the step transcript of a chain (defaults to the most recent chain)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain_id": { "type": "string", "description": "Chain to review" },
                    "aspect": { "type": "string", "description": "Aspect to focus the review on" }
                }
            }
        }),
        json!({
            "name": "metathink_list",
            "description": "List all live thinking chains",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "metathink_status",
            "description": "Status of one chain, or an overview of all chains",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "chain_id": { "type": "string", "description": "Chain to inspect (omit for an overview)" }
                }
            }
        }),
        json!({
            "name": "metathink_auto_route",
            "description": "Route a topic by keyword scoring and execute the selected reasoning strategy",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Topic to route" },
                    "context": { "type": "string", "description": "Extra context (cluster path only)" },
                    "prefer_vcp": { "type": "boolean", "description": "Run the cluster route (default true) or the chain route" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "magi_convene",
            "description": "Convene a multi-persona deliberation session and collect opening statements",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Proposal or question to deliberate" },
                    "template": { "type": "string", "description": "Template id (magi, philosophers, executives, or custom)" },
                    "theme": { "type": "string", "description": "Theme keyword resolved to a builtin template" },
                    "context": { "type": "string", "description": "Background shared with every opening statement" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "magi_discuss",
            "description": "Run one discussion round: every persona speaks once, seeing the recent transcript",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "session_id": { "type": "string", "description": "Session to advance" },
                    "focus": { "type": "string", "description": "Focus steering this round" }
                },
                "required": ["session_id"]
            }
        }),
        json!({
            "name": "magi_vote",
            "description": "Call the vote, tally a strict majority and freeze the session's conclusion",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "session_id": { "type": "string", "description": "Session to conclude" },
                    "proposal": { "type": "string", "description": "Proposal voted on (defaults to the session topic)" }
                },
                "required": ["session_id"]
            }
        }),
        json!({
            "name": "magi_quick_decision",
            "description": "Simulate a full deliberation and vote in a single model call, without creating a session",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": { "type": "string", "description": "Proposal to decide on" },
                    "template": { "type": "string", "description": "Template id" },
                    "theme": { "type": "string", "description": "Theme keyword" },
                    "depth": { "type": "string", "enum": ["quick", "normal", "deep"], "description": "Response depth" }
                },
                "required": ["topic"]
            }
        }),
        json!({
            "name": "magi_summary",
            "description": "Render a session transcript and conclusion as text, markdown or json",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "session_id": { "type": "string", "description": "Session to render" },
                    "format": { "type": "string", "enum": ["text", "markdown", "json"], "description": "Output format (default text)" }
                },
                "required": ["session_id"]
            }
        }),
        json!({
            "name": "magi_list_templates",
            "description": "List all persona templates (builtin and custom)",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "magi_register_template",
            "description": "Register a custom persona template (builtin ids cannot be overridden)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Template id" },
                    "name": { "type": "string", "description": "Display name" },
                    "description": { "type": "string", "description": "What the roster is for" },
                    "agents": {
                        "type": "array",
                        "description": "Personas in speaking order",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "name": { "type": "string" },
                                "perspective": { "type": "string" },
                                "personality": { "type": "string" }
                            },
                            "required": ["id", "name", "perspective", "personality"]
                        }
                    }
                },
                "required": ["id", "name", "agents"]
            }
        }),
    ]
}
