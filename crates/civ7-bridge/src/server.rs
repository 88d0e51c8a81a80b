//! MCP-style request handling over a line transport.
//!
//! [`serve`] reads one JSON-RPC message per line and writes one response per
//! line. Requests are handled on their own tasks so a long `execute_js`
//! does not hold up `ping` or `resources/read`; the session still admits one
//! command at a time, so a second concurrent `execute_js` reports busy.

use std::sync::Arc;

use civ7_client::{ConnectionState, Session, SessionError};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
    task::JoinSet,
};

use crate::protocol::{
    ERROR_INVALID_REQUEST, ERROR_PARSE, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse,
};

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "Civ7 Debug Console";

/// The one tool.
pub const EXECUTE_JS: &str = "execute_js";

/// The one resource.
pub const STATUS_URI: &str = "civ7://status";

/// Responses queued for the writer.
const OUTGOING_CAPACITY: usize = 64;

const EXECUTE_JS_DESCRIPTION: &str = "Execute JavaScript code on the Civ7 debug console and \
return the result.\n\nUse this to interact with Civilization 7's game engine through its debug \
port. Send any valid JavaScript expression or multi-line script. The last expression's value is \
returned as the response.\n\nExamples:\n    - \"1+1\" returns \"2\"\n    - \
\"GameplayMap.getGridWidth()\" returns the map width\n    - \"Players.getAliveMajorIds()\" \
returns alive player IDs";

/// Text returned when the game is not reachable.
pub const NOT_CONNECTED: &str =
    "ERROR: Not connected to Civ7 debug port. Is the game running with FireTuner enabled?";

/// Text returned when a command got no result.
pub const NO_RESULT: &str = "ERROR: Command timed out or connection lost.";

/// Transport failure while serving.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reading requests or writing responses failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request handler bound to one debug port session.
#[derive(Debug, Clone)]
pub struct Bridge {
    session: Session,
}

impl Bridge {
    /// Serve requests against `session`.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Handle one request. `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::error(Some(id), ERROR_INVALID_REQUEST, "jsonrpc version must be 2.0")
            });
        }

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification");
            return None;
        }

        let id = request.id;
        let params = request.params.unwrap_or_else(|| json!({}));

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::result(id, initialize_result()),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => JsonRpcResponse::result(id, tools_list()),
            "tools/call" => match self.tools_call(&params).await {
                Ok(value) => JsonRpcResponse::result(id, value),
                Err(message) => JsonRpcResponse::invalid_params(id, message),
            },
            "resources/list" => JsonRpcResponse::result(id, resources_list()),
            "resources/read" => match self.resources_read(&params) {
                Ok(value) => JsonRpcResponse::result(id, value),
                Err(message) => JsonRpcResponse::invalid_params(id, message),
            },
            method => JsonRpcResponse::method_not_found(id, method),
        };

        Some(response)
    }

    async fn tools_call(&self, params: &Value) -> Result<Value, String> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "tool name missing".to_string())?;

        if name != EXECUTE_JS {
            return Err(format!("unknown tool '{name}'"));
        }

        let code = params
            .get("arguments")
            .and_then(|arguments| arguments.get("code"))
            .and_then(Value::as_str)
            .ok_or_else(|| "argument 'code' missing".to_string())?;

        let text = self.execute(code).await;
        let is_error = text.starts_with("ERROR:");
        Ok(json!({
            "content": [{"type": "text", "text": text}],
            "isError": is_error,
        }))
    }

    /// Run a script and render the outcome as tool text.
    pub async fn execute(&self, code: &str) -> String {
        tracing::debug!(len = code.len(), "execute_js");
        match self.session.send(code).await {
            Ok(result) => result,
            Err(error) => {
                tracing::info!(%error, "execute_js failed");
                error_text(&error)
            },
        }
    }

    fn resources_read(&self, params: &Value) -> Result<Value, String> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| "resource uri missing".to_string())?;

        if uri != STATUS_URI {
            return Err(format!("unknown resource '{uri}'"));
        }

        Ok(json!({
            "contents": [{"uri": STATUS_URI, "mimeType": "text/plain", "text": self.status_text()}]
        }))
    }

    /// Human-readable connection status.
    pub fn status_text(&self) -> String {
        let endpoint = self.session.endpoint();
        let status = self.session.snapshot();

        match status.connection_state {
            ConnectionState::Connected => format!("Connected to Civ7 at {endpoint}"),
            ConnectionState::Connecting if status.last_error.is_none() => {
                format!("Connecting to Civ7 at {endpoint}...")
            },
            _ => {
                let reason =
                    status.last_error.map_or_else(String::new, |error| format!(" Last error: {error}."));
                format!("Disconnected from Civ7 ({endpoint}). Waiting to reconnect...{reason}")
            },
        }
    }
}

/// Tool text for a failed command.
pub fn error_text(error: &SessionError) -> String {
    match error {
        SessionError::Offline => NOT_CONNECTED.to_string(),
        SessionError::Timeout { .. } | SessionError::ConnectionLost(_) => NO_RESULT.to_string(),
        SessionError::Busy => "ERROR: Another command is still running.".to_string(),
        SessionError::EmptyCommand => "ERROR: No code to execute.".to_string(),
        SessionError::Cancelled => "ERROR: Command was cancelled.".to_string(),
        SessionError::Closed => "ERROR: Bridge is shutting down.".to_string(),
        SessionError::Protocol(e) => format!("ERROR: {e}"),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {},
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn tools_list() -> Value {
    json!({
        "tools": [{
            "name": EXECUTE_JS,
            "description": EXECUTE_JS_DESCRIPTION,
            "inputSchema": {
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "JavaScript to run in the game"},
                },
                "required": ["code"],
            },
        }]
    })
}

fn resources_list() -> Value {
    json!({
        "resources": [{
            "uri": STATUS_URI,
            "name": "status",
            "description": "Get current connection status to the Civ7 debug port.",
            "mimeType": "text/plain",
        }]
    })
}

/// Serve line-delimited JSON-RPC until `reader` hits EOF.
///
/// In-flight requests are allowed to finish before returning.
pub async fn serve<R, W>(reader: R, writer: W, bridge: Bridge) -> Result<(), BridgeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTGOING_CAPACITY);
    let writer_task = tokio::spawn(write_loop(writer, rx));

    let bridge = Arc::new(bridge);
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        // Reap finished handlers.
        while in_flight.try_join_next().is_some() {}

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match parse(trimmed) {
            Ok(request) => request,
            Err(response) => {
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            },
        };

        let bridge = Arc::clone(&bridge);
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = bridge.handle_request(request).await {
                let _ = tx.send(response).await;
            }
        });
    }

    tracing::info!("input closed, finishing in-flight requests");
    while in_flight.join_next().await.is_some() {}
    drop(tx);

    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(BridgeError::Io(std::io::Error::other(e))),
    }
}

fn parse(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        tracing::warn!(error = %e, "failed to parse JSON payload");
        JsonRpcResponse::error(None, ERROR_PARSE, "invalid json")
    })?;

    let id = value.get("id").cloned();
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(error = %e, "invalid JSON-RPC request");
        JsonRpcResponse::error(id, ERROR_INVALID_REQUEST, "invalid request")
    })
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut text = serde_json::to_string(&response)?;
        text.push('\n');
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
