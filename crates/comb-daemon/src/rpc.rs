//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use comb_rewards::{ErrorClass, RewardError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    /// Stable SCREAMING_SNAKE error name.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Error codes. The standard JSON-RPC range plus one code per
/// [`ErrorClass`]; storage failures surface as `INTERNAL`.
pub mod codes {
    pub const PARSE: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;

    pub const VALIDATION: i32 = -32020;
    pub const AUTHORIZATION: i32 = -32021;
    pub const LIFECYCLE: i32 = -32022;
    pub const LEDGER: i32 = -32023;
    pub const ARITHMETIC: i32 = -32024;
}

impl RpcError {
    fn standard(code: i32, name: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: name.to_string(),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::standard(codes::PARSE, "PARSE_ERROR", None)
    }

    pub fn invalid_request() -> Self {
        Self::standard(codes::INVALID_REQUEST, "INVALID_REQUEST", None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::standard(
            codes::METHOD_NOT_FOUND,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({ "method": method })),
        )
    }

    pub fn invalid_params(detail: &str) -> Self {
        Self::standard(
            codes::INVALID_PARAMS,
            "INVALID_PARAMS",
            Some(serde_json::json!({ "detail": detail })),
        )
    }

    pub fn internal_error(detail: &str) -> Self {
        Self::standard(
            codes::INTERNAL,
            "INTERNAL_ERROR",
            Some(serde_json::json!({ "detail": detail })),
        )
    }
}

impl From<RewardError> for RpcError {
    fn from(err: RewardError) -> Self {
        let code = match err.class() {
            ErrorClass::Validation => codes::VALIDATION,
            ErrorClass::Authorization => codes::AUTHORIZATION,
            ErrorClass::Lifecycle => codes::LIFECYCLE,
            ErrorClass::Ledger => codes::LEDGER,
            ErrorClass::Arithmetic => codes::ARITHMETIC,
            ErrorClass::Storage => return Self::internal_error(&err.to_string()),
        };

        let mut data = serde_json::json!({"detail": err.to_string()});
        match &err {
            RewardError::InsufficientPoolFunds {
                available,
                required,
            } => {
                data["available"] = (*available).into();
                data["required"] = (*required).into();
            }
            RewardError::PoolNotFound { pool_id } | RewardError::PoolAlreadyExists { pool_id } => {
                data["pool_id"] = (*pool_id).into();
            }
            _ => {}
        }

        Self {
            code,
            message: err.name().to_string(),
            data: Some(data),
        }
    }
}

/// Accepts connections on the daemon socket; one task per connection.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Bind the socket and serve until the future is dropped.
    pub async fn run(&self) -> anyhow::Result<()> {
        if self.socket_path.exists() {
            debug!(path = ?self.socket_path, "removing stale socket");
            std::fs::remove_file(&self.socket_path)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = ?self.socket_path, "ledger RPC listening");

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    continue;
                }
            };
            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(state, stream).await {
                    warn!(error = %e, "RPC connection closed with error");
                }
            });
        }
    }
}

/// Serve newline-delimited requests on one connection until EOF.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(e) => {
                debug!(error = %e, "unparseable request");
                RpcResponse::error(serde_json::Value::Null, RpcError::parse_error())
            }
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }

    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    let method = request.method.as_str();
    let params = &request.params;
    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Pool management
        "create_pool" => commands::pools::create_pool(&state, params).await,
        "fund_pool" => commands::pools::fund_pool(&state, params).await,
        "update_distribution_strategy" => {
            commands::pools::update_distribution_strategy(&state, params).await
        }
        "close_pool" => commands::pools::close_pool(&state, params).await,
        "get_pool" => commands::pools::get_pool(&state, params).await,
        "get_pool_movements" => commands::pools::get_pool_movements(&state, params).await,

        // Eligibility and claims
        "calculate_user_rewards" => {
            commands::claims::calculate_user_rewards(&state, params).await
        }
        "get_claimable_amount" => commands::claims::get_claimable_amount(&state, params).await,
        "claim_rewards" => commands::claims::claim_rewards(&state, params).await,
        "get_claim" => commands::claims::get_claim(&state, params).await,
        "verify_achievements" => commands::claims::verify_achievements(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => {
            debug!(method, code = err.code, error = %err.message, "RPC call failed");
            RpcResponse::error(id, err)
        }
    }
}
