//! RPC command handlers.
//!
//! Each submodule implements the commands for one area. Handlers parse
//! their params, call the engine, emit an event on success, and map
//! [`comb_rewards::RewardError`] into an [`RpcError`].

pub mod claims;
pub mod pools;

use std::sync::Arc;

use comb_rewards::AuthContext;
use comb_types::{PoolId, Principal};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Run an engine call on the blocking thread pool. A SQLite write can sit in
/// `busy_timeout` while another connection holds the lock.
async fn ledger<T, F>(state: &Arc<DaemonState>, op: F) -> std::result::Result<T, RpcError>
where
    F: FnOnce(&DaemonState) -> comb_rewards::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || op(&state))
        .await
        .map_err(|e| RpcError::internal_error(&format!("ledger task failed: {e}")))?
        .map_err(RpcError::from)
}

fn required<'a>(params: &'a Value, name: &str) -> std::result::Result<&'a Value, RpcError> {
    params
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

fn parse_param<T: DeserializeOwned>(params: &Value, name: &str) -> std::result::Result<T, RpcError> {
    serde_json::from_value(required(params, name)?.clone())
        .map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

fn u64_param(params: &Value, name: &str) -> std::result::Result<u64, RpcError> {
    required(params, name)?
        .as_u64()
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be an unsigned integer")))
}

fn pool_id_param(params: &Value) -> std::result::Result<PoolId, RpcError> {
    u64_param(params, "pool_id")
}

/// Hex-encoded 32-byte principal.
fn principal_param(params: &Value, name: &str) -> std::result::Result<Principal, RpcError> {
    required(params, name)?
        .as_str()
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be a hex string")))?
        .parse()
        .map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

/// 32-byte randomness beacon, hex encoded.
fn beacon_param(params: &Value, name: &str) -> std::result::Result<[u8; 32], RpcError> {
    let text = required(params, name)?
        .as_str()
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be a hex string")))?;
    let bytes =
        hex::decode(text).map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| RpcError::invalid_params(&format!("{name}: expected 32 bytes, got {len}")))
}

/// The authenticated caller, as forwarded by the identity layer.
fn auth_param(params: &Value) -> std::result::Result<AuthContext, RpcError> {
    principal_param(params, "caller").map(AuthContext::new)
}
