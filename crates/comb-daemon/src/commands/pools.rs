//! Pool management command handlers.

use std::sync::Arc;

use comb_types::pool::{DistributionStrategy, PoolConfig};
use serde_json::Value;

use super::{auth_param, ledger, parse_param, pool_id_param, u64_param, Result};
use crate::events::LedgerEvent;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Create a pool owned by the caller.
///
/// Params: `caller`, `config`, optional `initial_funding`.
pub async fn create_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let config: PoolConfig = parse_param(params, "config")?;
    let initial_funding = match params.get("initial_funding") {
        None | Some(Value::Null) => 0,
        Some(_) => u64_param(params, "initial_funding")?,
    };

    let pool_id = ledger(state, move |s| {
        s.engine.create_pool(&auth, config, initial_funding)
    })
    .await?;
    state.emit(
        LedgerEvent::PoolCreated,
        serde_json::json!({
            "pool_id": pool_id,
            "owner": auth.caller,
            "initial_funding": initial_funding,
        }),
    );

    Ok(serde_json::json!({ "pool_id": pool_id }))
}

/// Deposit into a pool's vault.
pub async fn fund_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;
    let amount = u64_param(params, "amount")?;

    let total_funds = ledger(state, move |s| s.engine.fund_pool(&auth, pool_id, amount)).await?;
    state.emit(
        LedgerEvent::PoolFunded,
        serde_json::json!({
            "pool_id": pool_id,
            "funder": auth.caller,
            "amount": amount,
            "total_funds": total_funds,
        }),
    );

    Ok(serde_json::json!({ "total_funds": total_funds }))
}

pub async fn update_distribution_strategy(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;
    let strategy: DistributionStrategy = parse_param(params, "strategy")?;
    let name = strategy.name();

    ledger(state, move |s| {
        s.engine
            .update_distribution_strategy(&auth, pool_id, strategy)
    })
    .await?;
    state.emit(
        LedgerEvent::StrategyUpdated,
        serde_json::json!({ "pool_id": pool_id, "strategy": name }),
    );

    Ok(serde_json::json!({ "strategy": name }))
}

/// Close an ended pool; the residual goes back to the owner.
pub async fn close_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;

    let reclaimed = ledger(state, move |s| s.engine.close_pool(&auth, pool_id)).await?;
    state.emit(
        LedgerEvent::PoolClosed,
        serde_json::json!({ "pool_id": pool_id, "reclaimed": reclaimed }),
    );

    Ok(serde_json::json!({ "reclaimed": reclaimed }))
}

/// Pool record with its current status and vault balance.
pub async fn get_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pool_id = pool_id_param(params)?;
    let (pool, status, vault_balance) = ledger(state, move |s| {
        let pool = s.engine.get_pool(pool_id)?;
        let status = pool.status(s.engine.now());
        Ok((pool, status, s.engine.vault_balance(pool_id)?))
    })
    .await?;

    let mut value = serde_json::to_value(&pool)
        .map_err(|e| RpcError::internal_error(&format!("serialize pool: {e}")))?;
    value["status"] = serde_json::json!(status);
    value["vault_balance"] = vault_balance.into();
    Ok(value)
}

pub async fn get_pool_movements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pool_id = pool_id_param(params)?;
    let movements = ledger(state, move |s| s.engine.pool_movements(pool_id)).await?;
    serde_json::to_value(movements)
        .map_err(|e| RpcError::internal_error(&format!("serialize movements: {e}")))
}
