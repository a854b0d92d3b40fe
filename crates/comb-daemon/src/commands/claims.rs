//! Eligibility, claim and achievement command handlers.

use std::sync::Arc;

use comb_rewards::distribution;
use comb_types::achievement::AchievementBatch;
use comb_types::performance::PerformanceRecord;
use serde_json::Value;

use super::{auth_param, beacon_param, ledger, parse_param, pool_id_param, principal_param, Result};
use crate::events::LedgerEvent;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Submit a performance record for `user`.
///
/// When a hex `beacon` is supplied, the RandomDrop seed is derived from it
/// instead of taken from the record.
pub async fn calculate_user_rewards(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;
    let user = principal_param(params, "user")?;
    let mut performance: PerformanceRecord = parse_param(params, "performance")?;

    if params.get("beacon").is_some_and(|v| !v.is_null()) {
        let beacon = beacon_param(params, "beacon")?;
        performance.random_seed = distribution::drop_seed(&beacon, pool_id, &user);
    }

    let eligible = ledger(state, move |s| {
        s.engine
            .calculate_user_rewards(&auth, pool_id, user, &performance)
    })
    .await?;
    state.emit(
        LedgerEvent::RewardsCalculated,
        serde_json::json!({ "pool_id": pool_id, "user": user, "eligible": eligible }),
    );

    Ok(serde_json::json!({ "eligible": eligible }))
}

pub async fn get_claimable_amount(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pool_id = pool_id_param(params)?;
    let user = principal_param(params, "user")?;
    let claimable = ledger(state, move |s| s.engine.get_claimable_amount(pool_id, user)).await?;
    Ok(serde_json::json!({ "claimable": claimable }))
}

/// Claim everything owed. `user` defaults to the caller.
pub async fn claim_rewards(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;
    let user = match params.get("user") {
        None | Some(Value::Null) => auth.caller,
        Some(_) => principal_param(params, "user")?,
    };

    let claimed = ledger(state, move |s| s.engine.claim_rewards(&auth, pool_id, user)).await?;
    state.emit(
        LedgerEvent::RewardsClaimed,
        serde_json::json!({ "pool_id": pool_id, "user": user, "amount": claimed }),
    );

    Ok(serde_json::json!({ "claimed": claimed }))
}

/// The claim record, or `null` if none exists.
pub async fn get_claim(state: &Arc<DaemonState>, params: &Value) -> Result {
    let pool_id = pool_id_param(params)?;
    let user = principal_param(params, "user")?;
    let claim = ledger(state, move |s| s.engine.get_claim(pool_id, user)).await?;
    serde_json::to_value(claim).map_err(|e| RpcError::internal_error(&format!("serialize claim: {e}")))
}

pub async fn verify_achievements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let auth = auth_param(params)?;
    let pool_id = pool_id_param(params)?;
    let batch: AchievementBatch = parse_param(params, "batch")?;

    let unlocked_count = batch.unlocked_count();
    let verified = ledger(state, move |s| s.engine.verify_achievements(&auth, pool_id, &batch)).await?;
    Ok(serde_json::json!({
        "verified": verified,
        "unlocked_count": unlocked_count,
    }))
}
