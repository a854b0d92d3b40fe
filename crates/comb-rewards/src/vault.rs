//! Per-pool custodial balance.
//!
//! A vault only ever belongs to one pool. Deposits are open to the registry;
//! withdrawals are crate-private and reachable only from the claim payout
//! path and the owner close-out path.

use comb_types::pool::{MovementKind, VaultKey};
use comb_types::PoolId;

use crate::{Result, RewardError};

/// Why funds leave a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Withdrawal {
    /// Claim ledger payout to a participant.
    Payout,
    /// Residual balance returned to the owner on close.
    CloseOut,
}

impl Withdrawal {
    pub(crate) fn kind(self) -> MovementKind {
        match self {
            Self::Payout => MovementKind::Payout,
            Self::CloseOut => MovementKind::CloseOut,
        }
    }
}

/// Custodial balance backing a single pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    key: VaultKey,
    balance: u64,
}

impl Vault {
    /// A fresh, empty vault for `pool_id`.
    pub fn open(pool_id: PoolId) -> Self {
        Self {
            key: VaultKey::new(pool_id),
            balance: 0,
        }
    }

    /// Rebuild a vault from persisted state.
    pub fn restore(pool_id: PoolId, balance: u64) -> Self {
        Self {
            key: VaultKey::new(pool_id),
            balance,
        }
    }

    pub fn key(&self) -> VaultKey {
        self.key
    }

    pub fn pool_id(&self) -> PoolId {
        self.key.pool_id
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub(crate) fn deposit(&mut self, amount: u64) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(RewardError::Overflow)?;
        Ok(())
    }

    pub(crate) fn withdraw(&mut self, amount: u64, reason: Withdrawal) -> Result<()> {
        if amount > self.balance {
            tracing::warn!(
                vault = %self.key.storage_key(),
                amount,
                balance = self.balance,
                ?reason,
                "vault withdrawal exceeds balance"
            );
            return Err(RewardError::InsufficientPoolFunds {
                available: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_empty() {
        let v = Vault::open(9);
        assert_eq!(v.balance(), 0);
        assert_eq!(v.pool_id(), 9);
        assert_eq!(v.key().storage_key(), "reward_vault/9");
    }

    #[test]
    fn test_deposit_then_withdraw() {
        let mut v = Vault::open(1);
        v.deposit(1_000).expect("deposit");
        v.deposit(500).expect("deposit");
        v.withdraw(1_200, Withdrawal::Payout).expect("withdraw");
        assert_eq!(v.balance(), 300);
    }

    #[test]
    fn test_overdraw_rejected_and_balance_kept() {
        let mut v = Vault::restore(1, 100);
        let err = v.withdraw(101, Withdrawal::CloseOut).expect_err("overdraw");
        assert_eq!(
            err,
            RewardError::InsufficientPoolFunds {
                available: 100,
                required: 101
            }
        );
        assert_eq!(v.balance(), 100);
    }

    #[test]
    fn test_deposit_overflow() {
        let mut v = Vault::restore(1, u64::MAX);
        assert_eq!(v.deposit(1), Err(RewardError::Overflow));
        assert_eq!(v.balance(), u64::MAX);
    }

    #[test]
    fn test_withdrawal_kinds() {
        assert_eq!(Withdrawal::Payout.kind(), MovementKind::Payout);
        assert_eq!(Withdrawal::CloseOut.kind(), MovementKind::CloseOut);
    }
}
