//! Engine-wide pool totals.
//!
//! [`SupplyTotals`] tracks the sum of settled balances per status. Every
//! account change is applied as a transition from the old record to the new
//! one, so the totals always equal the per-account sums as of each account's
//! last settlement.

use serde::{Deserialize, Serialize};

use celery_core::error::StakeError;
use celery_core::types::{Account, AccountStatus, Amount};

/// Sum of settled balances held in each pool.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct SupplyTotals {
    #[bincode(with_serde)]
    pub total_staking: Amount,
    #[bincode(with_serde)]
    pub total_payout: Amount,
}

impl SupplyTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals after `before` is replaced by `after`. `self` is left untouched
    /// so that callers can abandon the result if a later step fails.
    pub fn transition(&self, before: &Account, after: &Account) -> Result<Self, StakeError> {
        let mut next = *self;
        {
            let pool = next.pool_mut(before.status);
            *pool = pool
                .checked_sub(before.staked_amount)
                .ok_or(StakeError::ArithmeticOverflow)?;
        }
        let pool = next.pool_mut(after.status);
        *pool = pool
            .checked_add(after.staked_amount)
            .ok_or(StakeError::ArithmeticOverflow)?;
        Ok(next)
    }

    /// Both pools together.
    pub fn pooled(&self) -> Result<Amount, StakeError> {
        self.total_staking
            .checked_add(self.total_payout)
            .ok_or(StakeError::ArithmeticOverflow)
    }

    pub fn pool(&self, status: AccountStatus) -> Amount {
        match status {
            AccountStatus::Staking => self.total_staking,
            AccountStatus::Payout => self.total_payout,
        }
    }

    fn pool_mut(&mut self, status: AccountStatus) -> &mut Amount {
        match status {
            AccountStatus::Staking => &mut self.total_staking,
            AccountStatus::Payout => &mut self.total_payout,
        }
    }
}
