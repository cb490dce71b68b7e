//! Per-account records and lazy settlement.
//!
//! Nothing accrues in the background. Each record stores the balance as of
//! its `last_processed_time`; [`settle`] brings it forward to a later instant
//! and is called at the start of every mutating operation and by the
//! estimation views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use celery_accrual::{grow, vested_amount};
use celery_core::error::StakeError;
use celery_core::types::{Account, AccountId, AccountStatus, Amount, Timestamp};

/// Result of bringing an account forward to a later instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// The record as of the settlement time. Status is unchanged.
    pub account: Account,
    /// Seconds that counted toward growth or vesting.
    pub elapsed_secs: u64,
    /// Growth added to a staking balance. Zero in payout.
    pub grown: Amount,
    /// Penalty-free amount available to a payout account. Zero while staking.
    pub vested: Amount,
}

/// Settle `account` up to `now`.
///
/// Staking balances compound only inside the interest window ending at
/// `end_interest_time`. Payout balances keep their amount; the vested part
/// is reported for the caller to release. `last_processed_time` never moves
/// backwards.
pub fn settle(
    account: &Account,
    now: Timestamp,
    end_interest_time: Timestamp,
) -> Result<Settlement, StakeError> {
    let mut settled = account.clone();
    settled.last_processed_time = account.last_processed_time.max(now);

    let settlement = match account.status {
        AccountStatus::Staking => {
            let from = account.last_processed_time.min(end_interest_time);
            let to = now.min(end_interest_time);
            let elapsed_secs = to.secs_since(from);
            settled.staked_amount = grow(account.staked_amount, elapsed_secs)?;
            Settlement {
                grown: settled.staked_amount - account.staked_amount,
                account: settled,
                elapsed_secs,
                vested: Amount::zero(),
            }
        }
        AccountStatus::Payout => {
            let elapsed_secs = now.secs_since(account.last_processed_time);
            let vested = vested_amount(
                account.last_staking_balance,
                account.staked_amount,
                elapsed_secs,
            );
            Settlement {
                account: settled,
                elapsed_secs,
                grown: Amount::zero(),
                vested,
            }
        }
    };

    debug!(
        status = %account.status,
        elapsed = settlement.elapsed_secs,
        grown = %settlement.grown,
        vested = %settlement.vested,
        "account settled"
    );
    Ok(settlement)
}

/// All account records, keyed by holder.
#[derive(
    Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountBook {
    records: BTreeMap<AccountId, Account>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record, or [`Account::UNTOUCHED`] for an unknown holder.
    pub fn get(&self, id: &AccountId) -> Account {
        self.records.get(id).cloned().unwrap_or(Account::UNTOUCHED)
    }

    /// The stored record, or a fresh one anchored at `now`.
    pub fn open(&self, id: &AccountId, now: Timestamp) -> Account {
        self.records
            .get(id)
            .cloned()
            .unwrap_or_else(|| Account::opened_at(now))
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.records.contains_key(id)
    }

    pub fn insert(&mut self, id: AccountId, account: Account) {
        self.records.insert(id, account);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Account)> {
        self.records.iter()
    }
}
