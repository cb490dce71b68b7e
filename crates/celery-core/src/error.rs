//! Error types for the Celery staking engine.
use thiserror::Error;

use crate::types::{AccountId, Amount, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("amount must be greater than zero")] AmountMustBePositive,
    #[error("account is already staking")] AlreadyStaking,
    #[error("account is already in payout")] AlreadyInPayout,
    #[error("account is staking")] AccountIsStaking,
    #[error("account is in payout")] AccountIsInPayout,
    #[error("nothing to payout")] NothingToPayout,
    #[error("account {0} is reserved for the engine")] ReservedAccount(AccountId),
    #[error("insufficient balance: requested {requested}, available {available}")] InsufficientBalance { requested: Amount, available: Amount },
    #[error("timestamp {at} precedes last processed time {last_processed}")] TimestampTooEarly { at: Timestamp, last_processed: Timestamp },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds in {account}: have {have}, need {need}")] InsufficientFunds { account: String, have: Amount, need: Amount },
    #[error("total supply overflow")] SupplyOverflow,
    #[error("balance overflow in {0}")] BalanceOverflow(String),
}

#[derive(Error, Debug)]
pub enum CeleryError {
    #[error(transparent)] Stake(#[from] StakeError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error("snapshot: {0}")] Snapshot(String),
}

impl CeleryError {
    /// The staking error behind this failure, if any.
    pub fn as_stake(&self) -> Option<&StakeError> {
        match self {
            Self::Stake(e) => Some(e),
            _ => None,
        }
    }
}
