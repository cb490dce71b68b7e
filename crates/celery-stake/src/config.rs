//! Deployment configuration for a stake engine instance.
//!
//! Provides [`EngineConfig`] with defaults matching the reference deployment.
//! The interest horizon is derived from the initial supply so that compounded
//! values always fit the 256-bit amount width.

use serde::{Deserialize, Serialize};

use celery_accrual::interest_horizon_secs;
use celery_core::constants::{DEFAULT_DEPLOYER, DEFAULT_INITIAL_SUPPLY};
use celery_core::types::{AccountId, Amount, Timestamp};

/// Configuration fixed at deployment.
#[derive(
    Serialize, Deserialize, Debug, Clone, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct EngineConfig {
    /// Deployment time. Lower bound for every account's last processed time.
    pub deployed_at: Timestamp,
    /// Tokens minted to `deployer` at deployment.
    #[bincode(with_serde)]
    pub initial_supply: Amount,
    /// Seconds after `deployed_at` during which staked balances compound.
    pub interest_horizon_secs: u64,
    /// Ledger account holding staked principal.
    pub custody: AccountId,
    /// Ledger account credited with the initial supply.
    pub deployer: AccountId,
}

impl EngineConfig {
    /// Configuration for a deployment at `deployed_at` with `initial_supply`,
    /// using the largest interest horizon that supply allows.
    pub fn for_deployment(deployed_at: Timestamp, initial_supply: Amount) -> Self {
        Self {
            deployed_at,
            initial_supply,
            interest_horizon_secs: interest_horizon_secs(initial_supply),
            custody: AccountId::custody(),
            deployer: AccountId::new(DEFAULT_DEPLOYER),
        }
    }

    /// Time after which staked balances stop growing.
    pub fn end_interest_time(&self) -> Timestamp {
        self.deployed_at.saturating_add_secs(self.interest_horizon_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_deployment(Timestamp::ZERO, Amount::from(DEFAULT_INITIAL_SUPPLY))
    }
}
