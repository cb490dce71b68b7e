//! # celery-stake
//! Stake/payout engine for Celery.
//!
//! Accounts settle lazily: nothing accrues until an operation or a view
//! touches them. Pool totals move by exact deltas, and every operation
//! applies its token movements as one atomic ledger batch.

pub mod account;
pub mod config;
pub mod engine;
pub mod snapshot;
pub mod supply;

pub use account::{settle, AccountBook, Settlement};
pub use config::EngineConfig;
pub use engine::StakeEngine;
pub use snapshot::{EngineSnapshot, SNAPSHOT_VERSION};
pub use supply::SupplyTotals;
