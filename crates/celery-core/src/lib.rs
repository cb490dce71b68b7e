//! # celery-core
//! Foundation types and traits for the Celery staking engine.

pub mod constants;
pub mod error;
pub mod event;
pub mod ledger;
pub mod traits;
pub mod types;
