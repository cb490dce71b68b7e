//! # celery-accrual
//! Stake growth, payout vesting and early-exit penalty math.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Growth**: a staked balance doubles every [`SECONDS_PER_YEAR`], continuously
//!   compounded. Whole years are an exact shift; the fractional year is
//!   `e^(x·ln2)` evaluated as a fixed-point Taylor series. Results round up.
//! - **Vesting**: a payout balance matures linearly over one year, measured
//!   against the balance frozen when payout started. Results round down.
//! - **Penalty**: the unvested part of a force-payout is cut by 50%, rounded
//!   up. The inverse solves for the gross amount behind a requested net payout.
//!
//! [`SECONDS_PER_YEAR`]: celery_core::constants::SECONDS_PER_YEAR

pub mod fixed;
pub mod penalty;
pub mod schedule;

pub use fixed::{exp2_fraction, mul_div, Rounding};
pub use penalty::{gross_for_net, penalty, quote_force_payout, ForcePayoutQuote};
pub use schedule::{
    grow, interest_horizon_secs, interest_horizon_years, vested_amount, vested_fraction,
};
