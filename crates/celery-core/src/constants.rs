//! Protocol constants. All token amounts are in base units
//! ([`Amount`](crate::types::Amount)).

use primitive_types::U256;

/// Length of one interest / vesting year in seconds (365 days).
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Fractional bits of the binary fixed-point growth factor.
pub const FRACTION_BITS: u32 = 192;

/// `ln(2) · 2^192`, truncated.
pub const LN2_Q192: U256 = U256([
    0x40f3_4326_7298_b62d,
    0xc9e3_b398_03f2_f6af,
    0xb172_17f7_d1cf_79ab,
    0,
]);

/// Largest truncation error of the fractional-year growth factor, in units
/// of `2^-192`. Added back so that the factor is never below `2^x`.
pub const EXP2_ERROR_BOUND: u64 = 64;

/// Denominator of vesting fractions (18 decimal places).
pub const VESTING_PRECISION: u128 = 1_000_000_000_000_000_000;

pub const BPS_PRECISION: u64 = 10_000;

/// Share of the unvested part of a force-payout that is forfeited (50%).
pub const EARLY_PAYOUT_PENALTY_BPS: u64 = 5_000;

/// Width of [`Amount`](crate::types::Amount) in bits.
pub const AMOUNT_BITS: u32 = 256;

/// Upper bound on the interest horizon, in years.
///
/// A staked balance can at most double this many times between deployment
/// and `end_interest_time`. The effective horizon is lowered only for
/// supplies wider than 69 bits (see `celery_accrual::interest_horizon_years`).
pub const MAX_INTEREST_HORIZON_YEARS: u64 = 186;

/// Bits kept free above the largest compounded value so that pool sums
/// cannot overflow either.
pub const SUPPLY_HEADROOM_BITS: u32 = 1;

/// Initial supply used by the reference deployment.
pub const DEFAULT_INITIAL_SUPPLY: u128 = 500_000_000_000_000_000_000;

/// Ledger account under which the engine keeps staked principal.
pub const CUSTODY_ACCOUNT: &str = "celery:custody";

/// Ledger account credited with the initial supply by default.
pub const DEFAULT_DEPLOYER: &str = "deployer";
