//! Growth and vesting schedules.
//!
//! Staked balances follow `principal · 2^(t / year)`, rounded up. Payout
//! balances vest linearly over one year, rounded down.

use celery_core::constants::{
    AMOUNT_BITS, MAX_INTEREST_HORIZON_YEARS, SECONDS_PER_YEAR, SUPPLY_HEADROOM_BITS,
    VESTING_PRECISION,
};
use celery_core::error::StakeError;
use celery_core::types::Amount;

use crate::fixed::{exp2_fraction, mul_div, mul_fixed, Rounding};

/// Compounded value of `principal` after `elapsed_secs` of staking.
///
/// `ceil(principal · 2^(elapsed / year))`. Whole years are applied as an exact
/// left shift, so a stake held for exactly `n` years is worth exactly
/// `principal << n`. The fractional year multiplies by an upper bound of
/// `2^x` that is tight to `2^-186`, so the result is the exact ceiling for
/// any principal below `2^128` and never below it for larger ones.
/// Callers clamp `elapsed_secs` to the interest horizon.
///
/// # Errors
///
/// [`StakeError::ArithmeticOverflow`] if the grown value does not fit an
/// [`Amount`].
pub fn grow(principal: Amount, elapsed_secs: u64) -> Result<Amount, StakeError> {
    if principal.is_zero() || elapsed_secs == 0 {
        return Ok(principal);
    }

    let years = elapsed_secs / SECONDS_PER_YEAR;
    let rem = elapsed_secs % SECONDS_PER_YEAR;

    let whole = shl_checked(principal, years)?;
    if rem == 0 {
        return Ok(whole);
    }

    mul_fixed(whole, exp2_fraction(rem), Rounding::Up).ok_or(StakeError::ArithmeticOverflow)
}

/// `value << bits`, failing instead of dropping high bits.
fn shl_checked(value: Amount, bits: u64) -> Result<Amount, StakeError> {
    if bits == 0 {
        return Ok(value);
    }
    if bits >= u64::from(AMOUNT_BITS) || u64::from(value.leading_zeros()) < bits {
        return Err(StakeError::ArithmeticOverflow);
    }
    Ok(value << (bits as u32))
}

/// Fraction of a payout balance matured after `elapsed_secs`, scaled by
/// [`VESTING_PRECISION`]. `min(elapsed / year, 1)`.
pub fn vested_fraction(elapsed_secs: u64) -> u128 {
    let capped = elapsed_secs.min(SECONDS_PER_YEAR) as u128;
    capped * VESTING_PRECISION / SECONDS_PER_YEAR as u128
}

/// Amount of a payout balance that may leave without penalty.
///
/// `min(remaining, floor(last_staking_balance · min(elapsed, year) / year))`.
/// Measuring against the balance frozen at start-payout keeps vesting
/// additive: ten collections a tenth of a year apart release the same total
/// as one collection after a full year.
pub fn vested_amount(last_staking_balance: Amount, remaining: Amount, elapsed_secs: u64) -> Amount {
    let capped = elapsed_secs.min(SECONDS_PER_YEAR);
    // capped ≤ year, so the result never exceeds last_staking_balance.
    let vested = mul_div(
        last_staking_balance,
        Amount::from(capped),
        Amount::from(SECONDS_PER_YEAR),
        Rounding::Down,
    )
    .unwrap_or(last_staking_balance);
    vested.min(remaining)
}

/// Number of years a balance may compound before interest stops.
///
/// The largest value the system can reach is `initial_supply · 2^years`; it
/// must leave [`SUPPLY_HEADROOM_BITS`] free in an [`Amount`]. Capped at
/// [`MAX_INTEREST_HORIZON_YEARS`], which every supply of up to 69 bits
/// reaches.
pub fn interest_horizon_years(initial_supply: Amount) -> u64 {
    let supply_bits = initial_supply.bits() as u32;
    let room = AMOUNT_BITS
        .saturating_sub(SUPPLY_HEADROOM_BITS)
        .saturating_sub(supply_bits);
    u64::from(room).min(MAX_INTEREST_HORIZON_YEARS)
}

/// [`interest_horizon_years`] in seconds.
pub fn interest_horizon_secs(initial_supply: Amount) -> u64 {
    interest_horizon_years(initial_supply) * SECONDS_PER_YEAR
}
