//! Early-exit penalty for force-payouts.
//!
//! Only the unvested part of a request is taxed:
//!
//! ```text
//! unvested = requested - min(requested, vested)
//! penalty  = ceil(unvested · 50%)
//! net      = requested - penalty
//! ```
//!
//! A caller may name either side of that equation ([`PayoutMode`]); the
//! gross amount behind a net request comes from the formula's inverse.

use serde::{Deserialize, Serialize};

use celery_core::constants::{BPS_PRECISION, EARLY_PAYOUT_PENALTY_BPS};
use celery_core::error::StakeError;
use celery_core::types::{Amount, PayoutMode};

use crate::fixed::{mul_div, Rounding};

/// Outcome of a force-payout, before any tokens move.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcePayoutQuote {
    /// Amount removed from the staked balance.
    pub gross: Amount,
    /// Amount delivered to the wallet.
    pub net: Amount,
    /// Amount forfeited. `gross == net + penalty`.
    pub penalty: Amount,
    /// Penalty-free amount available at quote time.
    pub vested: Amount,
}

/// Penalty charged on a gross request of `requested` when `vested` tokens
/// are already mature. Rounded up.
///
/// # Errors
///
/// [`StakeError::ArithmeticOverflow`] if the scaled penalty does not fit.
pub fn penalty(requested: Amount, vested: Amount) -> Result<Amount, StakeError> {
    let unvested = requested - requested.min(vested);
    mul_div(
        unvested,
        Amount::from(EARLY_PAYOUT_PENALTY_BPS),
        Amount::from(BPS_PRECISION),
        Rounding::Up,
    )
    .ok_or(StakeError::ArithmeticOverflow)
}

/// Smallest gross amount whose payout after penalty is `net`.
///
/// Up to `vested` the two are equal. Beyond it every unvested token only
/// delivers `1 - 50%` of itself, so the excess is scaled by
/// `BPS / (BPS - PENALTY_BPS)`.
pub fn gross_for_net(net: Amount, vested: Amount) -> Result<Amount, StakeError> {
    if net <= vested {
        return Ok(net);
    }
    let excess = net - vested;
    let scaled = mul_div(
        excess,
        Amount::from(BPS_PRECISION),
        Amount::from(BPS_PRECISION - EARLY_PAYOUT_PENALTY_BPS),
        Rounding::Up,
    )
    .ok_or(StakeError::ArithmeticOverflow)?;
    vested
        .checked_add(scaled)
        .ok_or(StakeError::ArithmeticOverflow)
}

/// Resolve a force-payout request against an account's settled `balance`
/// and its currently `vested` amount.
///
/// # Errors
///
/// - [`StakeError::AmountMustBePositive`] if `amount` is zero
/// - [`StakeError::InsufficientBalance`] if the gross amount exceeds `balance`
/// - [`StakeError::ArithmeticOverflow`] if the inverse overflows
pub fn quote_force_payout(
    amount: Amount,
    mode: PayoutMode,
    vested: Amount,
    balance: Amount,
) -> Result<ForcePayoutQuote, StakeError> {
    if amount.is_zero() {
        return Err(StakeError::AmountMustBePositive);
    }
    let vested = vested.min(balance);

    let gross = match mode {
        PayoutMode::Gross => amount,
        PayoutMode::Net => gross_for_net(amount, vested)?,
    };
    if gross > balance {
        return Err(StakeError::InsufficientBalance {
            requested: gross,
            available: balance,
        });
    }

    let penalty = penalty(gross, vested)?;
    Ok(ForcePayoutQuote {
        gross,
        net: gross - penalty,
        penalty,
        vested,
    })
}
