//! Fixed-point primitives.
//!
//! Growth factors are binary fixed point with [`FRACTION_BITS`] (192)
//! fractional bits, held in a `U512` so that a full-width [`Amount`] can be
//! multiplied by one without losing bits. Products go through 512-bit
//! intermediates; only the final result has to fit an [`Amount`].

use primitive_types::U512;

use celery_core::constants::{EXP2_ERROR_BOUND, FRACTION_BITS, LN2_Q192, SECONDS_PER_YEAR};
use celery_core::types::Amount;

/// Rounding direction for [`mul_div`] and [`mul_fixed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// `1.0` in growth-factor fixed point.
pub fn fixed_one() -> U512 {
    U512::one() << FRACTION_BITS
}

/// Computes `a * b / denom` rounded in the requested direction.
///
/// Returns `None` on a zero denominator or when the result does not fit an
/// [`Amount`].
pub fn mul_div(a: Amount, b: Amount, denom: Amount, rounding: Rounding) -> Option<Amount> {
    if denom.is_zero() {
        return None;
    }
    let (q, r) = a.full_mul(b).div_mod(U512::from(denom));
    let q = match rounding {
        Rounding::Up if !r.is_zero() => q + U512::one(),
        _ => q,
    };
    Amount::try_from(q).ok()
}

/// Computes `value * factor`, where `factor` is a growth factor in fixed
/// point. `None` if the product does not fit an [`Amount`].
pub fn mul_fixed(value: Amount, factor: U512, rounding: Rounding) -> Option<Amount> {
    let product = U512::from(value).checked_mul(factor)?;
    let mut q = product >> FRACTION_BITS;
    if rounding == Rounding::Up && q << FRACTION_BITS != product {
        q = q + U512::one();
    }
    Amount::try_from(q).ok()
}

/// An upper bound on `2^(secs / SECONDS_PER_YEAR)` for a partial year, in
/// growth-factor fixed point.
///
/// Evaluates `e^y` with `y = ln2 · secs / year` by summing Taylor terms
/// `y^k / k!` until a term truncates to zero. With `y < 0.7` this takes at
/// most ~45 terms. The truncated sum is at most [`EXP2_ERROR_BOUND`] units
/// below the true value, so adding that bound back gives a factor that is
/// never too small and overshoots by less than `2^-186`.
///
/// `secs` must be below one year; whole years are applied by the caller as
/// a shift.
pub fn exp2_fraction(secs: u64) -> U512 {
    debug_assert!(secs < SECONDS_PER_YEAR);
    let one = fixed_one();
    if secs == 0 {
        return one;
    }

    let y = U512::from(LN2_Q192) * U512::from(secs) / U512::from(SECONDS_PER_YEAR);

    let mut sum = one;
    let mut term = one;
    let mut k = 1u64;
    loop {
        // term ≤ 2^192 and y < 2^192, so term · y < 2^384.
        term = ((term * y) >> FRACTION_BITS) / U512::from(k);
        if term.is_zero() {
            break;
        }
        sum = sum + term;
        k += 1;
    }
    sum + U512::from(EXP2_ERROR_BOUND)
}
