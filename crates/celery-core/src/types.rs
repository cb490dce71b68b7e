//! Core domain types: account identities, timestamps, per-account records.
//!
//! All token amounts are [`Amount`] base units. All timestamps are Unix
//! seconds supplied by the caller; nothing in the engine reads the wall clock.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::CUSTODY_ACCOUNT;

/// A token amount in base units.
///
/// 256 bits wide: a balance may double once a year for the whole interest
/// horizon. Serialises as a `0x`-prefixed hex string.
pub type Amount = U256;

/// Identity of a token holder.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ledger account holding staked principal on behalf of the engine.
    pub fn custody() -> Self {
        Self(CUSTODY_ACCOUNT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A Unix timestamp in seconds.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Lifecycle state of an account.
///
/// The numeric codes (`Payout = 0`, `Staking = 1`) are the ones reported in
/// status notifications.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default,
    bincode::Encode, bincode::Decode,
)]
pub enum AccountStatus {
    /// Balance is released linearly; also the state of a never-used account.
    #[default]
    Payout,
    /// Balance compounds, doubling once per year.
    Staking,
}

impl AccountStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::Payout => 0,
            Self::Staking => 1,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payout => f.write_str("payout"),
            Self::Staking => f.write_str("staking"),
        }
    }
}

/// How the amount passed to a force-payout is interpreted.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub enum PayoutMode {
    /// Amount the caller wants delivered to their wallet, after penalty.
    Net,
    /// Amount to burn down from the staked balance, before penalty.
    Gross,
}

impl PayoutMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Net => 0,
            Self::Gross => 1,
        }
    }
}

impl TryFrom<u8> for PayoutMode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Net),
            1 => Ok(Self::Gross),
            other => Err(other),
        }
    }
}

impl FromStr for PayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "net" | "0" => Ok(Self::Net),
            "gross" | "1" => Ok(Self::Gross),
            other => Err(format!("unknown payout mode: {other} (expected net|gross)")),
        }
    }
}

impl fmt::Display for PayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net => f.write_str("net"),
            Self::Gross => f.write_str("gross"),
        }
    }
}

/// Per-account stake record.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Account {
    pub status: AccountStatus,
    /// Settled balance as of `last_processed_time`.
    #[bincode(with_serde)]
    pub staked_amount: Amount,
    pub last_processed_time: Timestamp,
    /// Balance frozen on the last transition into payout. Vesting is linear
    /// in this amount, not in the remaining balance.
    #[bincode(with_serde)]
    pub last_staking_balance: Amount,
}

impl Account {
    /// The record reported for an account that has never been touched.
    pub const UNTOUCHED: Self = Self {
        status: AccountStatus::Payout,
        staked_amount: Amount::zero(),
        last_processed_time: Timestamp::ZERO,
        last_staking_balance: Amount::zero(),
    };

    /// A fresh record anchored at its first mutating call, so that the first
    /// settlement sees no elapsed time.
    pub fn opened_at(now: Timestamp) -> Self {
        Self {
            last_processed_time: now,
            ..Self::UNTOUCHED
        }
    }

    pub fn is_staking(&self) -> bool {
        self.status == AccountStatus::Staking
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::UNTOUCHED
    }
}
