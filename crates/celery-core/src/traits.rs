//! Trait interfaces between the staking engine and its collaborators.
//!
//! - [`TokenLedger`]: the fungible-token ledger the engine moves tokens
//!   through (`MemoryTokenLedger` implements it for tests and the CLI).

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{AccountId, Amount};

/// A single token movement.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Creates `amount` new tokens, raising the total supply.
    Mint { to: AccountId, amount: Amount },
    /// Destroys `amount` tokens, lowering the total supply.
    Burn { from: AccountId, amount: Amount },
}

/// An ordered group of token movements applied all-or-nothing.
///
/// Zero-amount movements are dropped when pushed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> &mut Self {
        if !amount.is_zero() {
            self.ops.push(LedgerOp::Transfer {
                from: from.clone(),
                to: to.clone(),
                amount,
            });
        }
        self
    }

    pub fn mint(&mut self, to: &AccountId, amount: Amount) -> &mut Self {
        if !amount.is_zero() {
            self.ops.push(LedgerOp::Mint {
                to: to.clone(),
                amount,
            });
        }
        self
    }

    pub fn burn(&mut self, from: &AccountId, amount: Amount) -> &mut Self {
        if !amount.is_zero() {
            self.ops.push(LedgerOp::Burn {
                from: from.clone(),
                amount,
            });
        }
        self
    }

    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Fungible-token ledger used by the engine.
pub trait TokenLedger: Send + Sync {
    /// Wallet balance of `account`. Unknown accounts hold zero.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Total number of tokens in existence.
    fn total_supply(&self) -> Amount;

    /// Apply every movement of `batch` in order, or none of them.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] if a transfer or burn exceeds the
    ///   balance at that point in the batch
    /// - [`LedgerError::SupplyOverflow`] / [`LedgerError::BalanceOverflow`]
    ///   if a mint or credit would not fit in an [`Amount`]
    fn apply(&mut self, batch: &LedgerBatch) -> Result<(), LedgerError>;

    /// Move tokens between two wallets.
    ///
    /// Default implementation wraps a one-entry batch.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let mut batch = LedgerBatch::new();
        batch.transfer(from, to, amount);
        self.apply(&batch)
    }
}
