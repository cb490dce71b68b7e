//! In-memory token ledger.
//!
//! Plays the role of the external fungible-token contract: balances, total
//! supply, and atomic application of [`LedgerBatch`]es. Suitable for tests and
//! the CLI simulator, where it is persisted together with the engine state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::LedgerError;
use crate::traits::{LedgerBatch, LedgerOp, TokenLedger};
use crate::types::{AccountId, Amount};

/// Token ledger stored in a `BTreeMap`.
///
/// Zero balances are removed so that iteration only yields holders.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct MemoryTokenLedger {
    #[bincode(with_serde)]
    balances: BTreeMap<AccountId, Amount>,
    #[bincode(with_serde)]
    total_supply: Amount,
}

impl MemoryTokenLedger {
    /// Create an empty ledger with no supply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger whose whole initial supply belongs to `deployer`.
    pub fn with_initial_supply(deployer: &AccountId, supply: Amount) -> Self {
        let mut balances = BTreeMap::new();
        if !supply.is_zero() {
            balances.insert(deployer.clone(), supply);
        }
        Self {
            balances,
            total_supply: supply,
        }
    }

    /// All non-zero balances in account order.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances.iter().map(|(id, bal)| (id, *bal))
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}

/// Staged view of balances touched by a batch. Nothing reaches the ledger
/// until every op has been checked.
struct Staged<'a> {
    base: &'a BTreeMap<AccountId, Amount>,
    touched: BTreeMap<AccountId, Amount>,
    total_supply: Amount,
}

impl<'a> Staged<'a> {
    fn balance(&self, account: &AccountId) -> Amount {
        self.touched
            .get(account)
            .or_else(|| self.base.get(account))
            .copied()
            .unwrap_or_default()
    }

    fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let have = self.balance(account);
        let left = have
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                account: account.to_string(),
                have,
                need: amount,
            })?;
        self.touched.insert(account.clone(), left);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let new = self
            .balance(account)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(account.to_string()))?;
        self.touched.insert(account.clone(), new);
        Ok(())
    }

    fn step(&mut self, op: &LedgerOp) -> Result<(), LedgerError> {
        match op {
            LedgerOp::Transfer { from, to, amount } => {
                self.debit(from, *amount)?;
                self.credit(to, *amount)
            }
            LedgerOp::Mint { to, amount } => {
                self.total_supply = self
                    .total_supply
                    .checked_add(*amount)
                    .ok_or(LedgerError::SupplyOverflow)?;
                self.credit(to, *amount)
            }
            LedgerOp::Burn { from, amount } => {
                self.debit(from, *amount)?;
                // Cannot underflow: the burned amount was held by `from`.
                self.total_supply = self.total_supply - *amount;
                Ok(())
            }
        }
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn apply(&mut self, batch: &LedgerBatch) -> Result<(), LedgerError> {
        let mut staged = Staged {
            base: &self.balances,
            touched: BTreeMap::new(),
            total_supply: self.total_supply,
        };
        for op in batch.ops() {
            staged.step(op)?;
        }

        let Staged {
            touched,
            total_supply,
            ..
        } = staged;
        for (account, balance) in touched {
            if balance.is_zero() {
                self.balances.remove(&account);
            } else {
                self.balances.insert(account, balance);
            }
        }
        self.total_supply = total_supply;
        trace!(ops = batch.len(), total_supply = %total_supply, "ledger batch applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    fn amt(n: u64) -> Amount {
        Amount::from(n)
    }

    #[test]
    fn initial_supply_goes_to_deployer() {
        let l = MemoryTokenLedger::with_initial_supply(&id("owner"), amt(1000));
        assert_eq!(l.balance_of(&id("owner")), amt(1000));
        assert_eq!(l.total_supply(), amt(1000));
        assert_eq!(l.holder_count(), 1);
    }

    #[test]
    fn zero_supply_has_no_holders() {
        let l = MemoryTokenLedger::with_initial_supply(&id("owner"), Amount::zero());
        assert_eq!(l.holder_count(), 0);
        assert!(l.total_supply().is_zero());
    }

    #[test]
    fn transfer_moves_balance() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(100));
        l.transfer(&id("a"), &id("b"), amt(40)).unwrap();
        assert_eq!(l.balance_of(&id("a")), amt(60));
        assert_eq!(l.balance_of(&id("b")), amt(40));
        assert_eq!(l.total_supply(), amt(100));
    }

    #[test]
    fn mint_and_burn_change_supply() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(100));
        let mut batch = LedgerBatch::new();
        batch.mint(&id("b"), amt(50)).burn(&id("a"), amt(30));
        l.apply(&batch).unwrap();
        assert_eq!(l.total_supply(), amt(120));
        assert_eq!(l.balance_of(&id("a")), amt(70));
        assert_eq!(l.balance_of(&id("b")), amt(50));
    }

    #[test]
    fn failed_batch_changes_nothing() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(100));
        let before = l.clone();
        let mut batch = LedgerBatch::new();
        batch
            .transfer(&id("a"), &id("b"), amt(60))
            .mint(&id("c"), amt(5))
            .transfer(&id("a"), &id("b"), amt(60));
        let err = l.apply(&batch).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: "a".into(),
                have: amt(40),
                need: amt(60)
            }
        );
        assert_eq!(l, before);
    }

    #[test]
    fn batch_sees_its_own_earlier_steps() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(10));
        let mut batch = LedgerBatch::new();
        batch.mint(&id("a"), amt(5)).transfer(&id("a"), &id("b"), amt(15));
        l.apply(&batch).unwrap();
        assert!(l.balance_of(&id("a")).is_zero());
        assert_eq!(l.balance_of(&id("b")), amt(15));
        assert_eq!(l.holder_count(), 1);
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), Amount::MAX);
        let mut batch = LedgerBatch::new();
        batch.mint(&id("b"), amt(1));
        assert_eq!(l.apply(&batch), Err(LedgerError::SupplyOverflow));
        assert_eq!(l.total_supply(), Amount::MAX);
    }

    #[test]
    fn supply_beyond_u128_is_representable() {
        let big = Amount::one() << 200;
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), big);
        let mut batch = LedgerBatch::new();
        batch.mint(&id("b"), big);
        l.apply(&batch).unwrap();
        assert_eq!(l.total_supply(), Amount::one() << 201);
    }

    #[test]
    fn burn_more_than_held_fails() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(10));
        let mut batch = LedgerBatch::new();
        batch.burn(&id("a"), amt(11));
        assert!(matches!(
            l.apply(&batch),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn bincode_snapshot_restores_ledger() {
        let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(1_000_000));
        l.transfer(&id("a"), &id("b"), amt(1)).unwrap();
        let bytes = bincode::encode_to_vec(&l, bincode::config::standard()).unwrap();
        let (back, _): (MemoryTokenLedger, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(back, l);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn transfers_conserve_supply(
            supply in 1u64..=1_000_000_000_000u64,
            moves in proptest::collection::vec((0usize..4, 0usize..4, 0u64..1_000_000u64), 0..20),
        ) {
            let names = ["a", "b", "c", "d"];
            let mut l = MemoryTokenLedger::with_initial_supply(&id("a"), amt(supply));
            for (from, to, amount) in moves {
                let _ = l.transfer(&id(names[from]), &id(names[to]), amt(amount));
            }
            let sum = l.holders().fold(Amount::zero(), |acc, (_, b)| acc + b);
            prop_assert_eq!(sum, amt(supply));
            prop_assert_eq!(l.total_supply(), amt(supply));
        }
    }
}
