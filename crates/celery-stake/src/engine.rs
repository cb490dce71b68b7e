//! The stake engine: public operations over accounts, pool totals and the
//! external token ledger.
//!
//! Every mutating call follows the same shape:
//!
//! 1. open and settle the caller's record at `now`
//! 2. derive the new record, the new [`SupplyTotals`] and a [`LedgerBatch`]
//!    without touching engine state
//! 3. apply the batch to the ledger, which is all-or-nothing
//! 4. commit the record and totals, then publish events
//!
//! A failure in steps 1–3 leaves the engine and the ledger exactly as they
//! were. Step 4 cannot fail.

use tracing::{info, warn};

use celery_accrual::{quote_force_payout, ForcePayoutQuote};
use celery_core::error::{CeleryError, StakeError};
use celery_core::event::{EventBus, StakeEvent};
use celery_core::ledger::MemoryTokenLedger;
use celery_core::traits::{LedgerBatch, TokenLedger};
use celery_core::types::{Account, AccountId, AccountStatus, Amount, PayoutMode, Timestamp};

use crate::account::{settle, AccountBook, Settlement};
use crate::config::EngineConfig;
use crate::supply::SupplyTotals;

/// A state change computed in full but not yet applied.
struct Pending {
    holder: AccountId,
    account: Account,
    totals: SupplyTotals,
    batch: LedgerBatch,
    events: Vec<StakeEvent>,
}

/// Continuous-compounding stake/payout engine over a token ledger `L`.
#[derive(Debug)]
pub struct StakeEngine<L: TokenLedger> {
    config: EngineConfig,
    accounts: AccountBook,
    totals: SupplyTotals,
    ledger: L,
    bus: EventBus,
    journal: Vec<StakeEvent>,
}

impl StakeEngine<MemoryTokenLedger> {
    /// Deploy over a fresh in-memory ledger holding the configured initial
    /// supply in the deployer's account.
    pub fn deploy(config: EngineConfig) -> Self {
        let ledger = MemoryTokenLedger::with_initial_supply(&config.deployer, config.initial_supply);
        Self::new(config, ledger)
    }
}

impl<L: TokenLedger> StakeEngine<L> {
    pub fn new(config: EngineConfig, ledger: L) -> Self {
        info!(
            deployed_at = %config.deployed_at,
            initial_supply = %config.initial_supply,
            end_interest_time = %config.end_interest_time(),
            "stake engine deployed"
        );
        Self {
            config,
            accounts: AccountBook::new(),
            totals: SupplyTotals::new(),
            ledger,
            bus: EventBus::new(),
            journal: Vec::new(),
        }
    }

    /// Rebuild an engine from previously persisted parts.
    pub fn from_parts(
        config: EngineConfig,
        accounts: AccountBook,
        totals: SupplyTotals,
        ledger: L,
        journal: Vec<StakeEvent>,
    ) -> Self {
        Self {
            config,
            accounts,
            totals,
            ledger,
            bus: EventBus::new(),
            journal,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn totals(&self) -> SupplyTotals {
        self.totals
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for wallet-to-wallet movements outside the
    /// engine. Custody balances moved this way are not tracked.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    // --- events ---

    pub fn subscribe(&mut self, listener: impl Fn(&StakeEvent) + Send + Sync + 'static) {
        self.bus.subscribe(listener);
    }

    /// Events emitted since the journal was last drained.
    pub fn events(&self) -> &[StakeEvent] {
        &self.journal
    }

    pub fn drain_events(&mut self) -> Vec<StakeEvent> {
        std::mem::take(&mut self.journal)
    }

    // --- operations ---

    /// Pull `amount` from the caller's wallet into the staking pool and put
    /// the account into staking.
    pub fn increase_balance_and_stake(
        &mut self,
        caller: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), CeleryError> {
        self.run("increase_balance_and_stake", caller, |engine| {
            if amount.is_zero() {
                return Err(StakeError::AmountMustBePositive.into());
            }
            let (before, settlement) = engine.open_and_settle(caller, now)?;
            let mut account = settlement.account;
            account.staked_amount = account
                .staked_amount
                .checked_add(amount)
                .ok_or(StakeError::ArithmeticOverflow)?;
            account.status = AccountStatus::Staking;

            let mut batch = LedgerBatch::new();
            batch.transfer(caller, &engine.config.custody, amount);

            let pending = Pending {
                holder: caller.clone(),
                totals: engine.totals.transition(&before, &account)?,
                account,
                batch,
                events: vec![
                    StakeEvent::BalanceIncreasedAndStaked {
                        account: caller.clone(),
                        amount,
                    },
                    StakeEvent::AccountStatusChanged {
                        account: caller.clone(),
                        status: AccountStatus::Staking,
                    },
                ],
            };
            Ok((pending, ()))
        })
    }

    /// Move a payout account back into staking. The remaining balance starts
    /// compounding again.
    pub fn start_stake(&mut self, caller: &AccountId, now: Timestamp) -> Result<(), CeleryError> {
        self.run("start_stake", caller, |engine| {
            let (before, settlement) = engine.open_and_settle(caller, now)?;
            if before.is_staking() {
                return Err(StakeError::AlreadyStaking.into());
            }
            let mut account = settlement.account;
            account.status = AccountStatus::Staking;
            Ok((engine.status_change(caller, before, account)?, ()))
        })
    }

    /// Freeze the grown balance and start releasing it linearly over a year.
    pub fn start_payout(&mut self, caller: &AccountId, now: Timestamp) -> Result<(), CeleryError> {
        self.run("start_payout", caller, |engine| {
            let (before, settlement) = engine.open_and_settle(caller, now)?;
            if !before.is_staking() {
                return Err(StakeError::AlreadyInPayout.into());
            }
            let mut account = settlement.account;
            account.status = AccountStatus::Payout;
            account.last_staking_balance = account.staked_amount;
            Ok((engine.status_change(caller, before, account)?, ()))
        })
    }

    /// Release everything vested since the last settlement. Returns the
    /// amount delivered to the caller's wallet.
    pub fn collect_payout(&mut self, caller: &AccountId, now: Timestamp) -> Result<Amount, CeleryError> {
        self.run("collect_payout", caller, |engine| {
            let (before, settlement) = engine.open_and_settle(caller, now)?;
            if before.is_staking() {
                return Err(StakeError::AccountIsStaking.into());
            }
            if before.staked_amount.is_zero() {
                return Err(StakeError::NothingToPayout.into());
            }
            let vested = settlement.vested;
            let mut account = settlement.account;
            account.staked_amount = account.staked_amount - vested;

            let mut batch = LedgerBatch::new();
            engine.release(&mut batch, caller, vested);

            let pending = Pending {
                holder: caller.clone(),
                totals: engine.totals.transition(&before, &account)?,
                account,
                batch,
                events: vec![StakeEvent::PayoutCollected {
                    account: caller.clone(),
                    amount: vested,
                }],
            };
            Ok((pending, vested))
        })
    }

    /// Withdraw ahead of the vesting schedule. The unvested part of the gross
    /// amount is taxed; `mode` says which side of the tax `amount` names.
    ///
    /// The settlement restarts the vesting clock, so vested credit not used
    /// by this call is forfeited to later penalties. Always emits
    /// `AccountStatusChanged { status: Payout }` after the payout event, even
    /// though the account was already in payout.
    pub fn force_payout(
        &mut self,
        caller: &AccountId,
        amount: Amount,
        mode: PayoutMode,
        now: Timestamp,
    ) -> Result<ForcePayoutQuote, CeleryError> {
        self.run("force_payout", caller, |engine| {
            let (before, settlement) = engine.open_and_settle(caller, now)?;
            if before.is_staking() {
                return Err(StakeError::AccountIsStaking.into());
            }
            let quote = quote_force_payout(
                amount,
                mode,
                settlement.vested,
                settlement.account.staked_amount,
            )?;
            let mut account = settlement.account;
            account.staked_amount = account.staked_amount - quote.gross;

            let mut batch = LedgerBatch::new();
            let from_custody = engine.release(&mut batch, caller, quote.net);
            let custody_left = engine
                .ledger
                .balance_of(&engine.config.custody)
                .saturating_sub(from_custody);
            batch.burn(&engine.config.custody, quote.penalty.min(custody_left));

            let pending = Pending {
                holder: caller.clone(),
                totals: engine.totals.transition(&before, &account)?,
                account,
                batch,
                events: vec![
                    StakeEvent::ForcePayoutExecuted {
                        account: caller.clone(),
                        amount: quote.net,
                        penalty: quote.penalty,
                    },
                    StakeEvent::AccountStatusChanged {
                        account: caller.clone(),
                        status: AccountStatus::Payout,
                    },
                ],
            };
            Ok((pending, quote))
        })
    }

    // --- queries ---

    /// The stored record, [`Account::UNTOUCHED`] if the holder never acted.
    pub fn account(&self, holder: &AccountId) -> Account {
        self.accounts.get(holder)
    }

    pub fn status(&self, holder: &AccountId) -> AccountStatus {
        self.accounts.get(holder).status
    }

    /// Balance as of the last settlement.
    pub fn staked_amount(&self, holder: &AccountId) -> Amount {
        self.accounts.get(holder).staked_amount
    }

    pub fn account_balance(&self, holder: &AccountId) -> Amount {
        self.staked_amount(holder)
    }

    pub fn last_processed_time(&self, holder: &AccountId) -> Timestamp {
        self.accounts.get(holder).last_processed_time
    }

    pub fn last_staking_balance(&self, holder: &AccountId) -> Amount {
        self.accounts.get(holder).last_staking_balance
    }

    pub fn end_interest_time(&self) -> Timestamp {
        self.config.end_interest_time()
    }

    pub fn total_staking_supply(&self) -> Amount {
        self.totals.total_staking
    }

    pub fn total_payout_supply(&self) -> Amount {
        self.totals.total_payout
    }

    /// Ledger supply outside custody.
    pub fn circulating_supply(&self) -> Amount {
        self.ledger
            .total_supply()
            .saturating_sub(self.ledger.balance_of(&self.config.custody))
    }

    /// Circulating supply plus both pools.
    pub fn fully_diluted_supply(&self) -> Result<Amount, StakeError> {
        self.circulating_supply()
            .checked_add(self.totals.pooled()?)
            .ok_or(StakeError::ArithmeticOverflow)
    }

    // --- estimation views ---

    /// Staking balance the holder would have at `at`.
    pub fn estimate_stake_balance(&self, holder: &AccountId, at: Timestamp) -> Result<Amount, StakeError> {
        let settlement = self.settle_view(holder, at)?;
        if !settlement.account.is_staking() {
            return Err(StakeError::AccountIsInPayout);
        }
        Ok(settlement.account.staked_amount)
    }

    /// Amount a collect at `at` would release.
    pub fn estimate_collect_payout(&self, holder: &AccountId, at: Timestamp) -> Result<Amount, StakeError> {
        let settlement = self.settle_view(holder, at)?;
        if settlement.account.is_staking() {
            return Err(StakeError::AccountIsStaking);
        }
        Ok(settlement.vested)
    }

    /// Full breakdown of a force-payout at `at`.
    pub fn estimate_force_payout(
        &self,
        holder: &AccountId,
        amount: Amount,
        mode: PayoutMode,
        at: Timestamp,
    ) -> Result<ForcePayoutQuote, StakeError> {
        let settlement = self.settle_view(holder, at)?;
        if settlement.account.is_staking() {
            return Err(StakeError::AccountIsStaking);
        }
        quote_force_payout(amount, mode, settlement.vested, settlement.account.staked_amount)
    }

    /// Penalty a force-payout at `at` would forfeit.
    pub fn estimate_force_payout_penalty_fee(
        &self,
        holder: &AccountId,
        amount: Amount,
        mode: PayoutMode,
        at: Timestamp,
    ) -> Result<Amount, StakeError> {
        Ok(self.estimate_force_payout(holder, amount, mode, at)?.penalty)
    }

    // --- internals ---

    /// Run an operation body and commit its result. Failures are logged and
    /// leave no trace.
    fn run<T, F>(&mut self, op: &'static str, caller: &AccountId, body: F) -> Result<T, CeleryError>
    where
        F: FnOnce(&Self) -> Result<(Pending, T), CeleryError>,
    {
        let (pending, output) = body(self).inspect_err(|e| warn!(%caller, op, "rejected: {e}"))?;
        self.ledger
            .apply(&pending.batch)
            .inspect_err(|e| warn!(%caller, op, "ledger rejected batch: {e}"))?;

        let account = pending.account;
        info!(
            %caller,
            op,
            status = %account.status,
            staked = %account.staked_amount,
            at = %account.last_processed_time,
            "operation committed"
        );
        self.accounts.insert(pending.holder, account);
        self.totals = pending.totals;
        for event in pending.events {
            self.bus.publish(&event);
            self.journal.push(event);
        }
        Ok(output)
    }

    /// Operations never settle before deployment.
    fn clock(&self, now: Timestamp) -> Timestamp {
        now.max(self.config.deployed_at)
    }

    /// The caller's record settled at `now`. The custody account holds
    /// pooled principal and cannot act as a holder.
    fn open_and_settle(&self, caller: &AccountId, now: Timestamp) -> Result<(Account, Settlement), StakeError> {
        if caller == &self.config.custody {
            return Err(StakeError::ReservedAccount(caller.clone()));
        }
        let now = self.clock(now);
        let before = self.accounts.open(caller, now);
        let settlement = settle(&before, now, self.config.end_interest_time())?;
        Ok((before, settlement))
    }

    fn settle_view(&self, holder: &AccountId, at: Timestamp) -> Result<Settlement, StakeError> {
        let account = self.accounts.get(holder);
        if at < account.last_processed_time {
            return Err(StakeError::TimestampTooEarly {
                at,
                last_processed: account.last_processed_time,
            });
        }
        settle(&account, self.clock(at), self.config.end_interest_time())
    }

    fn status_change(&self, caller: &AccountId, before: Account, account: Account) -> Result<Pending, CeleryError> {
        Ok(Pending {
            holder: caller.clone(),
            totals: self.totals.transition(&before, &account)?,
            events: vec![StakeEvent::AccountStatusChanged {
                account: caller.clone(),
                status: account.status,
            }],
            account,
            batch: LedgerBatch::new(),
        })
    }

    /// Queue delivery of `amount` to `to`: custody pays what it holds and the
    /// rest is minted. Returns the part taken from custody.
    fn release(&self, batch: &mut LedgerBatch, to: &AccountId, amount: Amount) -> Amount {
        let custody = &self.config.custody;
        let from_custody = amount.min(self.ledger.balance_of(custody));
        batch
            .transfer(custody, to, from_custody)
            .mint(to, amount - from_custody);
        from_custody
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celery_core::constants::SECONDS_PER_YEAR;
    use celery_core::error::LedgerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const YEAR: u64 = SECONDS_PER_YEAR;

    fn at(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn amt(n: u64) -> Amount {
        Amount::from(n)
    }

    /// Engine over supply 1000 with the whole supply in `alice`'s wallet.
    fn engine() -> (StakeEngine<MemoryTokenLedger>, AccountId) {
        let config = EngineConfig::for_deployment(Timestamp::ZERO, amt(1000));
        let mut engine = StakeEngine::deploy(config);
        let alice = AccountId::new("alice");
        let deployer = engine.config().deployer.clone();
        engine.ledger_mut().transfer(&deployer, &alice, amt(1000)).unwrap();
        (engine, alice)
    }

    fn stake_err(r: Result<impl std::fmt::Debug, CeleryError>) -> StakeError {
        r.unwrap_err().as_stake().cloned().unwrap()
    }

    // --- increase_balance_and_stake ---

    #[test]
    fn stake_moves_tokens_into_custody() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(400), at(0)).unwrap();
        assert_eq!(e.ledger().balance_of(&alice), amt(600));
        assert_eq!(e.ledger().balance_of(&AccountId::custody()), amt(400));
        assert_eq!(e.staked_amount(&alice), amt(400));
        assert_eq!(e.status(&alice), AccountStatus::Staking);
        assert_eq!(e.total_staking_supply(), amt(400));
    }

    #[test]
    fn stake_zero_is_rejected() {
        let (mut e, alice) = engine();
        assert_eq!(
            stake_err(e.increase_balance_and_stake(&alice, Amount::zero(), at(0))),
            StakeError::AmountMustBePositive
        );
    }

    #[test]
    fn stake_without_funds_leaves_no_trace() {
        let (mut e, alice) = engine();
        let err = e.increase_balance_and_stake(&alice, amt(1001), at(5)).unwrap_err();
        assert!(matches!(err, CeleryError::Ledger(LedgerError::InsufficientFunds { .. })));
        assert!(!e.accounts().contains(&alice));
        assert!(e.total_staking_supply().is_zero());
        assert!(e.events().is_empty());
    }

    #[test]
    fn stake_settles_growth_before_adding() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(500), at(0)).unwrap();
        e.increase_balance_and_stake(&alice, amt(500), at(YEAR)).unwrap();
        assert_eq!(e.staked_amount(&alice), amt(1500));
        assert_eq!(e.total_staking_supply(), amt(1500));
    }

    #[test]
    fn stake_from_payout_switches_status() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(500), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        e.increase_balance_and_stake(&alice, amt(100), at(10)).unwrap();
        assert_eq!(e.status(&alice), AccountStatus::Staking);
        assert!(e.total_payout_supply().is_zero());
        assert_eq!(e.total_staking_supply(), amt(600));
    }

    // --- start_stake / start_payout ---

    #[test]
    fn start_stake_twice_fails() {
        let (mut e, alice) = engine();
        e.start_stake(&alice, at(0)).unwrap();
        assert_eq!(stake_err(e.start_stake(&alice, at(1))), StakeError::AlreadyStaking);
    }

    #[test]
    fn start_payout_on_fresh_account_fails() {
        let (mut e, alice) = engine();
        assert_eq!(stake_err(e.start_payout(&alice, at(0))), StakeError::AlreadyInPayout);
    }

    #[test]
    fn start_payout_freezes_grown_balance() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(YEAR)).unwrap();
        assert_eq!(e.staked_amount(&alice), amt(2000));
        assert_eq!(e.last_staking_balance(&alice), amt(2000));
        assert!(e.total_staking_supply().is_zero());
        assert_eq!(e.total_payout_supply(), amt(2000));
    }

    // --- collect_payout ---

    #[test]
    fn collect_mints_interest_beyond_custody() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(YEAR)).unwrap();
        let released = e.collect_payout(&alice, at(2 * YEAR)).unwrap();
        assert_eq!(released, amt(2000));
        assert_eq!(e.ledger().balance_of(&alice), amt(2000));
        assert_eq!(e.ledger().total_supply(), amt(2000));
        assert!(e.staked_amount(&alice).is_zero());
    }

    #[test]
    fn collect_while_staking_fails() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(10), at(0)).unwrap();
        assert_eq!(stake_err(e.collect_payout(&alice, at(1))), StakeError::AccountIsStaking);
    }

    #[test]
    fn collect_empty_account_fails() {
        let (mut e, alice) = engine();
        assert_eq!(stake_err(e.collect_payout(&alice, at(1))), StakeError::NothingToPayout);
    }

    // --- force_payout ---

    #[test]
    fn force_payout_half_year_gross() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        let q = e.force_payout(&alice, amt(1000), PayoutMode::Gross, at(YEAR / 2)).unwrap();
        assert_eq!((q.net, q.penalty), (amt(750), amt(250)));
        assert_eq!(e.ledger().balance_of(&alice), amt(750));
        assert!(e.staked_amount(&alice).is_zero());
        // 250 of custody burned.
        assert_eq!(e.ledger().total_supply(), amt(750));
        assert!(e.ledger().balance_of(&AccountId::custody()).is_zero());
    }

    #[test]
    fn force_payout_while_staking_fails() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        assert_eq!(
            stake_err(e.force_payout(&alice, amt(10), PayoutMode::Gross, at(1))),
            StakeError::AccountIsStaking
        );
    }

    #[test]
    fn force_payout_on_fresh_account_fails() {
        let (mut e, alice) = engine();
        assert_eq!(
            stake_err(e.force_payout(&alice, amt(100), PayoutMode::Gross, at(0))),
            StakeError::InsufficientBalance {
                requested: amt(100),
                available: Amount::zero()
            }
        );
    }

    #[test]
    fn force_payout_net_mode_delivers_exact_amount() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        let q = e.force_payout(&alice, amt(300), PayoutMode::Net, at(0)).unwrap();
        assert_eq!(q.gross, amt(600));
        assert_eq!(e.ledger().balance_of(&alice), amt(300));
        assert_eq!(e.staked_amount(&alice), amt(400));
    }

    #[test]
    fn partial_force_payout_restarts_vesting() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        // 500 vested at half a year; only 400 of it is used.
        let first = e.force_payout(&alice, amt(400), PayoutMode::Gross, at(YEAR / 2)).unwrap();
        assert!(first.penalty.is_zero());
        let second = e.force_payout(&alice, amt(600), PayoutMode::Gross, at(YEAR / 2)).unwrap();
        assert_eq!((second.net, second.penalty), (amt(300), amt(300)));
        assert_eq!(e.ledger().balance_of(&alice), amt(700));
    }

    #[test]
    fn force_payout_always_reports_payout_status() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        e.drain_events();
        e.force_payout(&alice, amt(10), PayoutMode::Gross, at(YEAR)).unwrap();
        assert_eq!(
            e.events().last(),
            Some(&StakeEvent::AccountStatusChanged {
                account: alice.clone(),
                status: AccountStatus::Payout
            })
        );
        assert_eq!(e.status(&alice), AccountStatus::Payout);
    }

    // --- custody ---

    #[test]
    fn custody_cannot_act_as_holder() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        e.drain_events();
        let custody = AccountId::custody();
        let ledger = e.ledger().clone();
        let totals = e.totals();
        let reserved = StakeError::ReservedAccount(custody.clone());

        assert_eq!(
            stake_err(e.increase_balance_and_stake(&custody, amt(1000), at(YEAR))),
            reserved
        );
        assert_eq!(stake_err(e.start_stake(&custody, at(YEAR))), reserved);
        assert_eq!(stake_err(e.start_payout(&custody, at(YEAR))), reserved);
        assert_eq!(stake_err(e.collect_payout(&custody, at(YEAR))), reserved);
        assert_eq!(
            stake_err(e.force_payout(&custody, amt(1), PayoutMode::Gross, at(YEAR))),
            reserved
        );

        assert!(!e.accounts().contains(&custody));
        assert_eq!(e.ledger(), &ledger);
        assert_eq!(e.totals(), totals);
        assert!(e.events().is_empty());
    }

    // --- events ---

    #[test]
    fn events_reach_listeners_and_journal() {
        let (mut e, alice) = engine();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        e.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        e.force_payout(&alice, amt(1000), PayoutMode::Gross, at(YEAR / 2)).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 5);
        let events = e.drain_events();
        assert_eq!(
            events[3],
            StakeEvent::ForcePayoutExecuted {
                account: alice.clone(),
                amount: amt(750),
                penalty: amt(250)
            }
        );
        assert!(e.events().is_empty());
    }

    #[test]
    fn rejected_call_emits_nothing() {
        let (mut e, alice) = engine();
        let _ = e.start_payout(&alice, at(0));
        assert!(e.events().is_empty());
    }

    // --- views ---

    #[test]
    fn estimates_do_not_mutate() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        assert_eq!(e.estimate_stake_balance(&alice, at(YEAR)).unwrap(), amt(2000));
        assert_eq!(e.estimate_stake_balance(&alice, at(YEAR)).unwrap(), amt(2000));
        assert_eq!(e.staked_amount(&alice), amt(1000));
        assert_eq!(e.last_processed_time(&alice), at(0));
    }

    #[test]
    fn estimate_before_last_processed_fails() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(100)).unwrap();
        assert_eq!(
            e.estimate_stake_balance(&alice, at(99)),
            Err(StakeError::TimestampTooEarly {
                at: at(99),
                last_processed: at(100)
            })
        );
    }

    #[test]
    fn estimates_check_status() {
        let (mut e, alice) = engine();
        assert_eq!(
            e.estimate_stake_balance(&alice, at(0)),
            Err(StakeError::AccountIsInPayout)
        );
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        assert_eq!(
            e.estimate_collect_payout(&alice, at(0)),
            Err(StakeError::AccountIsStaking)
        );
        assert_eq!(
            e.estimate_force_payout_penalty_fee(&alice, amt(10), PayoutMode::Gross, at(0)),
            Err(StakeError::AccountIsStaking)
        );
    }

    #[test]
    fn penalty_fee_matches_executed_penalty() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(1000), at(0)).unwrap();
        e.start_payout(&alice, at(0)).unwrap();
        let fee = e
            .estimate_force_payout_penalty_fee(&alice, amt(800), PayoutMode::Gross, at(YEAR / 4))
            .unwrap();
        let q = e.force_payout(&alice, amt(800), PayoutMode::Gross, at(YEAR / 4)).unwrap();
        assert_eq!(fee, q.penalty);
    }

    // --- supply ---

    #[test]
    fn supply_identity_holds() {
        let (mut e, alice) = engine();
        e.increase_balance_and_stake(&alice, amt(600), at(0)).unwrap();
        assert_eq!(e.circulating_supply(), amt(400));
        assert_eq!(e.fully_diluted_supply().unwrap(), amt(1000));
        e.start_payout(&alice, at(YEAR)).unwrap();
        assert_eq!(e.fully_diluted_supply().unwrap(), amt(400 + 1200));
    }

    #[test]
    fn operations_before_deployment_settle_at_deployment() {
        let config = EngineConfig::for_deployment(at(1_000), amt(1000));
        let mut e = StakeEngine::deploy(config);
        let deployer = e.config().deployer.clone();
        e.increase_balance_and_stake(&deployer, amt(10), at(5)).unwrap();
        assert_eq!(e.last_processed_time(&deployer), at(1_000));
    }
}
