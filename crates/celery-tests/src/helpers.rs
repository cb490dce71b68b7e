//! Shared fixtures for E2E and adversarial tests.

use celery_core::constants::SECONDS_PER_YEAR;
use celery_core::ledger::MemoryTokenLedger;
use celery_core::traits::TokenLedger;
use celery_core::types::{AccountId, AccountStatus, Amount, Timestamp};
use celery_stake::{EngineConfig, StakeEngine};

pub type Engine = StakeEngine<MemoryTokenLedger>;

pub const YEAR: u64 = SECONDS_PER_YEAR;

pub fn ts(secs: u64) -> Timestamp {
    Timestamp::new(secs)
}

pub fn id(name: &str) -> AccountId {
    AccountId::new(name)
}

pub fn amt(n: u128) -> Amount {
    Amount::from(n)
}

/// Engine deployed at time zero with `supply` held by `owner`.
pub fn deploy(supply: u128) -> (Engine, AccountId) {
    let owner = id("owner");
    let config = EngineConfig {
        deployer: owner.clone(),
        ..EngineConfig::for_deployment(Timestamp::ZERO, amt(supply))
    };
    (StakeEngine::deploy(config), owner)
}

/// Engine whose supply is split between the named holders.
pub fn deploy_with_holders(holders: &[(&str, u128)]) -> (Engine, Vec<AccountId>) {
    let supply = holders.iter().map(|(_, amount)| amount).sum();
    let (mut engine, owner) = deploy(supply);
    let ids = holders
        .iter()
        .map(|(name, amount)| {
            let holder = id(name);
            if holder != owner {
                engine
                    .ledger_mut()
                    .transfer(&owner, &holder, amt(*amount))
                    .expect("owner holds the whole supply");
            }
            holder
        })
        .collect();
    (engine, ids)
}

/// Check every aggregate the engine maintains against a recomputation from
/// per-account records and ledger balances.
pub fn assert_aggregates(engine: &Engine) {
    let mut staking = Amount::zero();
    let mut payout = Amount::zero();
    for (_, account) in engine.accounts().iter() {
        match account.status {
            AccountStatus::Staking => staking = staking + account.staked_amount,
            AccountStatus::Payout => payout = payout + account.staked_amount,
        }
    }
    assert_eq!(engine.total_staking_supply(), staking, "staking pool drifted");
    assert_eq!(engine.total_payout_supply(), payout, "payout pool drifted");

    let ledger = engine.ledger();
    let held = ledger
        .holders()
        .fold(Amount::zero(), |acc, (_, amount)| acc + amount);
    assert_eq!(ledger.total_supply(), held, "ledger supply drifted");

    let custody = ledger.balance_of(&AccountId::custody());
    assert_eq!(engine.circulating_supply(), ledger.total_supply() - custody);
    assert!(
        !engine.accounts().contains(&AccountId::custody()),
        "custody opened an account record"
    );
    assert_eq!(
        engine.fully_diluted_supply().expect("fits"),
        engine.circulating_supply() + staking + payout
    );
}
