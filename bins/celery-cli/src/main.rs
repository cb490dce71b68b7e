//! celery-cli: command-line simulator for the Celery stake engine.
//!
//! Keeps an engine and its in-memory token ledger in a snapshot file and
//! drives one operation per invocation. `--at` supplies the clock in Unix
//! seconds; without it the wall clock is used.

mod state;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use celery_core::constants::DEFAULT_INITIAL_SUPPLY;
use celery_core::traits::TokenLedger;
use celery_core::types::{AccountId, Amount, PayoutMode, Timestamp};
use celery_stake::EngineConfig;

use crate::state::{Engine, StateFile};

/// Celery stake engine simulator.
#[derive(Parser, Debug)]
#[command(name = "celery-cli")]
#[command(version, about = "Stake, grow, and pay out Celery balances")]
struct Cli {
    /// Path to the state file (default: ~/.celery/state.bin).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Clock for this invocation, in Unix seconds (default: now).
    #[arg(long, global = true)]
    at: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy a fresh engine and token ledger.
    Init(InitArgs),
    /// Move wallet tokens into the staking pool.
    Stake(StakeArgs),
    /// Put a payout account back into staking.
    StartStake(HolderArgs),
    /// Freeze the grown balance and start vesting it.
    StartPayout(HolderArgs),
    /// Release everything vested so far.
    Collect(HolderArgs),
    /// Withdraw early, forfeiting half of the unvested part.
    ForcePayout(ForcePayoutArgs),
    /// Show an account's record and wallet balance.
    Account(HolderArgs),
    /// Show pool totals and supply figures.
    Supply,
    /// Project balances at a future time without changing state.
    Estimate(EstimateArgs),
    /// Move wallet tokens between holders.
    Transfer(TransferArgs),
    /// List recorded events.
    Events(EventsArgs),
    /// Print the whole state as JSON.
    Export,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Tokens minted to the deployer.
    #[arg(long, value_parser = parse_amount, default_value_t = Amount::from(DEFAULT_INITIAL_SUPPLY))]
    supply: Amount,

    /// Account credited with the initial supply.
    #[arg(long, default_value = "deployer")]
    deployer: String,

    /// Overwrite an existing state file.
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct HolderArgs {
    /// Account acting or being queried.
    #[arg(short, long)]
    account: String,
}

#[derive(Args, Debug)]
struct StakeArgs {
    #[arg(short, long)]
    account: String,

    /// Amount to stake, in base units.
    #[arg(long, value_parser = parse_amount)]
    amount: Amount,
}

#[derive(Args, Debug)]
struct ForcePayoutArgs {
    #[arg(short, long)]
    account: String,

    #[arg(long, value_parser = parse_amount)]
    amount: Amount,

    /// "net" (amount received) or "gross" (amount taken from the balance).
    #[arg(long, default_value = "gross")]
    mode: PayoutMode,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[arg(short, long)]
    account: String,

    /// Amount for a force-payout estimate. Omit for stake and collect estimates.
    #[arg(long, value_parser = parse_amount)]
    amount: Option<Amount>,

    #[arg(long, default_value = "gross")]
    mode: PayoutMode,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    #[arg(long, value_parser = parse_amount)]
    amount: Amount,
}

#[derive(Args, Debug)]
struct EventsArgs {
    /// Clear the journal after printing.
    #[arg(long)]
    drain: bool,

    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let state = StateFile::resolve(cli.state)?;
    let now = resolve_clock(cli.at)?;

    match cli.command {
        Commands::Init(args) => init(&state, args, now),
        Commands::Stake(args) => mutate(&state, |engine| {
            let holder = AccountId::new(args.account);
            engine
                .increase_balance_and_stake(&holder, args.amount, now)
                .context("Stake failed")?;
            println!("Staked {} for {holder}", args.amount);
            Ok(())
        }),
        Commands::StartStake(args) => mutate(&state, |engine| {
            let holder = AccountId::new(args.account);
            engine.start_stake(&holder, now).context("Start-stake failed")?;
            println!("{holder} is now staking {}", engine.staked_amount(&holder));
            Ok(())
        }),
        Commands::StartPayout(args) => mutate(&state, |engine| {
            let holder = AccountId::new(args.account);
            engine.start_payout(&holder, now).context("Start-payout failed")?;
            println!("{holder} entered payout with {}", engine.staked_amount(&holder));
            Ok(())
        }),
        Commands::Collect(args) => mutate(&state, |engine| {
            let holder = AccountId::new(args.account);
            let released = engine.collect_payout(&holder, now).context("Collect failed")?;
            println!("Collected {released} for {holder}");
            Ok(())
        }),
        Commands::ForcePayout(args) => mutate(&state, |engine| {
            let holder = AccountId::new(args.account);
            let quote = engine
                .force_payout(&holder, args.amount, args.mode, now)
                .context("Force-payout failed")?;
            println!(
                "Paid {} to {holder} (gross {}, penalty {})",
                quote.net, quote.gross, quote.penalty
            );
            Ok(())
        }),
        Commands::Account(args) => {
            let engine = state.load()?;
            print_account(&engine, &AccountId::new(args.account));
            Ok(())
        }
        Commands::Supply => {
            let engine = state.load()?;
            print_supply(&engine)
        }
        Commands::Estimate(args) => {
            let engine = state.load()?;
            estimate(&engine, args, now)
        }
        Commands::Transfer(args) => mutate(&state, |engine| {
            let from = AccountId::new(args.from);
            let to = AccountId::new(args.to);
            if from == engine.config().custody {
                bail!("Custody balances can only leave through payouts");
            }
            engine
                .ledger_mut()
                .transfer(&from, &to, args.amount)
                .context("Transfer failed")?;
            println!("Transferred {} from {from} to {to}", args.amount);
            Ok(())
        }),
        Commands::Events(args) => events(&state, args),
        Commands::Export => {
            let engine = state.load()?;
            println!("{}", engine.snapshot().to_json()?);
            Ok(())
        }
    }
}

/// Load the engine, run `op`, and persist the result only if `op` succeeded.
fn mutate(state: &StateFile, op: impl FnOnce(&mut Engine) -> Result<()>) -> Result<()> {
    let mut engine = state.load()?;
    op(&mut engine)?;
    state.save(&engine)?;
    info!(path = %state.path().display(), "state saved");
    Ok(())
}

fn init(state: &StateFile, args: InitArgs, now: Timestamp) -> Result<()> {
    if state.exists() && !args.force {
        bail!(
            "State already exists: {} (pass --force to overwrite)",
            state.path().display()
        );
    }
    let config = EngineConfig {
        deployer: AccountId::new(args.deployer),
        ..EngineConfig::for_deployment(now, args.supply)
    };
    let engine = Engine::deploy(config);
    state.save(&engine)?;

    let config = engine.config();
    println!("Deployed at {}", render_time(config.deployed_at));
    println!("  supply:        {} to {}", config.initial_supply, config.deployer);
    println!("  interest ends: {}", render_time(config.end_interest_time()));
    println!("  state:         {}", state.path().display());
    Ok(())
}

fn print_account(engine: &Engine, holder: &AccountId) {
    let account = engine.account(holder);
    println!("Account {holder}");
    println!("  status:               {}", account.status);
    println!("  staked amount:        {}", account.staked_amount);
    println!("  last staking balance: {}", account.last_staking_balance);
    println!("  last processed:       {}", render_time(account.last_processed_time));
    println!("  wallet:               {}", engine.ledger().balance_of(holder));
}

fn print_supply(engine: &Engine) -> Result<()> {
    println!("Total supply:         {}", engine.ledger().total_supply());
    println!("Circulating supply:   {}", engine.circulating_supply());
    println!("Total staking supply: {}", engine.total_staking_supply());
    println!("Total payout supply:  {}", engine.total_payout_supply());
    println!("Fully diluted supply: {}", engine.fully_diluted_supply()?);
    println!("Interest ends:        {}", render_time(engine.end_interest_time()));
    Ok(())
}

fn estimate(engine: &Engine, args: EstimateArgs, at: Timestamp) -> Result<()> {
    let holder = AccountId::new(args.account);
    let account = engine.account(&holder);
    println!("Estimate for {holder} at {}", render_time(at));

    if let Some(amount) = args.amount {
        let quote = engine.estimate_force_payout(&holder, amount, args.mode, at)?;
        println!("  force-payout ({}):", args.mode);
        println!("    gross:   {}", quote.gross);
        println!("    net:     {}", quote.net);
        println!("    penalty: {}", quote.penalty);
        println!("    vested:  {}", quote.vested);
    } else if account.is_staking() {
        println!("  stake balance:  {}", engine.estimate_stake_balance(&holder, at)?);
    } else {
        println!("  collectable:    {}", engine.estimate_collect_payout(&holder, at)?);
    }
    Ok(())
}

fn events(state: &StateFile, args: EventsArgs) -> Result<()> {
    let mut engine = state.load()?;
    let events = if args.drain {
        engine.drain_events()
    } else {
        engine.events().to_vec()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if events.is_empty() {
        println!("No events");
    } else {
        for event in &events {
            println!("{event}");
        }
    }

    if args.drain {
        state.save(&engine)?;
    }
    Ok(())
}

/// Decimal amount in base units. Accepts values beyond `u128`.
fn parse_amount(s: &str) -> Result<Amount, String> {
    Amount::from_dec_str(s).map_err(|e| format!("invalid amount {s:?}: {e}"))
}

/// `--at` if given, otherwise the current wall-clock second.
fn resolve_clock(at: Option<u64>) -> Result<Timestamp> {
    if let Some(secs) = at {
        return Ok(Timestamp::new(secs));
    }
    let secs = u64::try_from(Utc::now().timestamp()).context("System clock is before 1970")?;
    Ok(Timestamp::new(secs))
}

fn render_time(ts: Timestamp) -> String {
    i64::try_from(ts.as_secs())
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Logs go to stderr.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
