//! Loan Keeper
//!
//! Periodically scans a lending contract for funded loans past their due date
//! and submits `liquidateLoan` for each one.
//! Features:
//! - Stateless scan cycles, one loan read at a time
//! - Pre-flight simulation and gas price cap before any transaction is sent
//! - Single-flight scheduler with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keeper_chain::{ChainError, ContractLoanReader, ContractSubmitter, SigningAccount};
use keeper_core::{
    ChainSettings, KeeperConfig, RetryPolicy, Scanner, ScannerConfig, Scheduler, SystemClock,
};

const DEFAULT_FILTER: &str = "info,keeper_core=debug,keeper_chain=debug";

/// Attempts after the first for each startup chain query.
const STARTUP_RETRIES: u32 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // Print startup banner
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    // Use KEEPER_PROFILE to select: testing, production, or a TOML file path
    let settings = ChainSettings::from_env().context("Invalid chain settings")?;
    let config = KeeperConfig::from_env()
        .context("Invalid keeper config")?
        .with_interval_minutes(settings.interval_minutes);
    config.log_config();

    info!("Starting Loan Keeper");

    let scheduler = Arc::new(initialize_components(&settings, &config).await?);
    let handle = scheduler.start(config.scanner.interval())?;

    shutdown_signal().await;
    info!("Shutdown signal received, waiting for in-flight cycle");
    scheduler.stop();
    handle.await.context("Scheduler task panicked")?;

    if let Some(report) = scheduler.last_report() {
        info!(
            cycles = scheduler.cycles_completed(),
            last_liquidated = report.liquidated_count,
            last_errors = report.error_count,
            "Keeper stopped"
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // LOG_FORMAT=json for log shippers
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn initialize_components(settings: &ChainSettings, config: &KeeperConfig) -> Result<Scheduler> {
    info!("Initializing components...");

    // Endpoint failures here are not fatal; cycles retry on their own schedule
    let startup = RetryPolicy::new(STARTUP_RETRIES, Duration::from_secs(1));

    // Reader
    let reader = ContractLoanReader::new(&settings.rpc_url, settings.lending_contract)?;
    let observed = startup.run("chain_id", || reader.chain_id()).await;
    if let Some(chain_id) = check_chain_id(observed, settings.chain_id)? {
        info!(
            contract = %settings.lending_contract,
            chain_id,
            "Loan reader initialized"
        );
    }

    // Signing account
    let account = SigningAccount::from_private_key(settings.private_key(), &settings.rpc_url)?;
    match startup.run("balance", || account.balance()).await {
        Ok(balance) => {
            info!(
                address = %account.address(),
                balance = %alloy::primitives::utils::format_ether(balance),
                "Keeper account loaded"
            );
            if balance.is_zero() {
                warn!("Keeper account has no balance, liquidations will fail");
            }
        }
        Err(e) => warn!(address = %account.address(), error = %e, "Could not read keeper balance"),
    }
    match startup.run("nonce", || account.nonce()).await {
        Ok(nonce) => info!(nonce, "Keeper pending nonce"),
        Err(e) => warn!(error = %e, "Could not read keeper nonce"),
    }

    // Submitter
    let submitter = ContractSubmitter::new(
        settings.lending_contract,
        account,
        config.gas_strategy(),
        config.submitter_config(),
    );
    info!(
        gas_strategy = submitter.gas_strategy_name(),
        "Submitter initialized"
    );

    let scanner = Scanner::new(
        Arc::new(reader),
        Arc::new(submitter),
        Arc::new(SystemClock),
        ScannerConfig::from(config),
    );

    info!("All components initialized");

    Ok(Scheduler::new(scanner))
}

/// Verify the node's chain id against `CHAIN_ID`.
///
/// An unreachable endpoint only warns and returns `None`; a confirmed
/// mismatch is fatal.
fn check_chain_id(observed: Result<u64, ChainError>, expected: Option<u64>) -> Result<Option<u64>> {
    match observed {
        Ok(actual) => {
            if let Some(expected) = expected {
                if actual != expected {
                    bail!("Chain id mismatch: expected {expected}, node reports {actual}");
                }
            }
            Ok(Some(actual))
        }
        Err(e) => {
            warn!(
                error = %e,
                expected_chain_id = ?expected,
                "Chain endpoint unreachable at startup, chain id not verified"
            );
            Ok(None)
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print startup banner.
fn print_banner() {
    println!(r#"
    ╦  ┌─┐┌─┐┌┐┌  ╦╔═┌─┐┌─┐┌─┐┌─┐┬─┐
    ║  │ │├─┤│││  ╠╩╗├┤ ├┤ ├─┘├┤ ├┬┘
    ╩═╝└─┘┴ ┴┘└┘  ╩ ╩└─┘└─┘┴  └─┘┴└─
    Loan Keeper v0.1.0
    "#);
}
