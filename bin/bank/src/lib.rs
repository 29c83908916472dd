pub mod config;
pub mod metrics;

use crate::metrics::Metrics;
use action::Action;
use alloy_primitives::{
    utils::{format_units, parse_units},
    Address, U256,
};
use alloy_provider::Provider;
use balance::{BalanceMonitor, TokenSnapshot};
use binding::token::IERC20;
use client::{read_contract, Wallet};
use indexer::{Entity, EventScanner, MemoryStore, ScanSummary};
use std::time::Duration;
use tracing::{info, warn};

/// Convert a decimal amount in token units to base units.
pub fn parse_amount(value: &str, decimals: u8) -> eyre::Result<U256> {
    let value = value.trim();
    if value.starts_with('-') {
        eyre::bail!("Amount must not be negative: {}", value);
    }

    let amount = parse_units(value, decimals)
        .map_err(|e| eyre::eyre!("Invalid amount {:?}: {}", value, e))?
        .get_absolute();
    if amount.is_zero() {
        eyre::bail!("Amount must be positive");
    }

    Ok(amount)
}

/// Render base units as a decimal amount in token units.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

pub async fn token_decimals<W: Wallet>(wallet: &W, token: Address) -> eyre::Result<u8> {
    Ok(read_contract(wallet, token, IERC20::decimalsCall {}).await?)
}

pub async fn show_balances<W>(
    monitor: &BalanceMonitor<W>,
    token: Address,
    owner: Address,
) -> eyre::Result<TokenSnapshot>
where
    W: Wallet + Clone,
{
    let snapshot = monitor.snapshot(token, owner).await?;

    info!(
        token = %snapshot.token,
        symbol = %snapshot.symbol,
        wallet = %format_amount(snapshot.token_balance, snapshot.decimals),
        bank = %format_amount(snapshot.bank_balance, snapshot.decimals),
        "Balances"
    );

    Ok(snapshot)
}

/// Execute an action unless it is already completed.
///
/// Returns `None` when there was nothing to do.
pub async fn run_action<A: Action>(action: &mut A) -> eyre::Result<Option<action::Result>> {
    let description = action.description();

    if action.is_completed().await? {
        info!(action = %description, "Already completed, nothing to do");
        return Ok(None);
    }

    info!(action = %description, "Executing");
    let result = action.execute().await?;

    info!(
        tx_hash = %result.tx_hash,
        block = ?result.block_number,
        gas_used = ?result.gas_used,
        "Action confirmed"
    );

    Ok(Some(result))
}

/// Project bank events from `from` up to `to` (latest block when absent),
/// handing every new entity to `emit` as soon as its range is scanned.
///
/// In follow mode keeps polling for new blocks until interrupted. A failed
/// poll is logged and retried on the next interval.
#[allow(clippy::too_many_arguments)]
pub async fn index<P, F>(
    scanner: &EventScanner<P>,
    store: &mut MemoryStore,
    from: u64,
    to: Option<u64>,
    follow: bool,
    poll_interval: Duration,
    metrics: &Metrics,
    mut emit: F,
) -> eyre::Result<ScanSummary>
where
    P: Provider + Clone,
    F: FnMut(&Entity),
{
    let to = match to {
        Some(to) => to,
        None => scanner.latest_block().await?,
    };

    let mut total = scan_and_emit(scanner, store, from, to, metrics, &mut emit).await?;

    if !follow {
        return Ok(total);
    }

    info!(bank = %scanner.bank(), next = to + 1, "Following new blocks");
    let mut last = to;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(last_block = last, "Stopping indexer");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        match poll_new_blocks(scanner, store, last, metrics, &mut emit).await {
            Ok(Some(summary)) => {
                last = summary.to;
                total.merge(summary);
                total.to = last;
            }
            Ok(None) => {}
            Err(e) => warn!(last_block = last, error = %e, "Poll failed, retrying"),
        }
    }

    Ok(total)
}

/// Scan the blocks after `last` up to the latest one.
///
/// Returns `None` when no block was added since `last`. On error nothing is
/// emitted and the same range is picked up by the next poll.
pub async fn poll_new_blocks<P, F>(
    scanner: &EventScanner<P>,
    store: &mut MemoryStore,
    last: u64,
    metrics: &Metrics,
    emit: &mut F,
) -> eyre::Result<Option<ScanSummary>>
where
    P: Provider + Clone,
    F: FnMut(&Entity),
{
    let latest = scanner.latest_block().await?;
    if latest <= last {
        return Ok(None);
    }

    let summary = scan_and_emit(scanner, store, last + 1, latest, metrics, emit).await?;
    Ok(Some(summary))
}

async fn scan_and_emit<P, F>(
    scanner: &EventScanner<P>,
    store: &mut MemoryStore,
    from: u64,
    to: u64,
    metrics: &Metrics,
    emit: &mut F,
) -> eyre::Result<ScanSummary>
where
    P: Provider + Clone,
    F: FnMut(&Entity),
{
    let summary = scanner.scan(from, to, store).await?;
    metrics.record_scan(&summary);

    for entity in store.in_blocks(from, to) {
        emit(entity);
    }

    Ok(summary)
}
