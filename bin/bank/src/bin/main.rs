//! Command line client for a TokenBank deployment.
//!
//! - `balances`: token, bank and allowance snapshot of the wallet
//! - `approve`: ERC20 approval of the bank or Permit2
//! - `deposit` / `withdraw`: plain bank transfers
//! - `deposit-permit2`: signature-based deposit through Permit2
//! - `index`: project bank events, optionally following new blocks

use action::{
    approve::{ApprovalAmount, ApproveAction},
    deposit::DepositAction,
    withdraw::WithdrawAction,
    FlowError, PermitDepositAction, PermitDepositFlow,
};
use alloy_primitives::Address;
use balance::BalanceMonitor;
use bank::{
    config::Config,
    format_amount, index,
    metrics::{install_prometheus_exporter, Metrics},
    parse_amount, run_action, show_balances, token_decimals,
};
use clap::{Parser, Subcommand, ValueEnum};
use client::Wallet;
use config::NetworkConfig;
use indexer::{EventScanner, MemoryStore};
use permit::PermitBuilder;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "bank")]
#[command(about = "Deposit into and withdraw from a TokenBank, and index its events")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show wallet, bank and allowance balances of a token
    Balances {
        #[arg(long)]
        token: Address,
    },

    /// Approve the bank or Permit2 to pull a token
    Approve {
        #[arg(long)]
        token: Address,

        /// Amount in token units; unlimited when omitted
        #[arg(long)]
        amount: Option<String>,

        #[arg(long, value_enum, default_value_t = Spender::Bank)]
        spender: Spender,
    },

    /// Deposit previously approved tokens
    Deposit {
        #[arg(long)]
        token: Address,

        /// Amount in token units
        #[arg(long)]
        amount: String,
    },

    /// Deposit with a Permit2 signature, approving Permit2 first if needed
    DepositPermit2 {
        #[arg(long)]
        token: Address,

        /// Amount in token units
        #[arg(long)]
        amount: String,
    },

    /// Withdraw tokens held by the bank
    Withdraw {
        #[arg(long)]
        token: Address,

        /// Amount in token units
        #[arg(long)]
        amount: String,
    },

    /// Project bank events into entities
    Index {
        /// First block; defaults to `indexer.start_block`
        #[arg(long)]
        from: Option<u64>,

        /// Last block; defaults to the latest block
        #[arg(long)]
        to: Option<u64>,

        /// Keep polling for new blocks
        #[arg(long)]
        follow: bool,
    },
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Balances { .. } => "balances",
            Self::Approve { .. } => "approve",
            Self::Deposit { .. } => "deposit",
            Self::DepositPermit2 { .. } => "deposit-permit2",
            Self::Withdraw { .. } => "withdraw",
            Self::Index { .. } => "index",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Spender {
    Bank,
    Permit2,
}

impl Spender {
    const fn address(self, network: &NetworkConfig) -> Address {
        match self {
            Self::Bank => network.token_bank,
            Self::Permit2 => network.permit2,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Permit2 => "permit2",
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::from_file(&cli.config)?;
    let network = config.network_config();

    info!("Loaded config:");
    info!("  Network: {}", config.network);
    info!("  Chain ID: {}", network.chain_id);
    info!("  TokenBank: {}", network.token_bank);
    info!("  Permit2: {}", network.permit2);

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!("  Metrics: 0.0.0.0:{}", port);
    }
    let metrics = Metrics::new();

    let name = cli.command.name();
    let result = dispatch(cli, &config, &network, &metrics).await;

    match result {
        Ok(()) => {
            metrics.record_action_success(name);
            Ok(())
        }
        Err(e) => {
            let kind = FlowError::kind_of(&e).map_or("other", |kind| kind.as_str());
            error!(command = name, kind, error = %e, "Command failed");
            metrics.record_action_failure(name, kind);
            std::process::exit(1);
        }
    }
}

/// Connect the configured wallet and run the command with it.
async fn dispatch(
    cli: Cli,
    config: &Config,
    network: &NetworkConfig,
    metrics: &Metrics,
) -> eyre::Result<()> {
    if let Command::Index { from, to, follow } = cli.command {
        let provider = client::create_provider(&config.rpc_url).await?;
        let scanner = EventScanner::new(provider, network.token_bank)
            .with_chunk_size(config.indexer.chunk_size);
        let mut store = MemoryStore::default();

        let from = from.unwrap_or(config.indexer.start_block);
        let summary = index(
            &scanner,
            &mut store,
            from,
            to,
            follow,
            config.poll_interval(),
            metrics,
            |entity| match serde_json::to_string(entity) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(id = %entity.id(), error = %e, "Failed to encode entity"),
            },
        )
        .await?;

        info!(
            from = summary.from,
            to = summary.to,
            projected = summary.projected,
            failed = summary.failed,
            "Indexing finished"
        );
        return Ok(());
    }

    let options = config.wallet_options();

    match (&config.signer_proxy_url, config.account) {
        (Some(proxy_url), Some(account)) => {
            info!("  Wallet: {} via signer proxy {}", account, proxy_url);
            let wallet = client::connect_remote_wallet(
                &config.rpc_url,
                proxy_url,
                account,
                network.chain_id,
                options,
            )
            .await?;
            run(cli.command, wallet, config, network, metrics).await
        }
        _ => {
            let Some(private_key) = cli.private_key.as_deref() else {
                eyre::bail!("Set --private-key / PRIVATE_KEY or configure a signer proxy");
            };
            let wallet = client::connect_local_wallet(&config.rpc_url, private_key, options)?;
            info!("  Wallet: {}", wallet.address());
            run(cli.command, wallet, config, network, metrics).await
        }
    }
}

async fn run<W>(
    command: Command,
    wallet: W,
    config: &Config,
    network: &NetworkConfig,
    metrics: &Metrics,
) -> eyre::Result<()>
where
    W: Wallet + Clone,
{
    let owner = wallet.address();
    let monitor = BalanceMonitor::new(wallet.clone(), network.token_bank, network.permit2);

    match command {
        Command::Balances { token } => {
            let snapshot = show_balances(&monitor, token, owner).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Approve {
            token,
            amount,
            spender,
        } => {
            let amount = match amount {
                Some(amount) => {
                    let decimals = token_decimals(&wallet, token).await?;
                    ApprovalAmount::Limited(parse_amount(&amount, decimals)?)
                }
                None => ApprovalAmount::Unlimited,
            };

            let mut action = ApproveAction::new(
                wallet,
                monitor,
                token,
                spender.address(network),
                amount,
            );
            if run_action(&mut action).await?.is_some() {
                metrics.record_approval(spender.as_str());
            }
        }
        Command::Deposit { token, amount } => {
            let decimals = token_decimals(&wallet, token).await?;
            let amount = parse_amount(&amount, decimals)?;

            let mut action = DepositAction::new(wallet, monitor, token, amount);
            run_action(&mut action).await?;
        }
        Command::DepositPermit2 { token, amount } => {
            let decimals = token_decimals(&wallet, token).await?;
            let amount = parse_amount(&amount, decimals)?;

            let permits = PermitBuilder::from_options(&config.permit)?;
            let flow = PermitDepositFlow::new(wallet, network, permits);
            let mut action = PermitDepositAction::new(flow, token, amount);
            run_action(&mut action).await?;

            if let Some(outcome) = action.outcome() {
                if outcome.approval.is_some() {
                    metrics.record_approval(Spender::Permit2.as_str());
                }
                info!(
                    nonce = %outcome.permit.message.nonce,
                    deadline = %outcome.permit.message.deadline,
                    wallet = %format_amount(outcome.after.token_balance, decimals),
                    bank = %format_amount(outcome.after.bank_balance, decimals),
                    verified = outcome.delta_verified,
                    "Permit2 deposit complete"
                );
            }
        }
        Command::Withdraw { token, amount } => {
            let decimals = token_decimals(&wallet, token).await?;
            let amount = parse_amount(&amount, decimals)?;

            let mut action = WithdrawAction::new(wallet, monitor, token, amount);
            run_action(&mut action).await?;
        }
        Command::Index { .. } => eyre::bail!("index does not take a wallet"),
    }

    Ok(())
}
