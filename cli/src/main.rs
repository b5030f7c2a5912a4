//! `shiptrack`: command-line front end for the shipment ledger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use shiptrack_client::{ClientConfig, CreatePayload, LedgerClient, LocalEngine, TransitionPayload};
use shiptrack_ledger::LedgerEvent;
use shiptrack_session::{FixedProbe, Negotiator, StaticProvider};
use shiptrack_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use shiptrack_types::{AccountId, Amount, NetworkId, SystemClock, Timestamp};
use shiptrack_utils::{format_duration, init_logging, transit_secs, LogFormat};

#[derive(Parser)]
#[command(name = "shiptrack", about = "Shipment ledger client")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Network profile: "localhost" or "polygon_amoy".
    #[arg(long, global = true, env = "SHIPTRACK_NETWORK")]
    network: Option<NetworkId>,

    /// Data directory for the local ledger.
    #[arg(long, global = true, env = "SHIPTRACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "SHIPTRACK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "SHIPTRACK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Seconds to wait for account authorization before giving up.
    #[arg(long, global = true, env = "SHIPTRACK_NEGOTIATION_TIMEOUT")]
    negotiation_timeout: Option<u64>,

    /// Development account to act as; repeat to expose several, the first
    /// is active.
    #[arg(long = "account", global = true, env = "SHIPTRACK_ACCOUNT", value_delimiter = ',')]
    accounts: Vec<AccountId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    #[command(flatten)]
    Ledger(LedgerCommand),
    /// Print the effective configuration.
    Config,
}

/// Commands that need the ledger open.
#[derive(clap::Subcommand)]
enum LedgerCommand {
    /// Create a shipment, escrowing its price.
    Create {
        #[arg(long)]
        receiver: AccountId,
        /// Pickup time in Unix seconds (defaults to now).
        #[arg(long)]
        pickup_time: Option<u64>,
        #[arg(long)]
        distance: u64,
        /// Price in display units, e.g. "0.25".
        #[arg(long)]
        price: Amount,
        /// Value to attach (defaults to the price).
        #[arg(long)]
        value: Option<Amount>,
    },
    /// Mark one of your shipments as picked up.
    Start {
        #[arg(long)]
        receiver: AccountId,
        #[arg(long)]
        index: u64,
    },
    /// Deliver one of your shipments and collect its price.
    Complete {
        #[arg(long)]
        receiver: AccountId,
        #[arg(long)]
        index: u64,
    },
    /// Show one of your shipments.
    Get {
        #[arg(long)]
        index: u64,
    },
    /// List every shipment in creation order.
    List,
    /// Count shipments of an account (yours by default).
    Count {
        #[arg(long)]
        of: Option<AccountId>,
    },
    /// Show the paid-out balance of an account (yours by default).
    Balance {
        #[arg(long)]
        of: Option<AccountId>,
    },
}

/// Layer CLI flags and env vars over the config file (or defaults).
fn resolve_config(cli: &Cli, file: Option<ClientConfig>) -> ClientConfig {
    let base = file.unwrap_or_default();
    ClientConfig {
        network: cli.network.unwrap_or(base.network),
        data_dir: cli.data_dir.clone().unwrap_or_else(|| base.data_dir.clone()),
        log_level: cli.log_level.clone().unwrap_or_else(|| base.log_level.clone()),
        log_format: cli.log_format.unwrap_or(base.log_format),
        negotiation_timeout_secs: cli.negotiation_timeout.or(base.negotiation_timeout_secs),
        ..base
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match cli.config.as_deref() {
        Some(path) => Some(ClientConfig::from_toml_file(path)?),
        None => None,
    };
    let config = resolve_config(&cli, file_config);
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Config => print_config(&config),
        Command::Ledger(command) => {
            let (client, negotiator) = open_client(&config, cli.accounts).await?;
            let result = run(&client, command).await;
            negotiator.shutdown();
            result
        }
    }
}

fn print_config(config: &ClientConfig) -> anyhow::Result<()> {
    print_json(&json!({
        "network": config.network,
        "chain_id": config.chain_id(),
        "rpc_url": config.effective_rpc_url(),
        "contract_address": config.effective_contract_address(),
        "data_dir": config.data_dir,
        "map_size_mb": config.map_size_mb,
        "negotiation_timeout_secs": config.negotiation_timeout_secs,
        "log_format": config.log_format,
        "log_level": config.log_level,
    }))
}

/// Open the local ledger and put a negotiator over the development accounts
/// in front of it.
async fn open_client(
    config: &ClientConfig,
    accounts: Vec<AccountId>,
) -> anyhow::Result<(LedgerClient, Arc<Negotiator>)> {
    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;
    let report = check_integrity(env.env())?;
    for error in &report.errors {
        tracing::warn!(error = %error, "ledger integrity check failed");
    }
    tracing::debug!(
        network = %config.network,
        chain_id = config.chain_id(),
        entries = report.total_entries,
        "ledger opened"
    );

    let engine = Arc::new(LocalEngine::new(
        Arc::new(env.shipment_store()),
        Arc::new(env.balance_store()),
        Arc::new(SystemClock),
    )?);
    engine
        .subscribe(Box::new(|event: &LedgerEvent| {
            tracing::info!(event = event.name(), "ledger event");
        }))
        .await;

    let provider = Arc::new(StaticProvider::new(accounts));
    let negotiator = Arc::new(Negotiator::new(Arc::new(FixedProbe::injected(provider))));
    let mut client = LedgerClient::new(Arc::clone(&negotiator), engine);
    if let Some(timeout) = config.negotiation_timeout() {
        client = client.with_negotiation_timeout(timeout);
    }
    Ok((client, negotiator))
}

async fn run(client: &LedgerClient, command: LedgerCommand) -> anyhow::Result<()> {
    match command {
        LedgerCommand::Create {
            receiver,
            pickup_time,
            distance,
            price,
            value,
        } => {
            let pickup_time = pickup_time.map(Timestamp::new).unwrap_or_else(Timestamp::now);
            let receipt = client
                .create(CreatePayload {
                    receiver,
                    pickup_time,
                    distance,
                    price,
                    value,
                })
                .await?;
            print_json(&receipt)
        }
        LedgerCommand::Start { receiver, index } => {
            print_json(&client.start(TransitionPayload { receiver, index }).await?)
        }
        LedgerCommand::Complete { receiver, index } => {
            print_json(&client.complete(TransitionPayload { receiver, index }).await?)
        }
        LedgerCommand::Get { index } => match client.read(index).await? {
            Some(shipment) => {
                let transit = transit_secs(shipment.pickup_time, shipment.delivery_time).map(format_duration);
                print_json(&json!({ "shipment": shipment, "transit": transit }))
            }
            None => anyhow::bail!("no account available; pass --account"),
        },
        LedgerCommand::List => print_json(&client.list_all().await?),
        LedgerCommand::Count { of } => {
            let count = match of {
                Some(account) => client.count(&account).await?,
                None => client.my_count().await?,
            };
            print_json(&json!({ "count": count }))
        }
        LedgerCommand::Balance { of } => {
            let account = match of {
                Some(account) => account,
                None => client
                    .current_account()
                    .await
                    .context("no account available; pass --account or --of")?,
            };
            let balance = client.balance_of(&account).await?;
            print_json(&json!({ "account": account, "balance": balance.to_string() }))
        }
    }
}
