//! USDCx Bridge CLI
//!
//! Prepares unsigned deposit/withdrawal descriptors, polls bridge
//! transaction status and reads balances. Results are printed as JSON on
//! stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::info;

use usdcx_bridge::{BridgeConfig, ChainAddress, ChainTag, TransactionStatus, UsdcxBridge};

#[derive(Parser)]
#[command(name = "usdcx-bridge")]
#[command(about = "Prepare and track USDC ⇄ USDCx bridge transactions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Environment file to load before reading configuration
    #[arg(long, global = true, default_value = ".env")]
    env_file: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare an Ethereum → Stacks deposit
    Deposit {
        /// Decimal USDC amount, e.g. 10.50
        amount: String,
        /// Stacks recipient principal
        recipient: String,
        /// Ethereum sender address
        sender: String,
    },

    /// Prepare a Stacks → Ethereum withdrawal
    Withdraw {
        /// Decimal USDCx amount, e.g. 5.00
        amount: String,
        /// Ethereum recipient address
        recipient: String,
        /// Stacks sender principal
        sender: String,
    },

    /// Poll the status of a broadcast bridge transaction
    Status {
        /// Chain the transaction was broadcast on (ethereum | stacks)
        chain: ChainTag,
        /// Transaction hash / id
        tx_id: String,

        /// JSON snapshot from a previous poll, used to detect regressions
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Read USDCx (Stacks) and/or USDC (Ethereum) balances
    Balances {
        #[arg(long)]
        stacks: Option<String>,

        #[arg(long)]
        evm: Option<String>,
    },

    /// Show the 32-byte bridge encoding of an address
    EncodeAddress {
        /// Chain the address belongs to (ethereum | stacks)
        chain: ChainTag,
        address: String,
    },
}

#[derive(Serialize)]
struct EncodedAddress {
    chain: ChainTag,
    address: String,
    bytes32: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Commands::EncodeAddress { chain, address } = &cli.command {
        let parsed = ChainAddress::parse(address, *chain)?;
        return print_json(&EncodedAddress {
            chain: *chain,
            address: parsed.to_string(),
            bytes32: format!("0x{}", hex::encode(parsed.to_bytes32())),
        });
    }

    let config = BridgeConfig::load_from_file(&cli.env_file)?;
    info!(
        network = %config.network,
        evm_rpc = %config.evm.rpc_url,
        stacks_api = %config.stacks.api_url,
        "Configuration loaded"
    );
    let bridge = UsdcxBridge::from_config(config)?;

    match cli.command {
        Commands::Deposit {
            amount,
            recipient,
            sender,
        } => {
            let descriptor = bridge.prepare_deposit(&amount, &recipient, &sender).await?;
            print_json(&descriptor)
        }
        Commands::Withdraw {
            amount,
            recipient,
            sender,
        } => {
            let descriptor = bridge
                .prepare_withdrawal(&amount, &recipient, &sender)
                .await?;
            print_json(&descriptor)
        }
        Commands::Status {
            chain,
            tx_id,
            previous,
        } => {
            let previous = previous.map(read_snapshot).transpose()?;
            let status = bridge
                .check_status(&tx_id, chain, previous.as_ref())
                .await?;
            print_json(&status)
        }
        Commands::Balances { stacks, evm } => {
            let balances = bridge
                .get_balances(stacks.as_deref(), evm.as_deref())
                .await?;
            print_json(&balances)
        }
        Commands::EncodeAddress { .. } => Ok(()),
    }
}

fn read_snapshot(path: PathBuf) -> Result<TransactionStatus> {
    let raw = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err("Snapshot is not a valid transaction status")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,usdcx_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
