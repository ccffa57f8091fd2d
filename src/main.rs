// src/main.rs
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, U256};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use relay_interactor::contracts::parse_address;
use relay_interactor::types::DEFAULT_GTX_DATA_NON_ZERO;
use relay_interactor::{BlockRange, ContractInteractor, InteractorConfig, RelayRequest};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(long, env = "ETH_RPC_URL", default_value = "http://127.0.0.1:8545")]
    eth_rpc_url: String,

    #[clap(long, env = "RELAY_HUB_ADDRESS")]
    relay_hub_address: String,

    #[clap(long, env = "STAKE_MANAGER_ADDRESS")]
    stake_manager_address: String,

    #[clap(long, env = "GTX_DATA_NON_ZERO", default_value_t = DEFAULT_GTX_DATA_NON_ZERO)]
    gtx_data_non_zero: u64,

    #[clap(long, default_value = "info")]
    log_level: Level,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print chain id, network id, network type and signing profile
    ChainInfo,
    /// Simulate a relay call against the hub's acceptance check
    Validate {
        #[clap(long)]
        request: PathBuf,
        #[clap(long)]
        signature: String,
        #[clap(long, default_value = "0x")]
        approval_data: String,
        /// Relay call gas limit; defaults to the request's own gas limit
        #[clap(long)]
        gas_limit: Option<u64>,
    },
    /// Print relay hub events in node order
    HubEvents(EventArgs),
    /// Print stake manager events in node order
    StakeEvents(EventArgs),
    /// Print the worst-case gas bound for a paymaster
    MaxGas {
        #[clap(long)]
        paymaster: String,
        #[clap(long)]
        relay_call_gas_limit: u64,
        #[clap(long)]
        calldata_size: u64,
    },
}

#[derive(clap::Args, Debug)]
struct EventArgs {
    #[clap(long = "event", required = true)]
    events: Vec<String>,
    /// Values of the first indexed parameter to match
    #[clap(long = "address")]
    addresses: Vec<String>,
    #[clap(long)]
    from_block: Option<u64>,
    #[clap(long)]
    to_block: Option<u64>,
}

impl EventArgs {
    fn names(&self) -> Vec<&str> {
        self.events.iter().map(String::as_str).collect()
    }

    fn range(&self) -> BlockRange {
        BlockRange::new(self.from_block, self.to_block)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = InteractorConfig {
        relay_hub_address: parse_address(&args.relay_hub_address)?,
        stake_manager_address: parse_address(&args.stake_manager_address)?,
        gtx_data_non_zero: args.gtx_data_non_zero,
    };
    let provider = Provider::<Http>::try_from(args.eth_rpc_url.as_str())?;
    let mut interactor = ContractInteractor::new(Arc::new(provider), config);

    match args.command {
        Command::ChainInfo => {
            interactor.init().await?;
            println!("{}", serde_json::to_string_pretty(interactor.chain_info()?)?);
        }
        Command::Validate {
            request,
            signature,
            approval_data,
            gas_limit,
        } => {
            let contents = std::fs::read_to_string(&request)
                .with_context(|| format!("reading relay request {}", request.display()))?;
            let relay_request: RelayRequest = serde_json::from_str(&contents)?;
            let signature = parse_hex_bytes(&signature).context("invalid signature")?;
            let approval_data = parse_hex_bytes(&approval_data).context("invalid approval data")?;

            let outcome = match gas_limit {
                Some(limit) => {
                    interactor
                        .validate_relay_call_with_gas_limit(
                            U256::from(limit),
                            &relay_request,
                            &signature,
                            &approval_data,
                        )
                        .await
                }
                None => {
                    interactor
                        .validate_relay_call(&relay_request, &signature, &approval_data)
                        .await
                }
            };
            info!("Validation finished, reverted: {}", outcome.reverted());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::HubEvents(event_args) => {
            let events = interactor
                .get_past_events_for_hub(&event_args.names(), &event_args.addresses, event_args.range())
                .await?;
            for found in events {
                println!("{} {:?}", serde_json::to_string(&found.meta)?, found.event);
            }
        }
        Command::StakeEvents(event_args) => {
            let events = interactor
                .get_past_events_for_stake_manager(
                    &event_args.names(),
                    &event_args.addresses,
                    event_args.range(),
                )
                .await?;
            for found in events {
                println!("{} {:?}", serde_json::to_string(&found.meta)?, found.event);
            }
        }
        Command::MaxGas {
            paymaster,
            relay_call_gas_limit,
            calldata_size,
        } => {
            let paymaster: Address = parse_address(&paymaster)?;
            let gas = interactor
                .max_possible_gas_for(
                    paymaster,
                    U256::from(relay_call_gas_limit),
                    U256::from(calldata_size),
                )
                .await?;
            println!("{}", gas);
        }
    }

    Ok(())
}

fn parse_hex_bytes(value: &str) -> anyhow::Result<Bytes> {
    let trimmed = value.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(Bytes::from(hex::decode(hex_part)?))
}
