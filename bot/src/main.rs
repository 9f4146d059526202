// bot/src/main.rs

use clap::Parser;
use contract_deployer::{
    config::load_config, exit_code, ArtifactStore, Deployer, DeploymentStatus, EthersClient,
};
use ethers::prelude::*;
use eyre::{Result, WrapErr};
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Deploys a compiled contract and confirms it on-chain", long_about = None)]
struct Cli {
    /// Contract to deploy (bare name or `contracts/Foo.sol:Foo`). Defaults to CONTRACT_NAME.
    #[arg(value_name = "CONTRACT")]
    contract: Option<String>,

    /// Write the deployment outcome as JSON to this path.
    #[arg(long = "record", value_name = "PATH")]
    record: Option<PathBuf>,
}

fn setup_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let config = load_config()?;
    let contract_name = cli.contract.unwrap_or_else(|| config.contract_name.clone());

    // Setup Provider & Client
    let provider = Provider::<Http>::try_from(config.http_rpc_url.as_str())
        .wrap_err_with(|| format!("Invalid RPC url {}", config.http_rpc_url))?
        .interval(config.receipt_poll_interval);
    let chain_id = match config.chain_id {
        Some(id) => id,
        None => provider.get_chainid().await.wrap_err("Failed to query chain id")?.as_u64(),
    };
    let wallet = config
        .local_private_key
        .parse::<LocalWallet>()
        .wrap_err("LOCAL_PRIVATE_KEY is not a valid private key")?
        .with_chain_id(chain_id);
    info!(chain_id, deployer = ?wallet.address(), "Provider & client setup complete");
    let client = Arc::new(SignerMiddleware::new(provider, wallet));

    let chain = EthersClient::new(client)
        .with_poll_interval(config.receipt_poll_interval)
        .with_confirmations(config.required_confirmations);
    let deployer = Deployer::new(ArtifactStore::new(&config.artifacts_dir), chain)
        .with_confirmation_timeout(config.confirmation_timeout);

    info!(contract = %contract_name, "Deploying contract...");
    let result = deployer.deploy(&contract_name).await;

    match &result {
        Ok(outcome) => {
            match outcome.status {
                DeploymentStatus::Succeeded => {
                    info!(address = ?outcome.address, block = ?outcome.block_number(), "{} deployed", outcome.contract)
                }
                DeploymentStatus::Unconfirmed => warn!(
                    address = ?outcome.address,
                    tx_hash = ?outcome.tx_hash,
                    "{} submitted but not confirmed; check the transaction before relying on it",
                    outcome.contract
                ),
                DeploymentStatus::Failed => {
                    error!(tx_hash = ?outcome.tx_hash, "{} deployment reverted", outcome.contract)
                }
            }
            println!("{:?}", outcome.address);

            if let Some(path) = cli.record.or_else(|| config.deployment_record_path.clone()) {
                outcome.write_record(&path)?;
            }
        }
        Err(e) => error!("Error during deployment: {e}"),
    }

    std::process::exit(exit_code(&result));
}
