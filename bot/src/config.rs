// bot/src/config.rs

use dotenv::dotenv;
use eyre::{Result, WrapErr};
use std::{env, path::PathBuf, time::Duration};
use tracing::info;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";
pub const DEFAULT_CONTRACT_NAME: &str = "PatientRecordVerification";
pub const MAX_CONFIRMATION_TIMEOUT_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    // Network & Keys
    pub http_rpc_url: String,
    pub local_private_key: String,
    pub chain_id: Option<u64>,

    // Artifacts
    pub artifacts_dir: PathBuf,
    pub contract_name: String,

    // Confirmation
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub required_confirmations: usize,

    // Output
    pub deployment_record_path: Option<PathBuf>,
}

pub fn load_config() -> Result<Config> {
    dotenv().ok();
    let config = config_from_env()?;
    info!(rpc = %config.http_rpc_url, artifacts = %config.artifacts_dir.display(), "Configuration loaded");
    Ok(config)
}

/// Reads the process environment without touching `.env`.
pub fn config_from_env() -> Result<Config> {
    let optional_env = |var_name: &str| -> Option<String> { env::var(var_name).ok().filter(|s| !s.trim().is_empty()) };
    let parse_u64_env = |var_name: &str, default: u64| -> Result<u64> {
        match optional_env(var_name) {
            Some(s) => s.trim().parse::<u64>().wrap_err_with(|| format!("{var_name} must be an integer, got '{s}'")),
            None => Ok(default),
        }
    };

    // --- Load vars ---
    let http_rpc_url = optional_env("HTTP_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
    let local_private_key = env::var("LOCAL_PRIVATE_KEY").wrap_err("LOCAL_PRIVATE_KEY must be set")?;
    let chain_id = match optional_env("CHAIN_ID") {
        Some(s) => Some(s.trim().parse::<u64>().wrap_err("CHAIN_ID must be an integer")?),
        None => None,
    };
    let artifacts_dir = PathBuf::from(optional_env("ARTIFACTS_DIR").unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.into()));
    let contract_name = optional_env("CONTRACT_NAME").unwrap_or_else(|| DEFAULT_CONTRACT_NAME.into());
    let confirmation_timeout = Duration::from_secs(parse_u64_env("CONFIRMATION_TIMEOUT_SECS", 120)?);
    let receipt_poll_interval = Duration::from_millis(parse_u64_env("RECEIPT_POLL_INTERVAL_MS", 1000)?);
    let required_confirmations = parse_u64_env("REQUIRED_CONFIRMATIONS", 1)? as usize;
    let deployment_record_path = optional_env("DEPLOYMENT_RECORD_PATH").map(PathBuf::from);

    if confirmation_timeout.is_zero() {
        eyre::bail!("CONFIRMATION_TIMEOUT_SECS must be greater than zero");
    }
    if confirmation_timeout.as_secs() > MAX_CONFIRMATION_TIMEOUT_SECS {
        eyre::bail!("CONFIRMATION_TIMEOUT_SECS must be at most {MAX_CONFIRMATION_TIMEOUT_SECS}");
    }

    Ok(Config {
        http_rpc_url,
        local_private_key,
        chain_id,
        artifacts_dir,
        contract_name,
        confirmation_timeout,
        receipt_poll_interval,
        required_confirmations,
        deployment_record_path,
    })
}
