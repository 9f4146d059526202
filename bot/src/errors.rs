// bot/src/errors.rs

use ethers::types::TxHash;
use thiserror::Error;

/// Failures surfaced by the deployment orchestrator.
#[derive(Debug, Error)]
pub enum DeployError {
    /// No compiled artifact exists for the requested contract.
    #[error("Unknown contract '{name}': {reason}")]
    UnknownContract { name: String, reason: String },

    /// The client rejected the creation transaction outright.
    #[error("Submission of '{name}' failed: {source}")]
    SubmissionFailed {
        name: String,
        #[source]
        source: ClientError,
    },

    /// No confirmation strategy completed. The transaction may still land later.
    #[error("Deployment tx {tx_hash:?} unconfirmed: {reason}")]
    UnconfirmedDeployment { tx_hash: TxHash, reason: String },

    /// None of the address sources produced a usable address.
    #[error("Could not resolve deployed address for tx {tx_hash:?}")]
    AddressUnresolved { tx_hash: TxHash },
}

impl DeployError {
    /// Fatal errors abort `deploy`; `UnconfirmedDeployment` is only a warning.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DeployError::UnconfirmedDeployment { .. })
    }
}

/// Errors reported by chain client adapters and their capabilities.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Invalid deployment request: {0}")]
    InvalidRequest(String),
    #[error("Transaction {0:?} dropped from mempool")]
    Dropped(TxHash),
    #[error("No contract code at {0:?} after inclusion")]
    MissingCode(ethers::types::Address),
}
