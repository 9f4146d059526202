// bot/src/client.rs
//! Capability interface of a chain client.
//!
//! Client generations disagree on how a pending deployment is confirmed and
//! where its address lives. A [`PendingDeployment`] advertises which shapes it
//! supports by returning `Some` from the matching probe, and the orchestrator
//! dispatches on those probes only.

use crate::artifact::Blueprint;
use crate::errors::ClientError;
use async_trait::async_trait;
use ethers::types::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Entry point for contract-creation transactions.
#[async_trait]
pub trait ChainClient: Send + Sync {
    type Pending: PendingDeployment;

    /// Sends the creation transaction. Errors mean the request was rejected outright.
    async fn submit_creation(&self, blueprint: &Blueprint) -> Result<Self::Pending, ClientError>;
}

/// Handle to an in-flight creation transaction.
pub trait PendingDeployment: Send + Sync {
    fn tx_hash(&self) -> TxHash;

    /// Address known at submission time, if this client shape attaches one.
    fn address(&self) -> Option<Address> {
        None
    }

    /// Current-generation "wait until deployed".
    fn wait_for_deployment(&self) -> Option<&dyn AwaitDeployment> {
        None
    }

    /// Older-generation "deployed" wait.
    fn deployed(&self) -> Option<&dyn AwaitDeployment> {
        None
    }

    /// Raw creation transaction that can be waited on for its receipt.
    fn deploy_transaction(&self) -> Option<&dyn AwaitReceipt> {
        None
    }

    /// Asynchronous address accessor.
    fn get_address(&self) -> Option<&dyn AddressAccessor> {
        None
    }
}

#[async_trait]
pub trait AwaitDeployment: Send + Sync {
    /// Suspends until deployed. `None` means the shape reports completion only.
    async fn wait(&self) -> Result<Option<Receipt>, ClientError>;
}

#[async_trait]
pub trait AwaitReceipt: Send + Sync {
    async fn wait(&self) -> Result<Receipt, ClientError>;
}

#[async_trait]
pub trait AddressAccessor: Send + Sync {
    async fn get(&self) -> Result<Address, ClientError>;
}

/// Minimal view of a mined creation receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub block_number: u64,
    pub success: bool,
    pub contract_address: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStrategy {
    DirectAwait,
    LegacyAwait,
    ReceiptWait,
}

impl std::fmt::Display for ConfirmationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfirmationStrategy::DirectAwait => "wait_for_deployment",
            ConfirmationStrategy::LegacyAwait => "deployed",
            ConfirmationStrategy::ReceiptWait => "deploy_transaction.wait",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Success,
    Reverted,
}

/// Evidence that the creation transaction was included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub strategy: ConfirmationStrategy,
    pub block_number: Option<u64>,
    pub status: ConfirmationStatus,
    pub contract_address: Option<Address>,
}

impl Confirmation {
    /// Confirmation from an await-style capability that reports nothing beyond completion.
    pub fn completed(strategy: ConfirmationStrategy) -> Self {
        Self {
            strategy,
            block_number: None,
            status: ConfirmationStatus::Success,
            contract_address: None,
        }
    }

    pub fn from_receipt(strategy: ConfirmationStrategy, receipt: Receipt) -> Self {
        Self {
            strategy,
            block_number: Some(receipt.block_number),
            status: if receipt.success { ConfirmationStatus::Success } else { ConfirmationStatus::Reverted },
            contract_address: receipt.contract_address,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ConfirmationStatus::Success
    }
}
