// bot/src/ethers_client.rs
// Chain client backed by an ethers middleware stack.

use crate::artifact::Blueprint;
use crate::client::{AddressAccessor, AwaitDeployment, AwaitReceipt, ChainClient, PendingDeployment, Receipt};
use crate::errors::ClientError;
use async_trait::async_trait;
use ethers::{
    prelude::{Middleware, PendingTransaction},
    types::{
        transaction::eip2718::TypedTransaction, Address, BlockNumber, Eip1559TransactionRequest, TransactionReceipt,
        TxHash, U64,
    },
    utils::get_contract_address,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

fn rpc<E: std::fmt::Display>(e: E) -> ClientError {
    ClientError::Rpc(e.to_string())
}

#[derive(Debug)]
pub struct EthersClient<M> {
    client: Arc<M>,
    poll_interval: Duration,
    confirmations: usize,
}

impl<M: Middleware + 'static> EthersClient<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmations: 1,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    /// Creation calldata: bytecode followed by the (empty) constructor arguments.
    fn creation_data(blueprint: &Blueprint) -> Result<Vec<u8>, ClientError> {
        if blueprint.bytecode.is_empty() {
            return Err(ClientError::InvalidRequest(format!("{} has empty bytecode", blueprint.name)));
        }
        match blueprint.abi.constructor() {
            Some(ctor) => ctor
                .encode_input(blueprint.bytecode.to_vec(), &[])
                .map_err(|e| ClientError::InvalidRequest(format!("constructor encoding: {e}"))),
            None => Ok(blueprint.bytecode.to_vec()),
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClient for EthersClient<M> {
    type Pending = EthersPendingDeployment<M>;

    #[instrument(skip_all, fields(contract = %blueprint.name))]
    async fn submit_creation(&self, blueprint: &Blueprint) -> Result<Self::Pending, ClientError> {
        let data = Self::creation_data(blueprint)?;
        let from = self
            .client
            .default_sender()
            .ok_or_else(|| ClientError::InvalidRequest("middleware has no default sender".into()))?;
        let nonce = self
            .client
            .get_transaction_count(from, Some(BlockNumber::Pending.into()))
            .await
            .map_err(rpc)?;

        let tx: TypedTransaction = Eip1559TransactionRequest::new().from(from).data(data).nonce(nonce).into();
        let pending_tx = self.client.send_transaction(tx, None).await.map_err(rpc)?;
        let tx_hash = pending_tx.tx_hash();

        let address = get_contract_address(from, nonce);
        debug!(?tx_hash, ?address, %nonce, "Creation transaction accepted");

        let watch = Arc::new(ReceiptWatch {
            client: self.client.clone(),
            tx_hash,
            address,
            poll_interval: self.poll_interval,
            confirmations: self.confirmations,
        });
        Ok(EthersPendingDeployment {
            tx_hash,
            address,
            deployment: WaitForCode(watch.clone()),
            transaction: CreationTransaction(watch.clone()),
            accessor: ReceiptAddress(watch),
        })
    }
}

struct ReceiptWatch<M> {
    client: Arc<M>,
    tx_hash: TxHash,
    address: Address,
    poll_interval: Duration,
    confirmations: usize,
}

impl<M: Middleware + 'static> ReceiptWatch<M> {
    async fn receipt(&self) -> Result<Receipt, ClientError> {
        let receipt = PendingTransaction::new(self.tx_hash, self.client.provider())
            .interval(self.poll_interval)
            .confirmations(self.confirmations)
            .await
            .map_err(rpc)?
            .ok_or(ClientError::Dropped(self.tx_hash))?;
        to_receipt(&receipt)
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> Result<Receipt, ClientError> {
    let block_number = receipt
        .block_number
        .ok_or_else(|| ClientError::Rpc(format!("receipt for {:?} has no block number", receipt.transaction_hash)))?
        .as_u64();
    Ok(Receipt {
        block_number,
        // Pre-Byzantium receipts carry no status field.
        success: receipt.status.map_or(true, |s| s == U64::from(1)),
        contract_address: receipt.contract_address,
    })
}

/// Waits for inclusion, then checks that code exists at the predicted address.
pub struct WaitForCode<M>(Arc<ReceiptWatch<M>>);

#[async_trait]
impl<M: Middleware + 'static> AwaitDeployment for WaitForCode<M> {
    async fn wait(&self) -> Result<Option<Receipt>, ClientError> {
        let receipt = self.0.receipt().await?;
        if receipt.success {
            let address = receipt.contract_address.unwrap_or(self.0.address);
            let code = self.0.client.get_code(address, None).await.map_err(rpc)?;
            if code.is_empty() {
                return Err(ClientError::MissingCode(address));
            }
        }
        Ok(Some(receipt))
    }
}

/// The raw creation transaction.
pub struct CreationTransaction<M>(Arc<ReceiptWatch<M>>);

#[async_trait]
impl<M: Middleware + 'static> AwaitReceipt for CreationTransaction<M> {
    async fn wait(&self) -> Result<Receipt, ClientError> {
        self.0.receipt().await
    }
}

/// Reads the contract address from an already-mined receipt.
pub struct ReceiptAddress<M>(Arc<ReceiptWatch<M>>);

#[async_trait]
impl<M: Middleware + 'static> AddressAccessor for ReceiptAddress<M> {
    async fn get(&self) -> Result<Address, ClientError> {
        let receipt = self
            .0
            .client
            .get_transaction_receipt(self.0.tx_hash)
            .await
            .map_err(rpc)?
            .ok_or_else(|| ClientError::Rpc(format!("no receipt yet for {:?}", self.0.tx_hash)))?;
        receipt
            .contract_address
            .ok_or_else(|| ClientError::Rpc(format!("receipt for {:?} has no contract address", self.0.tx_hash)))
    }
}

/// Pending deployment as seen through ethers: the address is precomputed from
/// sender and nonce, and the tx can be awaited either for code or for its receipt.
pub struct EthersPendingDeployment<M> {
    tx_hash: TxHash,
    address: Address,
    deployment: WaitForCode<M>,
    transaction: CreationTransaction<M>,
    accessor: ReceiptAddress<M>,
}

impl<M: Middleware + 'static> PendingDeployment for EthersPendingDeployment<M> {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    fn wait_for_deployment(&self) -> Option<&dyn AwaitDeployment> {
        Some(&self.deployment)
    }

    fn deploy_transaction(&self) -> Option<&dyn AwaitReceipt> {
        Some(&self.transaction)
    }

    fn get_address(&self) -> Option<&dyn AddressAccessor> {
        Some(&self.accessor)
    }
}
