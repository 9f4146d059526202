// bot/src/orchestrator.rs
//! Submission, cascading confirmation and address resolution for one deployment.

use crate::artifact::{Blueprint, BlueprintSource};
use crate::client::{
    AwaitDeployment, AwaitReceipt, ChainClient, Confirmation, ConfirmationStrategy, PendingDeployment,
};
use crate::errors::DeployError;
use crate::outcome::{DeploymentOutcome, DeploymentStatus};
use ethers::types::Address;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

// Stand-in deadline for limits that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit).unwrap_or_else(|| now + FAR_FUTURE)
}

pub struct Deployer<F, C> {
    factory: F,
    client: C,
    confirmation_timeout: Duration,
}

impl<F: BlueprintSource, C: ChainClient> Deployer<F, C> {
    pub fn new(factory: F, client: C) -> Self {
        Self { factory, client, confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT }
    }

    /// Upper bound on the whole confirmation cascade, and on the async address accessor.
    pub fn with_confirmation_timeout(mut self, confirmation_timeout: Duration) -> Self {
        self.confirmation_timeout = confirmation_timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    #[instrument(skip_all, fields(contract = %blueprint.name))]
    pub async fn submit(&self, blueprint: &Blueprint) -> Result<C::Pending, DeployError> {
        info!(bytecode_len = blueprint.bytecode.len(), "Sending deployment transaction...");
        let pending = self
            .client
            .submit_creation(blueprint)
            .await
            .map_err(|source| DeployError::SubmissionFailed { name: blueprint.name.clone(), source })?;
        info!(tx_hash = ?pending.tx_hash(), "Deployment transaction submitted");
        Ok(pending)
    }

    pub async fn confirm(&self, pending: &C::Pending) -> Result<Confirmation, DeployError> {
        confirm(pending, self.confirmation_timeout).await
    }

    pub async fn resolve_address(
        &self,
        pending: &C::Pending,
        confirmation: Option<&Confirmation>,
    ) -> Result<Address, DeployError> {
        resolve_address(pending, confirmation, self.confirmation_timeout).await
    }

    /// Factory lookup, submission, best-effort confirmation, then address resolution.
    #[instrument(skip(self))]
    pub async fn deploy(&self, contract_name: &str) -> Result<DeploymentOutcome, DeployError> {
        let blueprint = self.factory.get_factory(contract_name)?;
        let pending = self.submit(&blueprint).await?;

        // `confirm` only fails with `UnconfirmedDeployment`.
        let confirmation = match self.confirm(&pending).await {
            Ok(confirmation) => Some(confirmation),
            Err(e) => {
                warn!(error = %e, "Could not confirm deployment, continuing with address resolution");
                None
            }
        };

        let address = self.resolve_address(&pending, confirmation.as_ref()).await?;

        let status = match &confirmation {
            Some(c) if c.succeeded() => DeploymentStatus::Succeeded,
            Some(c) => {
                warn!(block = ?c.block_number, "Deployment transaction reverted");
                DeploymentStatus::Failed
            }
            None => DeploymentStatus::Unconfirmed,
        };

        info!(?address, ?status, "{} deployed", blueprint.name);
        Ok(DeploymentOutcome {
            contract: blueprint.name,
            address,
            tx_hash: pending.tx_hash(),
            status,
            confirmation,
        })
    }
}

enum Probe<'a> {
    Await(&'a dyn AwaitDeployment),
    Receipt(&'a dyn AwaitReceipt),
}

/// Runs the confirmation strategies in priority order until one completes.
///
/// A strategy that errors demotes to the next available one. All strategies
/// share a single deadline; once it passes, the cascade stops with
/// `UnconfirmedDeployment`.
#[instrument(skip_all, fields(tx_hash = ?pending.tx_hash()))]
pub async fn confirm<P>(pending: &P, limit: Duration) -> Result<Confirmation, DeployError>
where
    P: PendingDeployment + ?Sized,
{
    let tx_hash = pending.tx_hash();
    let deadline = deadline_after(limit);
    let probes = [
        (ConfirmationStrategy::DirectAwait, pending.wait_for_deployment().map(Probe::Await)),
        (ConfirmationStrategy::LegacyAwait, pending.deployed().map(Probe::Await)),
        (ConfirmationStrategy::ReceiptWait, pending.deploy_transaction().map(Probe::Receipt)),
    ];

    let mut failures = Vec::new();
    for (strategy, probe) in probes {
        let Some(probe) = probe else {
            debug!(%strategy, "Confirmation capability not exposed");
            continue;
        };

        info!(%strategy, "Waiting for deployment...");
        let attempt = async {
            match probe {
                Probe::Await(awaiter) => awaiter.wait().await,
                Probe::Receipt(tx) => tx.wait().await.map(Some),
            }
        };

        match timeout_at(deadline, attempt).await {
            Ok(Ok(receipt)) => {
                let confirmation = match receipt {
                    Some(receipt) => Confirmation::from_receipt(strategy, receipt),
                    None => Confirmation::completed(strategy),
                };
                info!(%strategy, block = ?confirmation.block_number, "Deployment confirmed");
                return Ok(confirmation);
            }
            Ok(Err(e)) => {
                warn!(%strategy, error = %e, "Confirmation strategy failed, falling back");
                failures.push(format!("{strategy}: {e}"));
            }
            Err(_) => {
                warn!(%strategy, ?limit, "Confirmation deadline reached");
                return Err(DeployError::UnconfirmedDeployment {
                    tx_hash,
                    reason: format!("no confirmation within {limit:?} ({strategy} still pending)"),
                });
            }
        }
    }

    let reason = if failures.is_empty() {
        "client exposes no confirmation capability".to_string()
    } else {
        failures.join("; ")
    };
    Err(DeployError::UnconfirmedDeployment { tx_hash, reason })
}

/// Resolves the deployed address: direct field, then async accessor, then the confirmation.
#[instrument(skip_all, fields(tx_hash = ?pending.tx_hash()))]
pub async fn resolve_address<P>(
    pending: &P,
    confirmation: Option<&Confirmation>,
    limit: Duration,
) -> Result<Address, DeployError>
where
    P: PendingDeployment + ?Sized,
{
    if let Some(address) = pending.address().filter(|a| !a.is_zero()) {
        debug!(?address, "Using address attached to pending deployment");
        return Ok(address);
    }

    if let Some(accessor) = pending.get_address() {
        match timeout(limit, accessor.get()).await {
            Ok(Ok(address)) if !address.is_zero() => {
                debug!(?address, "Resolved address via accessor");
                return Ok(address);
            }
            Ok(Ok(_)) => warn!("Address accessor returned the zero address"),
            Ok(Err(e)) => warn!(error = %e, "Address accessor failed"),
            Err(_) => warn!(?limit, "Address accessor timed out"),
        }
    }

    if let Some(address) = confirmation.and_then(|c| c.contract_address).filter(|a| !a.is_zero()) {
        debug!(?address, "Using address from confirmation");
        return Ok(address);
    }

    Err(DeployError::AddressUnresolved { tx_hash: pending.tx_hash() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AddressAccessor, ConfirmationStatus, Receipt};
    use crate::errors::ClientError;
    use async_trait::async_trait;
    use ethers::types::TxHash;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Step {
        calls: AtomicUsize,
        fail: bool,
        hang: bool,
        receipt: Option<Receipt>,
    }

    impl Step {
        fn ok() -> Self {
            Self::default()
        }
        fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }
        fn hanging() -> Self {
            Self { hang: true, ..Self::default() }
        }
        fn with_receipt(receipt: Receipt) -> Self {
            Self { receipt: Some(receipt), ..Self::default() }
        }
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
        async fn run(&self) -> Result<Option<Receipt>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(ClientError::Rpc("boom".into()));
            }
            Ok(self.receipt)
        }
    }

    #[async_trait]
    impl AwaitDeployment for Step {
        async fn wait(&self) -> Result<Option<Receipt>, ClientError> {
            self.run().await
        }
    }

    #[async_trait]
    impl AwaitReceipt for Step {
        async fn wait(&self) -> Result<Receipt, ClientError> {
            self.run().await?.ok_or_else(|| ClientError::Rpc("no receipt".into()))
        }
    }

    struct Accessor {
        calls: AtomicUsize,
        hang: bool,
        result: Option<Address>,
    }

    impl Accessor {
        fn returning(result: Option<Address>) -> Self {
            Self { calls: AtomicUsize::new(0), hang: false, result }
        }
        fn hanging() -> Self {
            Self { calls: AtomicUsize::new(0), hang: true, result: None }
        }
    }

    #[async_trait]
    impl AddressAccessor for Accessor {
        async fn get(&self) -> Result<Address, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.result.ok_or_else(|| ClientError::Rpc("getAddress unavailable".into()))
        }
    }

    #[derive(Default)]
    struct Pending {
        address: Option<Address>,
        direct: Option<Step>,
        legacy: Option<Step>,
        receipt: Option<Step>,
        accessor: Option<Accessor>,
    }

    impl PendingDeployment for Pending {
        fn tx_hash(&self) -> TxHash {
            TxHash::repeat_byte(0x01)
        }
        fn address(&self) -> Option<Address> {
            self.address
        }
        fn wait_for_deployment(&self) -> Option<&dyn AwaitDeployment> {
            self.direct.as_ref().map(|s| s as &dyn AwaitDeployment)
        }
        fn deployed(&self) -> Option<&dyn AwaitDeployment> {
            self.legacy.as_ref().map(|s| s as &dyn AwaitDeployment)
        }
        fn deploy_transaction(&self) -> Option<&dyn AwaitReceipt> {
            self.receipt.as_ref().map(|s| s as &dyn AwaitReceipt)
        }
        fn get_address(&self) -> Option<&dyn AddressAccessor> {
            self.accessor.as_ref().map(|a| a as &dyn AddressAccessor)
        }
    }

    const LIMIT: Duration = Duration::from_secs(5);

    fn receipt(block: u64) -> Receipt {
        Receipt { block_number: block, success: true, contract_address: None }
    }

    #[tokio::test]
    async fn direct_await_alone_is_used() {
        let pending = Pending { direct: Some(Step::ok()), ..Default::default() };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::DirectAwait);
        assert_eq!(c.block_number, None);
        assert_eq!(pending.direct.as_ref().unwrap().calls(), 1);
    }

    #[tokio::test]
    async fn legacy_await_alone_is_used() {
        let pending = Pending { legacy: Some(Step::ok()), ..Default::default() };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::LegacyAwait);
        assert_eq!(pending.legacy.as_ref().unwrap().calls(), 1);
    }

    #[tokio::test]
    async fn receipt_wait_alone_reports_block() {
        let pending = Pending { receipt: Some(Step::with_receipt(receipt(7))), ..Default::default() };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::ReceiptWait);
        assert_eq!(c.block_number, Some(7));
    }

    #[tokio::test]
    async fn first_successful_strategy_stops_the_cascade() {
        let pending = Pending {
            direct: Some(Step::ok()),
            legacy: Some(Step::ok()),
            receipt: Some(Step::with_receipt(receipt(3))),
            ..Default::default()
        };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::DirectAwait);
        assert_eq!(pending.legacy.as_ref().unwrap().calls(), 0);
        assert_eq!(pending.receipt.as_ref().unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn failing_strategy_demotes_to_next() {
        let pending = Pending {
            direct: Some(Step::failing()),
            legacy: Some(Step::failing()),
            receipt: Some(Step::with_receipt(receipt(9))),
            ..Default::default()
        };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::ReceiptWait);
        assert_eq!(c.block_number, Some(9));
        assert_eq!(pending.direct.as_ref().unwrap().calls(), 1);
        assert_eq!(pending.legacy.as_ref().unwrap().calls(), 1);
    }

    #[tokio::test]
    async fn no_capability_is_unconfirmed() {
        let err = confirm(&Pending::default(), LIMIT).await.unwrap_err();
        assert!(matches!(err, DeployError::UnconfirmedDeployment { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn all_strategies_failing_is_unconfirmed() {
        let pending = Pending { direct: Some(Step::failing()), receipt: Some(Step::failing()), ..Default::default() };
        let err = confirm(&pending, LIMIT).await.unwrap_err();
        match err {
            DeployError::UnconfirmedDeployment { reason, .. } => {
                assert!(reason.contains("wait_for_deployment"));
                assert!(reason.contains("deploy_transaction.wait"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_stops_a_hanging_strategy() {
        let pending = Pending {
            direct: Some(Step::hanging()),
            receipt: Some(Step::with_receipt(receipt(1))),
            ..Default::default()
        };
        let err = confirm(&pending, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, DeployError::UnconfirmedDeployment { .. }));
        assert_eq!(pending.receipt.as_ref().unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn reverted_receipt_still_completes_the_cascade() {
        let reverted = Receipt { block_number: 5, success: false, contract_address: None };
        let pending = Pending { receipt: Some(Step::with_receipt(reverted)), ..Default::default() };
        let c = confirm(&pending, LIMIT).await.unwrap();
        assert_eq!(c.status, ConfirmationStatus::Reverted);
        assert!(!c.succeeded());
    }

    #[tokio::test]
    async fn direct_address_skips_accessor() {
        let direct = Address::repeat_byte(0xaa);
        let pending = Pending {
            address: Some(direct),
            accessor: Some(Accessor::returning(Some(Address::repeat_byte(0xbb)))),
            ..Default::default()
        };
        assert_eq!(resolve_address(&pending, None, LIMIT).await.unwrap(), direct);
        assert_eq!(pending.accessor.as_ref().unwrap().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accessor_used_when_no_direct_address() {
        let expected = Address::repeat_byte(0xbb);
        let pending = Pending {
            address: Some(Address::zero()),
            accessor: Some(Accessor::returning(Some(expected))),
            ..Default::default()
        };
        assert_eq!(resolve_address(&pending, None, LIMIT).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn confirmation_address_is_last_resort() {
        let expected = Address::repeat_byte(0xcc);
        let pending = Pending {
            accessor: Some(Accessor::returning(None)),
            ..Default::default()
        };
        let confirmation = Confirmation {
            contract_address: Some(expected),
            ..Confirmation::completed(ConfirmationStrategy::ReceiptWait)
        };
        assert_eq!(resolve_address(&pending, Some(&confirmation), LIMIT).await.unwrap(), expected);
        assert_eq!(pending.accessor.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nothing_to_resolve_is_fatal() {
        let err = resolve_address(&Pending::default(), None, LIMIT).await.unwrap_err();
        assert!(matches!(err, DeployError::AddressUnresolved { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unbounded_limit_does_not_overflow_deadline() {
        let pending = Pending { direct: Some(Step::ok()), ..Default::default() };
        let c = confirm(&pending, Duration::MAX).await.unwrap();
        assert_eq!(c.strategy, ConfirmationStrategy::DirectAwait);

        let err = confirm(&Pending::default(), Duration::from_secs(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, DeployError::UnconfirmedDeployment { .. }));
    }

    #[tokio::test]
    async fn zero_address_from_accessor_falls_back_to_confirmation() {
        let expected = Address::repeat_byte(0xdd);
        let pending = Pending { accessor: Some(Accessor::returning(Some(Address::zero()))), ..Default::default() };
        let confirmation = Confirmation {
            contract_address: Some(expected),
            ..Confirmation::completed(ConfirmationStrategy::DirectAwait)
        };
        assert_eq!(resolve_address(&pending, Some(&confirmation), LIMIT).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn hanging_accessor_is_bounded_by_limit() {
        let expected = Address::repeat_byte(0xee);
        let pending = Pending { accessor: Some(Accessor::hanging()), ..Default::default() };
        let confirmation = Confirmation {
            contract_address: Some(expected),
            ..Confirmation::completed(ConfirmationStrategy::ReceiptWait)
        };
        let limit = Duration::from_millis(50);

        assert_eq!(resolve_address(&pending, Some(&confirmation), limit).await.unwrap(), expected);

        let err = resolve_address(&pending, None, limit).await.unwrap_err();
        assert!(matches!(err, DeployError::AddressUnresolved { .. }));
        assert_eq!(pending.accessor.as_ref().unwrap().calls.load(Ordering::SeqCst), 2);
    }
}
