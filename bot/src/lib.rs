// bot/src/lib.rs
// Library interface shared by the binary and the integration tests.

pub mod artifact;
pub mod client;
pub mod config;
pub mod errors;
pub mod ethers_client;
pub mod orchestrator;
pub mod outcome;

// Public types re-exported for convenience
pub use artifact::{ArtifactStore, Blueprint, BlueprintSource};
pub use client::{
    AddressAccessor, AwaitDeployment, AwaitReceipt, ChainClient, Confirmation, ConfirmationStatus,
    ConfirmationStrategy, PendingDeployment, Receipt,
};
pub use errors::{ClientError, DeployError};
pub use ethers_client::EthersClient;
pub use orchestrator::{confirm, resolve_address, Deployer, DEFAULT_CONFIRMATION_TIMEOUT};
pub use outcome::{DeploymentOutcome, DeploymentStatus};

/// Process exit status for the result of a `deploy` call.
pub fn exit_code(result: &Result<DeploymentOutcome, DeployError>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => 1,
    }
}
