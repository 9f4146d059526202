// bot/src/outcome.rs

use crate::client::Confirmation;
use ethers::types::{Address, TxHash};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Succeeded,
    /// Address known but no confirmation strategy completed before the deadline.
    Unconfirmed,
    /// The creation transaction was mined and reverted.
    Failed,
}

/// Final result of one `deploy` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub contract: String,
    pub address: Address,
    pub tx_hash: TxHash,
    pub status: DeploymentStatus,
    pub confirmation: Option<Confirmation>,
}

impl DeploymentOutcome {
    pub fn block_number(&self) -> Option<u64> {
        self.confirmation.as_ref().and_then(|c| c.block_number)
    }

    /// Process exit status for this outcome. Unconfirmed is only a warning.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            DeploymentStatus::Succeeded | DeploymentStatus::Unconfirmed => 0,
            DeploymentStatus::Failed => 1,
        }
    }

    /// Writes the outcome as pretty JSON so frontends can pick up the address.
    pub fn write_record(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create record directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).wrap_err("Failed to serialize deployment record")?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write deployment record {:?}", path))?;
        info!(record = %path.display(), "Deployment record written");
        Ok(())
    }
}
