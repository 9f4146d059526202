// bot/src/artifact.rs
// Contract factory backed by compiled Hardhat artifacts.

use crate::errors::DeployError;
use ethers::{abi::Abi, types::Bytes};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Deployable template for one contract type.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub name: String,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, abi: Abi, bytecode: Bytes) -> Self {
        Self { name: name.into(), abi, bytecode }
    }
}

/// Produces blueprints by contract name.
pub trait BlueprintSource: Send + Sync {
    fn get_factory(&self, name: &str) -> Result<Blueprint, DeployError>;
}

impl BlueprintSource for HashMap<String, Blueprint> {
    fn get_factory(&self, name: &str) -> Result<Blueprint, DeployError> {
        self.get(name).cloned().ok_or_else(|| DeployError::UnknownContract {
            name: name.to_string(),
            reason: "not registered".to_string(),
        })
    }
}

// Subset of the hh-sol-artifact-1 format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    abi: Abi,
    bytecode: String,
}

/// Reads `<root>/contracts/**/<Name>.json` artifacts as written by `hardhat compile`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locates the artifact file for `name`, which is either a bare contract
    /// name or a fully qualified `contracts/Foo.sol:Foo`.
    fn locate(&self, name: &str) -> Result<PathBuf, String> {
        if let Some((source, contract)) = name.split_once(':') {
            let path = self.root.join(source).join(format!("{contract}.json"));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(format!("artifact {} not found", path.display()))
            };
        }

        let file_name = format!("{name}.json");
        let mut matches = Vec::new();
        collect_named(&self.root.join("contracts"), &file_name, &mut matches)
            .map_err(|e| format!("cannot read {}: {e}", self.root.display()))?;

        match matches.len() {
            0 => Err(format!("no artifact named {file_name} under {}", self.root.display())),
            1 => Ok(matches.remove(0)),
            n => Err(format!("{n} artifacts named {file_name}; use a fully qualified name")),
        }
    }
}

fn collect_named(dir: &Path, file_name: &str, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_named(&path, file_name, out)?;
        } else if path.file_name().and_then(|f| f.to_str()) == Some(file_name) {
            out.push(path);
        }
    }
    Ok(())
}

impl BlueprintSource for ArtifactStore {
    fn get_factory(&self, name: &str) -> Result<Blueprint, DeployError> {
        let unknown = |reason: String| DeployError::UnknownContract { name: name.to_string(), reason };

        let path = self.locate(name).map_err(unknown)?;
        debug!(artifact = %path.display(), "Loading contract artifact");

        let raw = fs::read_to_string(&path).map_err(|e| unknown(format!("read {}: {e}", path.display())))?;
        let artifact: HardhatArtifact =
            serde_json::from_str(&raw).map_err(|e| unknown(format!("parse {}: {e}", path.display())))?;

        let cleaned = artifact.bytecode.trim().trim_start_matches("0x");
        if cleaned.is_empty() {
            return Err(unknown("artifact has no creation bytecode (interface or abstract contract?)".into()));
        }
        if cleaned.contains("__$") {
            return Err(unknown("bytecode has unlinked library placeholders".into()));
        }
        let bytecode = hex::decode(cleaned).map_err(|e| unknown(format!("bad bytecode hex: {e}")))?;

        Ok(Blueprint::new(artifact.contract_name, artifact.abi, Bytes::from(bytecode)))
    }
}
