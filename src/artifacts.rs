use std::collections::HashMap;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Network name used when no other name matches.
pub const DEFAULT_NETWORK_NAME: &str = "development";

/// A deployed contract: where it lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractArtifact {
    pub address: Address,
    pub abi: JsonAbi,
    #[serde(default)]
    pub version: String,
}

impl ContractArtifact {
    pub fn new(address: Address, abi: JsonAbi, version: impl Into<String>) -> Self {
        Self {
            address,
            abi,
            version: version.into(),
        }
    }

    /// Parses an artifact file (`{"address": ..., "abi": [...], "version": ...}`).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Abi(format!("Invalid contract artifact: {e}")))
    }
}

/// Source of contract addresses and ABIs.
pub trait ArtifactResolver: Send + Sync {
    /// Fails with [`Error::ContractNotFound`] when nothing is known about `name` on `network`.
    fn resolve(&self, name: &str, network: &str) -> Result<ContractArtifact>;
}

/// Artifacts held in memory, keyed by network and contract name.
///
/// Network names compare case-insensitively. A contract missing from the requested network
/// resolves to its [`DEFAULT_NETWORK_NAME`] entry when one exists.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
    artifacts: HashMap<(String, String), ContractArtifact>,
}

impl StaticArtifacts {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, network: &str, name: &str, artifact: ContractArtifact) {
        self.artifacts
            .insert((network.to_lowercase(), name.to_string()), artifact);
    }

    pub fn with(mut self, network: &str, name: &str, artifact: ContractArtifact) -> Self {
        self.insert(network, name, artifact);
        self
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactResolver for StaticArtifacts {
    fn resolve(&self, name: &str, network: &str) -> Result<ContractArtifact> {
        let network = network.to_lowercase();
        self.artifacts
            .get(&(network.clone(), name.to_string()))
            .or_else(|| {
                self.artifacts
                    .get(&(DEFAULT_NETWORK_NAME.to_string(), name.to_string()))
            })
            .cloned()
            .ok_or_else(|| Error::ContractNotFound {
                name: name.to_string(),
                network,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "address": "0x00000000000000000000000000000000000000d1",
        "version": "v1.0.0",
        "abi": [
            {"type": "function", "name": "getDIDOwner", "stateMutability": "view",
             "inputs": [{"name": "_did", "type": "bytes32"}],
             "outputs": [{"name": "", "type": "address"}]}
        ]
    }"#;

    #[test]
    fn parses_artifact_file() {
        let artifact = ContractArtifact::from_json(ARTIFACT).unwrap();
        assert_eq!(artifact.version, "v1.0.0");
        assert!(artifact.abi.function("getDIDOwner").is_some());
    }

    #[test]
    fn falls_back_to_development() {
        let artifact = ContractArtifact::from_json(ARTIFACT).unwrap();
        let artifacts = StaticArtifacts::new().with(DEFAULT_NETWORK_NAME, "DIDRegistry", artifact.clone());

        assert_eq!(artifacts.resolve("DIDRegistry", "Spree").unwrap(), artifact);
        assert!(matches!(
            artifacts.resolve("Dispenser", "spree"),
            Err(Error::ContractNotFound { .. })
        ));
    }
}
