use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use bon::bon;

use crate::artifacts::{ArtifactResolver, ContractArtifact, DEFAULT_NETWORK_NAME};
use crate::connection::ChainConnection;
use crate::contract::ContractProxy;
use crate::error::Result;
use crate::event_filter::EventFilterConfig;

/// Environment variable overriding the network name derived from the network id.
pub const NETWORK_NAME_ENV: &str = "KEEPER_NETWORK_NAME";

/// Version reported for contracts registered by address instead of by artifact.
pub const EXTERNAL_CONTRACT_VERSION: &str = "external";

/// Known network ids and the artifact set deployed on them.
const NETWORK_NAMES: &[(u64, &str)] = &[
    (1, "Main"),
    (2, "Morden"),
    (3, "Ropsten"),
    (4, "Rinkeby"),
    (42, "Kovan"),
    (77, "POA_Sokol"),
    (99, "POA_Core"),
    (2199, "duero"),
    (8995, "nile"),
    (8996, "spree"),
    (0xcea11, "pacific"),
];

/// Network name for `network_id`, honouring the `KEEPER_NETWORK_NAME` override.
/// Unknown ids map to `development`.
pub fn network_name(network_id: u64) -> String {
    if let Ok(name) = std::env::var(NETWORK_NAME_ENV) {
        if !name.is_empty() {
            log::debug!("keeper network name overridden by an environment variable: {name}");
            return name;
        }
    }
    NETWORK_NAMES
        .iter()
        .find(|(id, _)| *id == network_id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| DEFAULT_NETWORK_NAME.to_string())
}

/// Timeouts and polling knobs shared by all contract wrappers.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    pub event_filter: EventFilterConfig,
    /// How long a wrapper waits for a confirming event when no receipt was available.
    pub event_wait_timeout: Duration,
    /// Receipt timeout used by the token dispenser.
    pub dispenser_receipt_timeout: Duration,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            event_filter: EventFilterConfig::default(),
            event_wait_timeout: Duration::from_secs(15),
            dispenser_receipt_timeout: Duration::from_secs(10),
        }
    }
}

struct ContextInner {
    connection: RwLock<Arc<dyn ChainConnection>>,
    artifacts: Arc<dyn ArtifactResolver>,
    network_name_override: Option<String>,
    network_name: RwLock<String>,
    config: KeeperConfig,
    contracts: Mutex<HashMap<String, ContractArtifact>>,
}

/// Connection, artifact source and contract cache shared by every wrapper of one Keeper.
///
/// Cloning is cheap and clones share state. Independent contexts can coexist, for example
/// one per network.
#[derive(Clone)]
pub struct KeeperContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for KeeperContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeeperContext")
            .field("network_name", &self.network_name())
            .field("cached_contracts", &lock(&self.inner.contracts).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[bon]
impl KeeperContext {
    /// Creates a context bound to `connection`.
    /// The network name is resolved once here and again on [`Self::reset_connection`].
    #[builder]
    pub async fn builder(
        connection: Arc<dyn ChainConnection>,
        artifacts: Arc<dyn ArtifactResolver>,
        #[builder(default)] config: KeeperConfig,
        network_name: Option<String>,
    ) -> Result<Self> {
        let resolved = match &network_name {
            Some(name) => name.clone(),
            None => self::network_name(connection.network_id().await?),
        };
        log::debug!("Keeper context using network {resolved}");

        Ok(Self {
            inner: Arc::new(ContextInner {
                connection: RwLock::new(connection),
                artifacts,
                network_name_override: network_name,
                network_name: RwLock::new(resolved),
                config,
                contracts: Mutex::new(HashMap::new()),
            }),
        })
    }
}

impl KeeperContext {
    pub fn connection(&self) -> Arc<dyn ChainConnection> {
        self.inner
            .connection
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn network_name(&self) -> String {
        self.inner
            .network_name
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.inner.config
    }

    /// Replaces the connection, resolves the network name again and empties the contract cache.
    pub async fn reset_connection(&self, connection: Arc<dyn ChainConnection>) -> Result<()> {
        let resolved = match &self.inner.network_name_override {
            Some(name) => name.clone(),
            None => network_name(connection.network_id().await?),
        };
        log::info!("Keeper connection replaced, network is now {resolved}");

        *self
            .inner
            .connection
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = connection;
        *self
            .inner
            .network_name
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = resolved;
        lock(&self.inner.contracts).clear();
        Ok(())
    }

    /// Loads `name` from the cache, resolving its artifact on first use.
    pub fn contract(&self, name: &str) -> Result<ContractProxy> {
        if let Some(artifact) = lock(&self.inner.contracts).get(name).cloned() {
            return Ok(ContractProxy::new(name, artifact, self.clone()));
        }

        let artifact = self
            .inner
            .artifacts
            .resolve(name, &self.network_name())?;
        log::debug!(
            "Loaded contract {name} at {} (version {})",
            artifact.address,
            artifact.version
        );
        lock(&self.inner.contracts).insert(name.to_string(), artifact.clone());
        Ok(ContractProxy::new(name, artifact, self.clone()))
    }

    /// Registers a contract that has no artifact, under `name`.
    /// An already cached contract of the same name wins.
    pub fn contract_by_address(&self, address: Address, abi: JsonAbi, name: &str) -> ContractProxy {
        let artifact = lock(&self.inner.contracts)
            .entry(name.to_string())
            .or_insert_with(|| ContractArtifact::new(address, abi, EXTERNAL_CONTRACT_VERSION))
            .clone();
        ContractProxy::new(name, artifact, self.clone())
    }

    pub fn set_contract(&self, name: &str, artifact: ContractArtifact) {
        lock(&self.inner.contracts).insert(name.to_string(), artifact);
    }

    pub fn has_contract(&self, name: &str) -> bool {
        lock(&self.inner.contracts).contains_key(name)
    }

    /// Version of a cached contract.
    pub fn contract_version(&self, name: &str) -> Option<String> {
        lock(&self.inner.contracts)
            .get(name)
            .map(|artifact| artifact.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_network_ids() {
        if std::env::var(NETWORK_NAME_ENV).is_ok() {
            return;
        }
        assert_eq!(network_name(8996), "spree");
        assert_eq!(network_name(0xcea11), "pacific");
        assert_eq!(network_name(1337), DEFAULT_NETWORK_NAME);
    }
}
