use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use async_trait::async_trait;
use url::Url;

use crate::connection::{ChainConnection, FilterId};
use crate::error::{Error, Result};
use crate::receipt::Receipt;

/// Retry limits of a [`ResilientProvider`].
#[derive(Clone, Debug)]
pub struct ResilientProviderConfig {
    /// Retries after a request that never reached the node.
    pub max_retries: u32,
    /// Pause between attempts while the load balancer has no healthy backend, in milliseconds.
    pub retry_delay_ms: u64,
    /// How long to keep waiting for a healthy backend, in seconds.
    pub backend_health_timeout_secs: u64,
}

impl Default for ResilientProviderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 100,
            backend_health_timeout_secs: 30,
        }
    }
}

/// Failures worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transient {
    /// The request was lost on the way, typically while a load balancer switches backends.
    RequestNotSent,
    /// The load balancer is still looking for a healthy backend.
    NoHealthyBackend,
}

impl Transient {
    fn classify(message: &str) -> Option<Self> {
        if message.contains("error sending request") {
            Some(Transient::RequestNotSent)
        } else if message.contains("no backend is currently healthy to serve traffic") {
            Some(Transient::NoHealthyBackend)
        } else {
            None
        }
    }
}

/// A [`ChainConnection`] over an alloy [`DynProvider`] that retries transport-level failures.
///
/// JSON-RPC error objects are never retried here, they are surfaced as [`Error::Node`]
/// so that callers can react to their code and message.
#[derive(Clone)]
pub struct ResilientProvider {
    provider: DynProvider,
    config: ResilientProviderConfig,
    default_account: Option<Address>,
}

impl ResilientProvider {
    pub fn new(provider: DynProvider, config: ResilientProviderConfig) -> Self {
        Self {
            provider,
            config,
            default_account: None,
        }
    }

    pub fn new_with_default_config(provider: DynProvider) -> Self {
        Self::new(provider, ResilientProviderConfig::default())
    }

    /// Connects to an HTTP JSON-RPC endpoint.
    /// No fillers are installed, nonce, gas and chain id are handled by the transaction signer.
    pub fn connect(url: Url, config: ResilientProviderConfig) -> Self {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased();
        Self::new(provider, config)
    }

    /// Sets the account used for transactions that don't name a sender.
    pub fn with_default_account(mut self, account: Address) -> Self {
        self.default_account = Some(account);
        self
    }

    pub fn inner(&self) -> &DynProvider {
        &self.provider
    }

    pub fn config(&self) -> &ResilientProviderConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error or exhausts
    /// the budget of its failure kind.
    async fn retry<T, F, Fut, E>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display + Into<Error>,
    {
        let mut lost_requests = 0;
        let health_timeout = Duration::from_secs(self.config.backend_health_timeout_secs);
        let started = tokio::time::Instant::now();

        loop {
            let e = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };
            match Transient::classify(&e.to_string()) {
                Some(Transient::RequestNotSent) => {
                    lost_requests += 1;
                    if lost_requests > self.config.max_retries {
                        return Err(Error::Transport(format!(
                            "{operation_name} failed after {} attempts with 'error sending request': {e}",
                            self.config.max_retries,
                        )));
                    }
                    log::debug!(
                        "{operation_name}: request not sent (attempt {lost_requests}/{}), retrying",
                        self.config.max_retries
                    );
                }
                Some(Transient::NoHealthyBackend) => {
                    let elapsed = started.elapsed();
                    if elapsed >= health_timeout {
                        return Err(Error::Transport(format!(
                            "{operation_name} failed after {} with 'no backend is currently healthy to serve traffic': {e}",
                            humantime::format_duration(health_timeout),
                        )));
                    }
                    log::debug!(
                        "{operation_name}: no healthy backend yet ({:.1}s/{:.1}s), retrying",
                        elapsed.as_secs_f64(),
                        health_timeout.as_secs_f64()
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                None => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl ChainConnection for ResilientProvider {
    async fn chain_id(&self) -> Result<u64> {
        self.retry("get_chain_id", || async { self.provider.get_chain_id().await })
            .await
    }

    async fn network_id(&self) -> Result<u64> {
        self.retry("get_net_version", || async {
            self.provider.get_net_version().await
        })
        .await
    }

    async fn block_number(&self) -> Result<u64> {
        self.retry("get_block_number", || async {
            self.provider.get_block_number().await
        })
        .await
    }

    fn default_account(&self) -> Option<Address> {
        self.default_account
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.retry("get_accounts", || async { self.provider.get_accounts().await })
            .await
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.retry("get_balance", || async {
            self.provider.get_balance(address).await
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.retry("get_transaction_count", || async {
            self.provider.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> Result<u128> {
        self.retry("get_gas_price", || async { self.provider.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        self.retry("estimate_gas", || async {
            self.provider.estimate_gas(tx.clone()).await
        })
        .await
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.retry("call", || async { self.provider.call(tx.clone()).await })
            .await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        self.retry("send_transaction", || async {
            self.provider
                .send_transaction(tx.clone())
                .await
                .map(|pending| *pending.tx_hash())
        })
        .await
    }

    async fn send_transaction_with_passphrase(
        &self,
        tx: TransactionRequest,
        passphrase: &str,
    ) -> Result<TxHash> {
        self.retry("personal_sendTransaction", || async {
            self.provider
                .raw_request::<_, TxHash>(
                    "personal_sendTransaction".into(),
                    (tx.clone(), passphrase.to_string()),
                )
                .await
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash> {
        self.retry("send_raw_transaction", || async {
            self.provider
                .send_raw_transaction(raw)
                .await
                .map(|pending| *pending.tx_hash())
        })
        .await
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>> {
        let receipt = self
            .retry("get_transaction_receipt", || async {
                self.provider.get_transaction_receipt(hash).await
            })
            .await?;
        Ok(receipt.map(Receipt::from))
    }

    async fn new_filter(&self, filter: &Filter) -> Result<FilterId> {
        self.retry("new_filter", || async { self.provider.new_filter(filter).await })
            .await
    }

    async fn uninstall_filter(&self, id: FilterId) -> Result<bool> {
        self.retry("uninstall_filter", || async {
            self.provider.uninstall_filter(id).await
        })
        .await
    }

    async fn filter_logs(&self, id: FilterId) -> Result<Vec<Log>> {
        self.retry("get_filter_logs", || async {
            self.provider
                .raw_request::<_, Vec<Log>>("eth_getFilterLogs".into(), (id,))
                .await
        })
        .await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.retry("get_logs", || async { self.provider.get_logs(filter).await })
            .await
    }
}

impl From<DynProvider> for ResilientProvider {
    fn from(provider: DynProvider) -> Self {
        Self::new_with_default_config(provider)
    }
}

impl From<ResilientProvider> for DynProvider {
    fn from(resilient_provider: ResilientProvider) -> Self {
        resilient_provider.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_failures() {
        assert_eq!(
            Transient::classify("error sending request for url (http://localhost:8545/)"),
            Some(Transient::RequestNotSent)
        );
        assert_eq!(
            Transient::classify("no backend is currently healthy to serve traffic"),
            Some(Transient::NoHealthyBackend)
        );
        assert_eq!(Transient::classify("execution reverted"), None);
    }
}
