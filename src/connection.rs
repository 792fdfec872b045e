use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use async_trait::async_trait;

use crate::error::Result;
use crate::receipt::Receipt;

/// Identifier of a filter installed on the node.
pub type FilterId = U256;

/// The subset of the Ethereum JSON-RPC API used by the contract layer.
///
/// Every call fails with [`Error::Node`](crate::Error::Node) when the node answers with a
/// JSON-RPC error object and with [`Error::Transport`](crate::Error::Transport) when it
/// can't be reached.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64>;

    /// `net_version`
    async fn network_id(&self) -> Result<u64>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> Result<u64>;

    /// Account used when a transaction doesn't name its sender.
    fn default_account(&self) -> Option<Address>;

    /// `eth_accounts`
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// `eth_getBalance` at the latest block.
    async fn balance(&self, address: Address) -> Result<U256>;

    /// `eth_getTransactionCount` at the pending block.
    async fn transaction_count(&self, address: Address) -> Result<u64>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<u128>;

    /// `eth_estimateGas`
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

    /// `eth_call` at the latest block.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes>;

    /// `eth_sendTransaction`, the node signs with an unlocked account.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    /// `personal_sendTransaction`, the node unlocks the sender with `passphrase` for this call only.
    async fn send_transaction_with_passphrase(
        &self,
        tx: TransactionRequest,
        passphrase: &str,
    ) -> Result<TxHash>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash>;

    /// `eth_getTransactionReceipt`, `None` while the transaction is pending or unknown.
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>>;

    /// `eth_newFilter`
    async fn new_filter(&self, filter: &Filter) -> Result<FilterId>;

    /// `eth_uninstallFilter`
    async fn uninstall_filter(&self, id: FilterId) -> Result<bool>;

    /// `eth_getFilterLogs`
    async fn filter_logs(&self, id: FilterId) -> Result<Vec<Log>>;

    /// `eth_getLogs`
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>>;
}
