use std::time::Duration;

use alloy::consensus::TxReceipt;
use alloy::primitives::{B256, TxHash};
use alloy::rpc::types::{Log, TransactionReceipt};

use crate::connection::ChainConnection;
use crate::error::{Error, Result};

/// How long [`get_tx_receipt`] waits for a transaction to be mined.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between two receipt queries.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The mined result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// EIP-658 status. `None` for pre-Byzantium receipts that only carry a post-state root.
    pub status: Option<bool>,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Success predicate: the status must be present and equal to 1.
    pub fn is_success(&self) -> bool {
        self.status == Some(true)
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            status: receipt.inner.status_or_post_state().as_eip658(),
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            gas_used: receipt.gas_used,
            logs: receipt.inner.logs().to_vec(),
        }
    }
}

/// Classified outcome of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TxOutcome {
    /// Mined with status 1.
    Success,
    /// Mined with status 0 or without a status.
    Failed,
    /// No receipt within the timeout, or the node refused to return one.
    NoReceipt,
}

impl TxOutcome {
    pub fn from_receipt(receipt: Option<&Receipt>) -> Self {
        match receipt {
            Some(r) if r.is_success() => TxOutcome::Success,
            Some(_) => TxOutcome::Failed,
            None => TxOutcome::NoReceipt,
        }
    }
}

/// Polls the node for the receipt of `tx_hash` until it is available or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout and when the node answers with an error object.
/// Only transport failures are returned as errors.
pub async fn wait_for_receipt(
    connection: &dyn ChainConnection,
    tx_hash: TxHash,
    timeout: Duration,
) -> Result<Option<Receipt>> {
    let start_time = tokio::time::Instant::now();

    loop {
        match connection.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => {
                log::debug!(
                    "Transaction {tx_hash} was included in block {:?} with status {:?}",
                    receipt.block_number,
                    receipt.status
                );
                return Ok(Some(receipt));
            }
            Ok(None) => {
                log::trace!("Getting receipt returned None for transaction: {tx_hash}");
            }
            Err(e) if e.is_indexing_in_progress() => {
                log::debug!("Ignoring `indexing is in progress` error for transaction: {tx_hash}");
            }
            Err(e @ Error::Node { .. }) => {
                log::error!("Waiting for transaction receipt failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        if start_time.elapsed() >= timeout {
            log::info!(
                "Waiting for transaction receipt timed out after {}: {tx_hash}",
                humantime::format_duration(timeout)
            );
            return Ok(None);
        }
        tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
    }
}

/// Waits up to [`RECEIPT_TIMEOUT`] for the receipt of `tx_hash`.
pub async fn get_tx_receipt(
    connection: &dyn ChainConnection,
    tx_hash: TxHash,
) -> Result<Option<Receipt>> {
    wait_for_receipt(connection, tx_hash, RECEIPT_TIMEOUT).await
}

/// True only when the transaction was mined with a success status.
/// A timeout, a node error and a reverted transaction are all reported as `false`.
pub async fn is_tx_successful(connection: &dyn ChainConnection, tx_hash: TxHash) -> Result<bool> {
    let receipt = get_tx_receipt(connection, tx_hash).await?;
    Ok(receipt.is_some_and(|r| r.is_success()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(status: Option<bool>) -> Receipt {
        Receipt {
            transaction_hash: TxHash::ZERO,
            status,
            block_number: Some(1),
            block_hash: None,
            gas_used: 21_000,
            logs: vec![],
        }
    }

    #[test]
    fn success_requires_status_one() {
        assert!(receipt(Some(true)).is_success());
        assert!(!receipt(Some(false)).is_success());
        assert!(!receipt(None).is_success());
    }

    #[test]
    fn classifies_outcomes() {
        assert_eq!(TxOutcome::from_receipt(Some(&receipt(Some(true)))), TxOutcome::Success);
        assert_eq!(TxOutcome::from_receipt(Some(&receipt(None))), TxOutcome::Failed);
        assert_eq!(TxOutcome::from_receipt(None), TxOutcome::NoReceipt);
    }
}
