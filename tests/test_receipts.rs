use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash};
use keeper_contracts_sdk::receipt::{
    RECEIPT_TIMEOUT, get_tx_receipt, is_tx_successful, wait_for_receipt,
};
use keeper_contracts_sdk::transaction::transact;
use keeper_contracts_sdk::{Account, Error, TxOptions, TxOutcome};
use keeper_test_utils::{
    CallOverride, CallResponse, MockChain, ScriptedContract, init_logger, random_address,
};

async fn send(chain: &MockChain, to: Address) -> anyhow::Result<TxHash> {
    let sender = chain.add_account(None);
    let options = TxOptions::from_account(&Account::unlocked(sender));
    Ok(transact(chain, Some(to), Bytes::from_static(&[1, 2, 3, 4]), options).await?)
}

#[tokio::test]
async fn test_successful_transaction() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let tx_hash = send(&chain, random_address()).await?;

    let receipt = get_tx_receipt(&chain, tx_hash).await?.expect("receipt");
    assert_eq!(receipt.transaction_hash, tx_hash);
    assert_eq!(receipt.status, Some(true));
    assert_eq!(TxOutcome::from_receipt(Some(&receipt)), TxOutcome::Success);
    assert!(is_tx_successful(&chain, tx_hash).await?);

    log::info!("✅ Mined transaction reported as successful");
    Ok(())
}

#[tokio::test]
async fn test_reverted_transaction() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let contract = random_address();
    // No handlers: every transaction reverts.
    chain.deploy(contract, ScriptedContract::new());
    let tx_hash = send(&chain, contract).await?;

    let receipt = get_tx_receipt(&chain, tx_hash).await?.expect("receipt");
    assert_eq!(receipt.status, Some(false));
    assert_eq!(TxOutcome::from_receipt(Some(&receipt)), TxOutcome::Failed);
    assert!(!is_tx_successful(&chain, tx_hash).await?);

    log::info!("✅ Reverted transaction reported as failed");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unmined_transaction_times_out() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    chain.set_mining(false);
    let tx_hash = send(&chain, random_address()).await?;

    let start = tokio::time::Instant::now();
    assert!(!is_tx_successful(&chain, tx_hash).await?);
    assert!(start.elapsed() >= RECEIPT_TIMEOUT);
    assert!(chain.call_count("eth_getTransactionReceipt") > 1);

    let start = tokio::time::Instant::now();
    let receipt = wait_for_receipt(&chain, tx_hash, Duration::from_secs(2)).await?;
    assert!(receipt.is_none());
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < RECEIPT_TIMEOUT);

    assert_eq!(chain.mine_pending(), 1);
    assert!(is_tx_successful(&chain, tx_hash).await?);

    log::info!("✅ Missing receipt reported as unsuccessful after the timeout");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_receipt_after_indexing() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let tx_hash = send(&chain, random_address()).await?;
    chain.controller().override_rpc(
        "eth_getTransactionReceipt",
        CallOverride::NTimes {
            response: CallResponse::NodeError {
                code: -32000,
                message: "transaction indexing is in progress".to_string(),
            },
            n: 4,
        },
    );

    assert!(is_tx_successful(&chain, tx_hash).await?);
    assert_eq!(chain.call_count("eth_getTransactionReceipt"), 5);

    log::info!("✅ Receipt found once the node finished indexing");
    Ok(())
}

#[tokio::test]
async fn test_node_error_means_no_receipt() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let tx_hash = send(&chain, random_address()).await?;
    chain.controller().override_rpc(
        "eth_getTransactionReceipt",
        CallOverride::Once(CallResponse::NodeError {
            code: -32000,
            message: "unknown transaction".to_string(),
        }),
    );

    assert!(get_tx_receipt(&chain, tx_hash).await?.is_none());
    assert_eq!(chain.call_count("eth_getTransactionReceipt"), 1);

    chain.controller().override_rpc(
        "eth_getTransactionReceipt",
        CallOverride::Once(CallResponse::Error("connection refused".to_string())),
    );
    let result = get_tx_receipt(&chain, tx_hash).await;
    assert!(matches!(result, Err(Error::Transport(_))));

    log::info!("✅ Node errors end the wait, transport errors are returned");
    Ok(())
}
