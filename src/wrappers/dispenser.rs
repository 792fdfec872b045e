use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, U256};

use crate::abi::Dispenser as DispenserAbi;
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::{ContractProxy, argument_filters};
use crate::error::{Error, Result};
use crate::receipt;
use crate::transaction::TxOptions;

/// Tries used when looking for a rejection event after a request.
const REJECTION_QUERY_TRIES: u32 = 5;

/// Events the dispenser emits instead of reverting when it refuses a request.
const REJECTION_EVENTS: [&str; 2] = ["RequestFrequencyExceeded", "RequestLimitExceeded"];

/// Test-network faucet handing out tokens.
#[derive(Debug, Clone)]
pub struct Dispenser {
    contract: ContractProxy,
}

impl Dispenser {
    pub const CONTRACT_NAME: &'static str = "Dispenser";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Base units per whole token.
    pub fn get_scale() -> U256 {
        U256::from(10u64).pow(U256::from(18u64))
    }

    /// Requests `amount` whole tokens for `account`.
    ///
    /// Returns `false` when no receipt arrives in time, when the transaction failed and when
    /// the dispenser rejected the request with a rate limit event.
    /// A request the node refuses to accept fails with [`Error::InvalidTransaction`].
    pub async fn request_tokens(&self, amount: U256, account: &Account) -> Result<bool> {
        let address = account.address();
        let tx_hash = self
            .contract
            .send_transaction(
                DispenserAbi::requestTokensCall { amount },
                TxOptions::from_account(account),
            )
            .await
            .map_err(|e| match e {
                Error::Node { .. } => Error::InvalidTransaction(format!(
                    "Requesting {amount} tokens to {address} failed with error: {e}"
                )),
                e => e,
            })?;
        log::debug!("{address} requests {amount} tokens, waiting for receipt");

        let timeout = self.contract.context().config().dispenser_receipt_timeout;
        let Some(receipt) =
            receipt::wait_for_receipt(&*self.contract.connection(), tx_hash, timeout).await?
        else {
            return Ok(false);
        };
        if !receipt.is_success() {
            log::warn!("request tokens failed for account {address}: tx {tx_hash} reverted");
            return Ok(false);
        }

        let block = receipt
            .block_number
            .map(BlockNumberOrTag::Number)
            .unwrap_or(BlockNumberOrTag::Latest);
        for event_name in REJECTION_EVENTS {
            let mut filter = self
                .contract
                .event_filter(
                    event_name,
                    argument_filters([("requester", DynSolValue::Address(address))]),
                    block,
                    block,
                )
                .await?;
            let logs = filter.get_all_entries(REJECTION_QUERY_TRIES).await?;
            filter.uninstall().await?;
            if !logs.is_empty() {
                log::warn!("request tokens failed {event_name}");
                log::info!("{event_name} event logs: {logs:?}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Requests tokens given an amount in base units, rounded down to whole tokens and at
    /// least one.
    pub async fn request_vodkas(&self, amount: U256, account: &Account) -> Result<bool> {
        let tokens = (amount / Self::get_scale()).max(U256::from(1u64));
        self.request_tokens(tokens, account).await
    }
}
