//! Agreement conditions.
//!
//! Every condition contract exposes `fulfill`, `hashValues` and `abortByTimeOut` with
//! kind-specific arguments, so calls are encoded from the ABI in the condition's artifact.

use std::fmt;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, TxHash, U256};

use crate::abi::Condition as ConditionAbi;
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::{ContractProxy, argument_filters};
use crate::error::{Error, Result};
use crate::event_filter::{EventFilter, EventLog};
use crate::transaction::TxOptions;
use crate::utils::generate_multi_value_hash;

/// Event emitted by every condition once fulfilled.
pub const FULFILLED_EVENT: &str = "Fulfilled";

/// Gas limit for access proof fulfilment, whose estimate is unreliable.
const ACCESS_PROOF_FULFILL_GAS: u64 = 2_000_000;

const FULFILLED_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    LockPayment,
    EscrowPayment,
    Access,
    AccessProof,
    ComputeExecution,
    NftHolder,
    NftAccess,
    NftLock,
    TransferDid,
    TransferNft,
    TransferNft721,
    Threshold,
    Whitelisting,
    Sign,
    HashLock,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 15] = [
        ConditionKind::LockPayment,
        ConditionKind::EscrowPayment,
        ConditionKind::Access,
        ConditionKind::AccessProof,
        ConditionKind::ComputeExecution,
        ConditionKind::NftHolder,
        ConditionKind::NftAccess,
        ConditionKind::NftLock,
        ConditionKind::TransferDid,
        ConditionKind::TransferNft,
        ConditionKind::TransferNft721,
        ConditionKind::Threshold,
        ConditionKind::Whitelisting,
        ConditionKind::Sign,
        ConditionKind::HashLock,
    ];

    pub fn contract_name(self) -> &'static str {
        match self {
            ConditionKind::LockPayment => "LockPaymentCondition",
            ConditionKind::EscrowPayment => "EscrowPaymentCondition",
            ConditionKind::Access => "AccessCondition",
            ConditionKind::AccessProof => "AccessProofCondition",
            ConditionKind::ComputeExecution => "ComputeExecutionCondition",
            ConditionKind::NftHolder => "NFTHolderCondition",
            ConditionKind::NftAccess => "NFTAccessCondition",
            ConditionKind::NftLock => "NFTLockCondition",
            ConditionKind::TransferDid => "TransferDIDOwnershipCondition",
            ConditionKind::TransferNft => "TransferNFTCondition",
            ConditionKind::TransferNft721 => "TransferNFT721Condition",
            ConditionKind::Threshold => "ThresholdCondition",
            ConditionKind::Whitelisting => "WhitelistingCondition",
            ConditionKind::Sign => "SignCondition",
            ConditionKind::HashLock => "HashLockCondition",
        }
    }

    fn fulfill_gas(self) -> Option<u64> {
        match self {
            ConditionKind::AccessProof => Some(ACCESS_PROOF_FULFILL_GAS),
            _ => None,
        }
    }

    /// Checks arguments the contract would otherwise reject on-chain.
    fn validate_fulfill_args(self, args: &[DynSolValue]) -> Result<()> {
        if self != ConditionKind::Threshold {
            return Ok(());
        }
        let inputs = args
            .first()
            .and_then(DynSolValue::as_array)
            .map(<[DynSolValue]>::len)
            .unwrap_or_default();
        let threshold = args.get(1).and_then(DynSolValue::as_uint).map(|(v, _)| v);
        if inputs < 2 {
            return Err(Error::InvalidArgument(
                "The minimum number of conditions is 2".to_string(),
            ));
        }
        match threshold {
            Some(threshold) if threshold <= U256::from(inputs) => Ok(()),
            _ => Err(Error::InvalidArgument(format!(
                "The threshold can't exceed the {inputs} input conditions"
            ))),
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// A deployed condition contract.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    contract: ContractProxy,
}

impl Condition {
    pub fn new(ctx: &KeeperContext, kind: ConditionKind) -> Result<Self> {
        Ok(Self {
            kind,
            contract: ctx.contract(kind.contract_name())?,
        })
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Condition id: the packed hash of the agreement id, this contract and the packed hash
    /// of `values`.
    pub fn generate_id(&self, agreement_id: B256, values: &[DynSolValue]) -> B256 {
        let values_hash = generate_multi_value_hash(values);
        generate_multi_value_hash(&[
            DynSolValue::FixedBytes(agreement_id, 32),
            DynSolValue::Address(self.address()),
            DynSolValue::FixedBytes(values_hash, 32),
        ])
    }

    /// Hash of the condition inputs as computed by the contract.
    pub async fn hash_values(&self, values: &[DynSolValue]) -> Result<B256> {
        let output = self.contract.call_function("hashValues", values).await?;
        output
            .first()
            .and_then(DynSolValue::as_fixed_bytes)
            .map(|(bytes, _)| B256::from_slice(bytes))
            .ok_or_else(|| Error::Abi(format!("{}.hashValues returned {output:?}", self.kind)))
    }

    /// Fulfils the condition of `agreement_id`. `args` are the kind-specific arguments
    /// following the agreement id.
    pub async fn fulfill(
        &self,
        agreement_id: B256,
        args: &[DynSolValue],
        account: &Account,
    ) -> Result<TxHash> {
        self.kind.validate_fulfill_args(args)?;
        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(DynSolValue::FixedBytes(agreement_id, 32));
        values.extend_from_slice(args);

        let mut options = TxOptions::from_account(account);
        options.gas = self.kind.fulfill_gas();

        let tx_hash = self.contract.send_function("fulfill", &values, options).await?;
        if self.contract.is_tx_successful(tx_hash).await? {
            log::info!("Condition {} fulfilled successfully", self.kind);
        } else {
            log::error!("Fulfilling {} failed for agreement {agreement_id}", self.kind);
        }
        Ok(tx_hash)
    }

    pub async fn abort_by_timeout(&self, condition_id: B256, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                ConditionAbi::abortByTimeOutCall { _id: condition_id },
                TxOptions::from_account(account),
            )
            .await
    }

    /// Waits up to `timeout` for the `Fulfilled` event of `agreement_id`.
    pub async fn subscribe_condition_fulfilled(
        &self,
        agreement_id: B256,
        timeout: Duration,
        from_block: BlockNumberOrTag,
    ) -> Result<Option<EventLog>> {
        log::debug!("Subscribing {FULFILLED_EVENT} event with agreement id {agreement_id}");
        self.contract
            .wait_for_event(
                FULFILLED_EVENT,
                argument_filters([("_agreementId", DynSolValue::FixedBytes(agreement_id, 32))]),
                timeout,
                from_block,
            )
            .await
    }

    /// Filter over `Fulfilled` events, optionally restricted to one agreement.
    pub async fn get_event_filter_for_fulfilled(
        &self,
        agreement_id: Option<B256>,
        from_block: BlockNumberOrTag,
        to_block: BlockNumberOrTag,
    ) -> Result<EventFilter> {
        let filters = agreement_id
            .map(|id| argument_filters([("_agreementId", DynSolValue::FixedBytes(id, 32))]))
            .unwrap_or_default();
        let mut filter = self
            .contract
            .event_filter(FULFILLED_EVENT, filters, from_block, to_block)
            .await?;
        filter.set_poll_interval(FULFILLED_POLL_INTERVAL);
        Ok(filter)
    }

    /// Read-only call of a kind-specific function such as `canFulfill`, `checkPermissions`
    /// or `wasComputeTriggered`.
    pub async fn call(&self, function: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        self.contract.call_function(function, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_args(inputs: usize, threshold: u64) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Array(
                (0..inputs)
                    .map(|i| DynSolValue::FixedBytes(B256::with_last_byte(i as u8), 32))
                    .collect(),
            ),
            DynSolValue::Uint(U256::from(threshold), 256),
        ]
    }

    #[test]
    fn validates_threshold_arguments() {
        let kind = ConditionKind::Threshold;
        assert!(kind.validate_fulfill_args(&threshold_args(2, 2)).is_ok());
        assert!(kind.validate_fulfill_args(&threshold_args(1, 1)).is_err());
        assert!(kind.validate_fulfill_args(&threshold_args(3, 4)).is_err());
        assert!(
            ConditionKind::Sign
                .validate_fulfill_args(&threshold_args(1, 4))
                .is_ok()
        );
    }

    #[test]
    fn names_contracts() {
        assert_eq!(ConditionKind::TransferDid.to_string(), "TransferDIDOwnershipCondition");
        assert_eq!(ConditionKind::AccessProof.fulfill_gas(), Some(ACCESS_PROOF_FULFILL_GAS));
        assert_eq!(ConditionKind::LockPayment.fulfill_gas(), None);
    }
}
