use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256};

use crate::abi::{
    AgreementStoreManager as AgreementStoreAbi, AgreementTemplate,
    ConditionStoreManager as ConditionStoreAbi,
};
use crate::account::Account;
use crate::artifacts::ContractArtifact;
use crate::context::{EXTERNAL_CONTRACT_VERSION, KeeperContext};
use crate::contract::{ContractProxy, argument_filters};
use crate::error::Result;
use crate::transaction::TxOptions;

/// An agreement as recorded by its `AgreementCreated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementValues {
    pub did: B256,
    pub owner: Address,
    pub template_id: Address,
    pub condition_ids: Vec<B256>,
    pub condition_id_seeds: Vec<B256>,
    pub id_seed: B256,
}

/// Lifecycle state of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ConditionState {
    Uninitialized,
    Unfulfilled,
    Fulfilled,
    Aborted,
    #[display("Unknown({_0})")]
    Unknown(u8),
}

impl From<u8> for ConditionState {
    fn from(state: u8) -> Self {
        match state {
            0 => ConditionState::Uninitialized,
            1 => ConditionState::Unfulfilled,
            2 => ConditionState::Fulfilled,
            3 => ConditionState::Aborted,
            other => ConditionState::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionValues {
    pub type_ref: Address,
    pub state: ConditionState,
    pub time_lock: U256,
    pub time_out: U256,
    pub block_number: U256,
}

/// Registry of agreements created through the approved templates.
#[derive(Debug, Clone)]
pub struct AgreementStoreManager {
    contract: ContractProxy,
}

impl AgreementStoreManager {
    pub const CONTRACT_NAME: &'static str = "AgreementStoreManager";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    /// Creates an agreement directly in the store. Only approved templates may do this,
    /// so `account` must be one.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_agreement(
        &self,
        agreement_id: B256,
        did: B256,
        condition_types: Vec<Address>,
        condition_ids: Vec<B256>,
        time_locks: Vec<U256>,
        time_outs: Vec<U256>,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                AgreementStoreAbi::createAgreementCall {
                    _id: agreement_id,
                    _did: did,
                    _conditionTypes: condition_types,
                    _conditionIds: condition_ids,
                    _timeLocks: time_locks,
                    _timeOuts: time_outs,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    /// Looks the agreement up through the `AgreementCreated` event of its template.
    /// Returns `None` when the event isn't found within the context's event wait timeout.
    pub async fn get_agreement(&self, agreement_id: B256) -> Result<Option<AgreementValues>> {
        let template_id = self
            .contract
            .call(AgreementStoreAbi::getAgreementTemplateCall { _id: agreement_id })
            .await?;
        let ctx = self.contract.context();
        let template = ContractProxy::new(
            "AgreementTemplate",
            ContractArtifact::new(
                template_id,
                AgreementTemplate::abi::contract(),
                EXTERNAL_CONTRACT_VERSION,
            ),
            ctx.clone(),
        );

        let event = template
            .wait_for_event(
                "AgreementCreated",
                argument_filters([("_agreementId", DynSolValue::FixedBytes(agreement_id, 32))]),
                ctx.config().event_wait_timeout,
                BlockNumberOrTag::Earliest,
            )
            .await?;
        Ok(event.map(|event| AgreementValues {
            did: event.arg_b256("_did").unwrap_or_default(),
            owner: event.arg_address("_creator").unwrap_or_default(),
            template_id,
            condition_ids: event.arg_b256_array("_conditionIds").unwrap_or_default(),
            condition_id_seeds: event.arg_b256_array("_conditionIdSeeds").unwrap_or_default(),
            id_seed: event.arg_b256("_idSeed").unwrap_or_default(),
        }))
    }

    pub async fn get_agreement_did_owner(&self, agreement_id: B256) -> Result<Address> {
        self.contract
            .call(AgreementStoreAbi::getAgreementDIDOwnerCall { _id: agreement_id })
            .await
    }

    pub async fn get_num_agreements(&self) -> Result<U256> {
        self.contract
            .call(AgreementStoreAbi::getAgreementListSizeCall {})
            .await
    }

    /// The final agreement id of `id_seed` created by `creator`.
    pub async fn agreement_id(&self, id_seed: B256, creator: Address) -> Result<B256> {
        self.contract
            .call(AgreementStoreAbi::agreementIdCall {
                _idSeed: id_seed,
                _creator: creator,
            })
            .await
    }
}

/// Registry of conditions and their state.
#[derive(Debug, Clone)]
pub struct ConditionStoreManager {
    contract: ContractProxy,
}

impl ConditionStoreManager {
    pub const CONTRACT_NAME: &'static str = "ConditionStoreManager";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub async fn get_condition(&self, condition_id: B256) -> Result<ConditionValues> {
        let condition = self
            .contract
            .call(ConditionStoreAbi::getConditionCall { _id: condition_id })
            .await?;
        Ok(ConditionValues {
            type_ref: condition.typeRef,
            state: condition.state.into(),
            time_lock: condition.timeLock,
            time_out: condition.timeOut,
            block_number: condition.blockNumber,
        })
    }

    pub async fn get_condition_state(&self, condition_id: B256) -> Result<ConditionState> {
        let state = self
            .contract
            .call(ConditionStoreAbi::getConditionStateCall { _id: condition_id })
            .await?;
        Ok(state.into())
    }

    pub async fn get_num_condition(&self) -> Result<U256> {
        self.contract
            .call(ConditionStoreAbi::getConditionListSizeCall {})
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_condition_states() {
        assert_eq!(ConditionState::from(1), ConditionState::Unfulfilled);
        assert_eq!(ConditionState::from(2), ConditionState::Fulfilled);
        assert_eq!(ConditionState::from(9), ConditionState::Unknown(9));
        assert_eq!(ConditionState::Unknown(9).to_string(), "Unknown(9)");
    }
}
