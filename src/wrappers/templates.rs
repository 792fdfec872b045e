use std::fmt;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256};

use crate::abi::AgreementTemplate;
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::{ContractProxy, argument_filters};
use crate::error::Result;
use crate::event_filter::{EventFilter, EventLog};
use crate::transaction::TxOptions;

pub const AGREEMENT_CREATED_EVENT: &str = "AgreementCreated";

const AGREEMENT_CREATED_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Access,
    EscrowAccessSecretStore,
    EscrowComputeExecution,
    AccessProof,
    NftAccess,
    NftAccessProof,
    NftAccessSwap,
    NftSales,
    NftSalesWithAccess,
    Nft721Sales,
    DidSales,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 11] = [
        TemplateKind::Access,
        TemplateKind::EscrowAccessSecretStore,
        TemplateKind::EscrowComputeExecution,
        TemplateKind::AccessProof,
        TemplateKind::NftAccess,
        TemplateKind::NftAccessProof,
        TemplateKind::NftAccessSwap,
        TemplateKind::NftSales,
        TemplateKind::NftSalesWithAccess,
        TemplateKind::Nft721Sales,
        TemplateKind::DidSales,
    ];

    pub fn contract_name(self) -> &'static str {
        match self {
            TemplateKind::Access => "AccessTemplate",
            TemplateKind::EscrowAccessSecretStore => "EscrowAccessSecretStoreTemplate",
            TemplateKind::EscrowComputeExecution => "EscrowComputeExecutionTemplate",
            TemplateKind::AccessProof => "AccessProofTemplate",
            TemplateKind::NftAccess => "NFTAccessTemplate",
            TemplateKind::NftAccessProof => "NFTAccessProofTemplate",
            TemplateKind::NftAccessSwap => "NFTAccessSwapTemplate",
            TemplateKind::NftSales => "NFTSalesTemplate",
            TemplateKind::NftSalesWithAccess => "NFTSalesWithAccessTemplate",
            TemplateKind::Nft721Sales => "NFT721SalesTemplate",
            TemplateKind::DidSales => "DIDSalesTemplate",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// An agreement template: creates agreements made of a fixed list of condition types.
#[derive(Debug, Clone)]
pub struct Template {
    kind: TemplateKind,
    contract: ContractProxy,
}

impl Template {
    pub fn new(ctx: &KeeperContext, kind: TemplateKind) -> Result<Self> {
        Ok(Self {
            kind,
            contract: ctx.contract(kind.contract_name())?,
        })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Creates the agreement and reports whether the transaction succeeded.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_agreement(
        &self,
        agreement_id: B256,
        did: B256,
        condition_ids: Vec<B256>,
        time_locks: Vec<U256>,
        time_outs: Vec<U256>,
        consumer: Address,
        account: &Account,
    ) -> Result<bool> {
        log::debug!(
            "Creating agreement {agreement_id} with did={did}, consumer={consumer} through {}",
            self.kind
        );
        self.contract
            .transact_and_confirm(
                AgreementTemplate::createAgreementCall {
                    _id: agreement_id,
                    _did: did,
                    _conditionIds: condition_ids,
                    _timeLocks: time_locks,
                    _timeOuts: time_outs,
                    _accessConsumer: consumer,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    /// Addresses of the condition contracts every agreement of this template uses.
    pub async fn get_condition_types(&self) -> Result<Vec<Address>> {
        self.contract
            .call(AgreementTemplate::getConditionTypesCall {})
            .await
    }

    /// Consumer and provider of the agreement.
    pub async fn get_agreement_data(&self, agreement_id: B256) -> Result<(Address, Address)> {
        let data = self
            .contract
            .call(AgreementTemplate::getAgreementDataCall { _id: agreement_id })
            .await?;
        Ok((data.accessConsumer, data.accessProvider))
    }

    pub async fn get_agreement_consumer(&self, agreement_id: B256) -> Result<Address> {
        Ok(self.get_agreement_data(agreement_id).await?.0)
    }

    pub async fn subscribe_agreement_created(
        &self,
        agreement_id: B256,
        timeout: Duration,
        from_block: BlockNumberOrTag,
    ) -> Result<Option<EventLog>> {
        log::debug!("Subscribing {AGREEMENT_CREATED_EVENT} event with agreement id {agreement_id}");
        self.contract
            .wait_for_event(
                AGREEMENT_CREATED_EVENT,
                argument_filters([("_agreementId", DynSolValue::FixedBytes(agreement_id, 32))]),
                timeout,
                from_block,
            )
            .await
    }

    /// Filter over `AgreementCreated` events, optionally restricted to one provider.
    pub async fn get_event_filter_for_agreement_created(
        &self,
        provider: Option<Address>,
        from_block: BlockNumberOrTag,
        to_block: BlockNumberOrTag,
    ) -> Result<EventFilter> {
        let filters = provider
            .map(|provider| argument_filters([("_accessProvider", DynSolValue::Address(provider))]))
            .unwrap_or_default();
        let mut filter = self
            .contract
            .event_filter(AGREEMENT_CREATED_EVENT, filters, from_block, to_block)
            .await?;
        filter.set_poll_interval(AGREEMENT_CREATED_POLL_INTERVAL);
        Ok(filter)
    }
}
