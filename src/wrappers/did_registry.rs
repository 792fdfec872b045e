use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::Filter;

use crate::abi::DIDRegistry;
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::{ContractProxy, argument_filters};
use crate::error::{Error, Result};
use crate::event_filter::EventLog;
use crate::receipt::Receipt;
use crate::transaction::TxOptions;
use crate::utils::did_to_token_id;

/// Tries used when collecting registry events.
const EVENT_QUERY_TRIES: u32 = 5;

const DID_ATTRIBUTE_REGISTERED: &str = "DIDAttributeRegistered";

/// W3C PROV relations tracked by the registry, in on-chain enum order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ProvenanceMethod {
    #[display("ENTITY")]
    Entity = 0,
    #[display("ACTIVITY")]
    Activity = 1,
    #[display("WAS_GENERATED_BY")]
    WasGeneratedBy = 2,
    #[display("USED")]
    Used = 3,
    #[display("WAS_INFORMED_BY")]
    WasInformedBy = 4,
    #[display("WAS_STARTED_BY")]
    WasStartedBy = 5,
    #[display("WAS_ENDED_BY")]
    WasEndedBy = 6,
    #[display("WAS_INVALIDATED_BY")]
    WasInvalidatedBy = 7,
    #[display("WAS_DERIVED_FROM")]
    WasDerivedFrom = 8,
    #[display("AGENT")]
    Agent = 9,
    #[display("WAS_ATTRIBUTED_TO")]
    WasAttributedTo = 10,
    #[display("WAS_ASSOCIATED_WITH")]
    WasAssociatedWith = 11,
    #[display("ACTED_ON_BEHALF")]
    ActedOnBehalf = 12,
}

impl ProvenanceMethod {
    /// Name of the event recording this relation, for the relations that have one.
    pub fn event_name(self) -> Result<&'static str> {
        match self {
            ProvenanceMethod::WasGeneratedBy => Ok("WasGeneratedBy"),
            ProvenanceMethod::Used => Ok("Used"),
            ProvenanceMethod::WasDerivedFrom => Ok("WasDerivedFrom"),
            ProvenanceMethod::WasAssociatedWith => Ok("WasAssociatedWith"),
            ProvenanceMethod::ActedOnBehalf => Ok("ActedOnBehalf"),
            method => Err(Error::InvalidArgument(format!(
                "Provenance method {method} not implemented"
            ))),
        }
    }

    /// Event argument holding the DID the relation is about.
    fn did_argument(self) -> &'static str {
        match self {
            ProvenanceMethod::WasDerivedFrom => "_newEntityDid",
            ProvenanceMethod::WasAssociatedWith | ProvenanceMethod::ActedOnBehalf => "_entityDid",
            _ => "_did",
        }
    }
}

/// Registration parameters of a DID.
///
/// A DID becomes mintable when `cap` or `royalties` is set.
#[derive(Debug, Clone, bon::Builder)]
pub struct DidRegistration {
    /// Seed hashed together with the owner address into the final DID.
    pub did_seed: B256,
    #[builder(default)]
    pub checksum: B256,
    #[builder(into)]
    pub url: String,
    #[builder(default)]
    pub providers: Vec<Address>,
    #[builder(default)]
    pub activity_id: B256,
    #[builder(default, into)]
    pub attributes: String,
    pub cap: Option<U256>,
    pub royalties: Option<u8>,
}

impl DidRegistration {
    pub fn is_mintable(&self) -> bool {
        self.cap.is_some() || self.royalties.is_some()
    }

    fn validate(&self) -> Result<()> {
        if self.did_seed.is_zero() {
            return Err(Error::InvalidArgument(format!(
                "{} must be a valid DID to register",
                self.did_seed
            )));
        }
        url::Url::parse(&self.url).map_err(|e| {
            Error::InvalidArgument(format!(
                "Invalid URL {} to register for DID {}: {e}",
                self.url, self.did_seed
            ))
        })?;
        Ok(())
    }
}

/// On-chain record of a DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidRegisterValues {
    pub owner: Address,
    pub last_checksum: B256,
    pub url: String,
    pub last_updated_by: Address,
    pub block_number_updated: U256,
    /// Removed providers are stored as the zero address and are left out.
    pub providers: Vec<Address>,
    pub nft_supply: U256,
    pub mint_cap: U256,
    pub royalties: U256,
}

/// The `DIDAttributeRegistered` event of a DID's last update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredAttribute {
    pub checksum: B256,
    pub value: String,
    pub block_number: u64,
    pub did: B256,
    pub owner: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceEntry {
    pub did: B256,
    pub related_did: B256,
    pub agent_id: Address,
    pub activity_id: B256,
    pub agent_involved_id: Address,
    pub method: u8,
    pub created_by: Address,
    pub block_number_updated: U256,
    pub signature: Bytes,
}

/// A provenance event, either the generic attribute event or a relation-specific one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceEvent {
    pub prov_id: Option<B256>,
    pub did: B256,
    pub agent_id: Option<Address>,
    pub activity_id: Option<B256>,
    pub method: u8,
    pub related_did: Option<B256>,
    pub agent_involved_id: Option<Address>,
    pub attributes: Option<String>,
    pub block_number: Option<U256>,
}

/// The `DIDRegistry` contract: DID ownership, providers, permissions, provenance and DID NFTs.
#[derive(Debug, Clone)]
pub struct DidRegistry {
    contract: ContractProxy,
}

impl DidRegistry {
    pub const CONTRACT_NAME: &'static str = "DIDRegistry";

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

    /// Registers or updates a DID owned by `account`.
    ///
    /// Returns the receipt status. When no receipt shows up in time, waits for the
    /// `DIDAttributeRegistered` event of the DID instead and reports whether it was seen.
    pub async fn register(&self, registration: DidRegistration, account: &Account) -> Result<bool> {
        registration.validate()?;
        let options = TxOptions::from_account(account);

        let tx_hash = if registration.is_mintable() {
            self.contract
                .send_transaction(
                    DIDRegistry::registerMintableDIDCall {
                        _didSeed: registration.did_seed,
                        _checksum: registration.checksum,
                        _providers: registration.providers,
                        _url: registration.url,
                        _cap: registration.cap.unwrap_or_default(),
                        _royalties: registration.royalties.unwrap_or_default(),
                        _activityId: registration.activity_id,
                        _attributes: registration.attributes,
                    },
                    options,
                )
                .await?
        } else {
            self.contract
                .send_transaction(
                    DIDRegistry::registerDIDCall {
                        _didSeed: registration.did_seed,
                        _checksum: registration.checksum,
                        _providers: registration.providers,
                        _url: registration.url,
                        _activityId: registration.activity_id,
                        _attributes: registration.attributes,
                    },
                    options,
                )
                .await?
        };

        if let Some(receipt) = self.contract.get_tx_receipt(tx_hash).await? {
            return Ok(receipt.is_success());
        }

        let did = self.hash_did(registration.did_seed, account.address()).await?;
        log::debug!("No receipt for registration of {did}, waiting for the registry event");
        let event = self
            .contract
            .wait_for_event(
                DID_ATTRIBUTE_REGISTERED,
                argument_filters([
                    ("_did", DynSolValue::FixedBytes(did, 32)),
                    ("_owner", DynSolValue::Address(account.address())),
                ]),
                self.contract.context().config().event_wait_timeout,
                BlockNumberOrTag::Earliest,
            )
            .await?;
        Ok(event.is_some())
    }

    /// Registers a DID whose NFTs can be minted up to `cap`.
    pub async fn register_mintable_did(
        &self,
        registration: DidRegistration,
        cap: U256,
        royalties: u8,
        account: &Account,
    ) -> Result<bool> {
        let registration = DidRegistration {
            cap: Some(cap),
            royalties: Some(royalties),
            ..registration
        };
        self.register(registration, account).await
    }

    /// The final DID of `did_seed` registered by `creator`.
    pub async fn hash_did(&self, did_seed: B256, creator: Address) -> Result<B256> {
        self.contract
            .call(DIDRegistry::hashDIDCall {
                _didSeed: did_seed,
                _creator: creator,
            })
            .await
    }

    pub async fn are_royalties_valid(
        &self,
        did: B256,
        amounts: Vec<U256>,
        receivers: Vec<Address>,
    ) -> Result<bool> {
        self.contract
            .call(DIDRegistry::areRoyaltiesValidCall {
                _did: did,
                _amounts: amounts,
                _receivers: receivers,
            })
            .await
    }

    pub async fn get_block_number_updated(&self, did: B256) -> Result<U256> {
        self.contract
            .call(DIDRegistry::getBlockNumberUpdatedCall { _did: did })
            .await
    }

    pub async fn get_did_owner(&self, did: B256) -> Result<Address> {
        self.contract
            .call(DIDRegistry::getDIDOwnerCall { _did: did })
            .await
    }

    pub async fn add_provider(&self, did: B256, provider: Address, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::addDIDProviderCall {
                    _did: did,
                    _provider: provider,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn remove_provider(
        &self,
        did: B256,
        provider: Address,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::removeDIDProviderCall {
                    _did: did,
                    _provider: provider,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn is_did_provider(&self, did: B256, provider: Address) -> Result<bool> {
        self.contract
            .call(DIDRegistry::isDIDProviderCall {
                _did: did,
                _provider: provider,
            })
            .await
    }

    pub async fn get_did_providers(&self, did: B256) -> Result<Vec<Address>> {
        Ok(self.get_did_register(did).await?.providers)
    }

    pub async fn get_did_register(&self, did: B256) -> Result<DidRegisterValues> {
        let entry = self
            .contract
            .call(DIDRegistry::getDIDRegisterCall { _did: did })
            .await?;
        Ok(DidRegisterValues {
            owner: entry.owner,
            last_checksum: entry.lastChecksum,
            url: entry.url,
            last_updated_by: entry.lastUpdatedBy,
            block_number_updated: entry.blockNumberUpdated,
            providers: entry
                .providers
                .into_iter()
                .filter(|provider| !provider.is_zero())
                .collect(),
            nft_supply: entry.nftSupply,
            mint_cap: entry.mintCap,
            royalties: entry.royalties,
        })
    }

    pub async fn transfer_did_ownership(
        &self,
        did: B256,
        new_owner: Address,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::transferDIDOwnershipCall {
                    _did: did,
                    _newOwner: new_owner,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn grant_permission(&self, did: B256, grantee: Address, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::grantPermissionCall {
                    _did: did,
                    _grantee: grantee,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn revoke_permission(
        &self,
        did: B256,
        grantee: Address,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::revokePermissionCall {
                    _did: did,
                    _grantee: grantee,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn get_permission(&self, did: B256, grantee: Address) -> Result<bool> {
        self.contract
            .call(DIDRegistry::getPermissionCall {
                _did: did,
                _grantee: grantee,
            })
            .await
    }

    /// DIDs registered by `owner`, taken from the registration events.
    pub async fn get_owner_asset_ids(&self, owner: Address) -> Result<Vec<B256>> {
        let mut filter = self
            .contract
            .event_filter(
                DID_ATTRIBUTE_REGISTERED,
                argument_filters([("_owner", DynSolValue::Address(owner))]),
                BlockNumberOrTag::Earliest,
                BlockNumberOrTag::Latest,
            )
            .await?;
        let entries = filter.get_all_entries(EVENT_QUERY_TRIES).await?;
        filter.uninstall().await?;
        Ok(entries.iter().filter_map(|e| e.arg_b256("_did")).collect())
    }

    /// The registration event of the DID's last update.
    ///
    /// Fails with [`Error::DidNotFound`] for unregistered DIDs.
    pub async fn get_registered_attribute(&self, did: B256) -> Result<Option<RegisteredAttribute>> {
        let block_number = self.get_block_number_updated(did).await?;
        log::debug!("got blockNumber {block_number} for did {did}");
        if block_number.is_zero() {
            return Err(Error::DidNotFound(format!(
                "{did} in the registry at {}",
                self.contract.address()
            )));
        }
        let block_number: u64 = block_number
            .try_into()
            .map_err(|_| Error::Abi(format!("Block number {block_number} out of range")))?;

        let event = self.contract.event(DID_ATTRIBUTE_REGISTERED)?;
        let filter = Filter::new()
            .address(self.contract.address())
            .from_block(block_number)
            .to_block(block_number);
        let logs = self.contract.connection().get_logs(&filter).await?;

        let found = logs
            .iter()
            .filter_map(|log| EventLog::decode(&event, log).ok())
            .find(|entry| entry.arg_b256("_did") == Some(did));
        match found {
            Some(entry) => Ok(Some(RegisteredAttribute {
                checksum: entry.arg_b256("_checksum").unwrap_or_default(),
                value: entry.arg_string("_value").unwrap_or_default(),
                block_number,
                did,
                owner: entry.arg_address("_owner").unwrap_or_default(),
            })),
            None => {
                log::warn!(
                    "Could not find {} event logs for did {did} at blockNumber {block_number}",
                    DID_ATTRIBUTE_REGISTERED
                );
                Ok(None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn used(
        &self,
        prov_id: B256,
        did: B256,
        agent_id: Address,
        activity_id: B256,
        signature: Bytes,
        attributes: &str,
        account: &Account,
    ) -> Result<Option<Receipt>> {
        let tx_hash = self
            .contract
            .send_transaction(
                DIDRegistry::usedCall {
                    _provId: prov_id,
                    _did: did,
                    _agentId: agent_id,
                    _activityId: activity_id,
                    _signature: signature,
                    _attributes: attributes.to_string(),
                },
                TxOptions::from_account(account),
            )
            .await?;
        self.contract.get_tx_receipt(tx_hash).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn was_derived_from(
        &self,
        prov_id: B256,
        new_entity_did: B256,
        used_entity_did: B256,
        agent_id: Address,
        activity_id: B256,
        attributes: &str,
        account: &Account,
    ) -> Result<Option<Receipt>> {
        let tx_hash = self
            .contract
            .send_transaction(
                DIDRegistry::wasDerivedFromCall {
                    _provId: prov_id,
                    _newEntityDid: new_entity_did,
                    _usedEntityDid: used_entity_did,
                    _agentId: agent_id,
                    _activityId: activity_id,
                    _attributes: attributes.to_string(),
                },
                TxOptions::from_account(account),
            )
            .await?;
        self.contract.get_tx_receipt(tx_hash).await
    }

    pub async fn was_associated_with(
        &self,
        prov_id: B256,
        did: B256,
        agent_id: Address,
        activity_id: B256,
        attributes: &str,
        account: &Account,
    ) -> Result<Option<Receipt>> {
        let tx_hash = self
            .contract
            .send_transaction(
                DIDRegistry::wasAssociatedWithCall {
                    _provId: prov_id,
                    _did: did,
                    _agentId: agent_id,
                    _activityId: activity_id,
                    _attributes: attributes.to_string(),
                },
                TxOptions::from_account(account),
            )
            .await?;
        self.contract.get_tx_receipt(tx_hash).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn acted_on_behalf(
        &self,
        prov_id: B256,
        did: B256,
        delegate_agent_id: Address,
        responsible_agent_id: Address,
        activity_id: B256,
        signature: Bytes,
        attributes: &str,
        account: &Account,
    ) -> Result<Option<Receipt>> {
        let tx_hash = self
            .contract
            .send_transaction(
                DIDRegistry::actedOnBehalfCall {
                    _provId: prov_id,
                    _did: did,
                    _delegateAgentId: delegate_agent_id,
                    _responsibleAgentId: responsible_agent_id,
                    _activityId: activity_id,
                    _signature: signature,
                    _attributes: attributes.to_string(),
                },
                TxOptions::from_account(account),
            )
            .await?;
        self.contract.get_tx_receipt(tx_hash).await
    }

    pub async fn add_did_provenance_delegate(
        &self,
        did: B256,
        delegate: Address,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::addDIDProvenanceDelegateCall {
                    _did: did,
                    delegated: delegate,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn remove_did_provenance_delegate(
        &self,
        did: B256,
        delegate: Address,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::removeDIDProvenanceDelegateCall {
                    _did: did,
                    delegated: delegate,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn is_provenance_delegate(&self, did: B256, delegate: Address) -> Result<bool> {
        self.contract
            .call(DIDRegistry::isProvenanceDelegateCall {
                _did: did,
                _delegate: delegate,
            })
            .await
    }

    pub async fn get_provenance_owner(&self, did: B256) -> Result<Address> {
        self.contract
            .call(DIDRegistry::getProvenanceOwnerCall { _did: did })
            .await
    }

    pub async fn is_provenance_signature_correct(
        &self,
        agent_id: Address,
        hash: B256,
        signature: Bytes,
    ) -> Result<bool> {
        self.contract
            .call(DIDRegistry::provenanceSignatureIsCorrectCall {
                _agentId: agent_id,
                _hash: hash,
                _signature: signature,
            })
            .await
    }

    pub async fn get_provenance_entry(&self, prov_id: B256) -> Result<ProvenanceEntry> {
        let entry = self
            .contract
            .call(DIDRegistry::getProvenanceEntryCall { _provId: prov_id })
            .await?;
        Ok(ProvenanceEntry {
            did: entry.did,
            related_did: entry.relatedDid,
            agent_id: entry.agentId,
            activity_id: entry.activityId,
            agent_involved_id: entry.agentInvolvedId,
            method: entry.method,
            created_by: entry.createdBy,
            block_number_updated: entry.blockNumberUpdated,
            signature: entry.signature,
        })
    }

    /// Every `ProvenanceAttributeRegistered` event of `did`.
    pub async fn get_did_provenance_events(&self, did: B256) -> Result<Vec<ProvenanceEvent>> {
        let event_name = "ProvenanceAttributeRegistered";
        let entries = self
            .provenance_entries(event_name, "_did", did)
            .await?;
        Ok(entries
            .iter()
            .map(|entry| ProvenanceEvent {
                prov_id: entry.arg_b256("provId"),
                did: entry.arg_b256("_did").unwrap_or(did),
                agent_id: entry.arg_address("_agentId"),
                activity_id: entry.arg_b256("_activityId"),
                method: entry
                    .arg_u256("_method")
                    .and_then(|m| u8::try_from(m).ok())
                    .unwrap_or_default(),
                related_did: entry.arg_b256("_relatedDid"),
                agent_involved_id: entry.arg_address("_agentInvolvedId"),
                attributes: entry.arg_string("_attributes"),
                block_number: entry.arg_u256("_blockNumberUpdated"),
            })
            .collect())
    }

    /// Events of a single provenance relation about `did`.
    pub async fn get_provenance_method_events(
        &self,
        method: ProvenanceMethod,
        did: B256,
    ) -> Result<Vec<ProvenanceEvent>> {
        let event_name = method.event_name()?;
        let entries = self
            .provenance_entries(event_name, method.did_argument(), did)
            .await?;
        Ok(entries
            .iter()
            .map(|entry| ProvenanceEvent {
                prov_id: entry.arg_b256("provId"),
                did,
                agent_id: entry.arg_address("_agentId"),
                activity_id: entry.arg_b256("_activityId"),
                method: method as u8,
                related_did: entry.arg_b256("_usedEntityDid"),
                agent_involved_id: entry.arg_address("_responsibleAgentId"),
                attributes: entry.arg_string("_attributes"),
                block_number: entry.arg_u256("_blockNumberUpdated"),
            })
            .collect())
    }

    async fn provenance_entries(
        &self,
        event_name: &str,
        did_argument: &str,
        did: B256,
    ) -> Result<Vec<EventLog>> {
        let mut filter = self
            .contract
            .event_filter(
                event_name,
                argument_filters([(did_argument, DynSolValue::FixedBytes(did, 32))]),
                BlockNumberOrTag::Earliest,
                BlockNumberOrTag::Latest,
            )
            .await?;
        let entries = filter.get_all_entries(EVENT_QUERY_TRIES).await?;
        filter.uninstall().await?;
        if entries.is_empty() {
            log::warn!("Could not find {event_name} event logs for did {did}");
        }
        Ok(entries)
    }

    pub async fn mint(&self, did: B256, amount: U256, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::mintCall {
                    _did: did,
                    _amount: amount,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn burn(&self, did: B256, amount: U256, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::burnCall {
                    _did: did,
                    _amount: amount,
                },
                TxOptions::from_account(account),
            )
            .await
    }

    /// NFT balance of `address` for `did`.
    pub async fn balance(&self, address: Address, did: B256) -> Result<U256> {
        self.contract
            .call(DIDRegistry::balanceOfCall {
                account: address,
                id: did_to_token_id(did),
            })
            .await
    }

    pub async fn transfer_nft(
        &self,
        did: B256,
        to: Address,
        amount: U256,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::safeTransferFromCall {
                    from: account.address(),
                    to,
                    id: did_to_token_id(did),
                    amount,
                    data: Bytes::new(),
                },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn is_nft_approved_for_all(&self, account: Address, operator: Address) -> Result<bool> {
        self.contract
            .call(DIDRegistry::isApprovedForAllCall { account, operator })
            .await
    }

    pub async fn set_nft_proxy_approval(
        &self,
        operator: Address,
        approved: bool,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                DIDRegistry::setProxyApprovalCall { operator, approved },
                TxOptions::from_account(account),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provenance_methods_to_events() {
        assert_eq!(ProvenanceMethod::Used.event_name().unwrap(), "Used");
        assert_eq!(
            ProvenanceMethod::WasDerivedFrom.event_name().unwrap(),
            "WasDerivedFrom"
        );
        assert_eq!(ProvenanceMethod::WasDerivedFrom.did_argument(), "_newEntityDid");
        assert_eq!(ProvenanceMethod::ActedOnBehalf.did_argument(), "_entityDid");
        assert!(matches!(
            ProvenanceMethod::WasInformedBy.event_name(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_invalid_registrations() {
        let registration = DidRegistration::builder()
            .did_seed(B256::ZERO)
            .url("https://assets.example/ddo")
            .build();
        assert!(matches!(registration.validate(), Err(Error::InvalidArgument(_))));

        let registration = DidRegistration::builder()
            .did_seed(B256::repeat_byte(1))
            .url("not a url")
            .build();
        assert!(matches!(registration.validate(), Err(Error::InvalidArgument(_))));

        let registration = DidRegistration::builder()
            .did_seed(B256::repeat_byte(1))
            .url("https://assets.example/ddo")
            .royalties(10)
            .build();
        assert!(registration.validate().is_ok());
        assert!(registration.is_mintable());
    }
}
