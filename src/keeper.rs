use std::collections::HashMap;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, Signature};
use bigdecimal::BigDecimal;

use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::ContractProxy;
use crate::error::{Error, Result};
use crate::signers::KeystoreSigner;
use crate::utils;
use crate::wrappers::{
    AgreementStoreManager, Condition, ConditionKind, ConditionStoreManager, Dispenser,
    DidRegistry, Nft1155, Nft721, Template, TemplateKind, Token,
};

/// Network without a token dispenser.
const NETWORK_WITHOUT_DISPENSER: &str = "pacific";

/// Every Keeper contract wrapper of one network, built from a shared [`KeeperContext`].
///
/// The registry, token and store managers are required. Conditions, templates and NFT
/// contracts are loaded when the network has an artifact for them.
#[derive(Debug, Clone)]
pub struct Keeper {
    ctx: KeeperContext,
    pub did_registry: DidRegistry,
    pub token: Token,
    pub dispenser: Option<Dispenser>,
    pub agreement_manager: AgreementStoreManager,
    pub condition_manager: ConditionStoreManager,
    pub nft: Option<Nft1155>,
    pub nft721: Option<Nft721>,
    conditions: HashMap<ConditionKind, Condition>,
    templates: HashMap<TemplateKind, Template>,
    contracts: HashMap<String, ContractProxy>,
}

/// Turns a missing artifact into `None`.
fn optional<T>(name: &str, loaded: Result<T>) -> Result<Option<T>> {
    match loaded {
        Ok(wrapper) => Ok(Some(wrapper)),
        Err(Error::ContractNotFound { network, .. }) => {
            log::debug!("Contract {name} not deployed on {network}, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl Keeper {
    pub fn new(ctx: KeeperContext) -> Result<Self> {
        let network_name = ctx.network_name();
        log::info!("Loading keeper contracts for network {network_name}");

        let dispenser = match network_name == NETWORK_WITHOUT_DISPENSER {
            true => None,
            false => Some(Dispenser::new(&ctx)?),
        };
        let did_registry = DidRegistry::new(&ctx)?;
        let token = Token::new(&ctx)?;
        let agreement_manager = AgreementStoreManager::new(&ctx)?;
        let condition_manager = ConditionStoreManager::new(&ctx)?;
        let nft = optional(Nft1155::CONTRACT_NAME, Nft1155::new(&ctx))?;
        let nft721 = optional(Nft721::CONTRACT_NAME, Nft721::new(&ctx))?;

        let mut conditions = HashMap::new();
        for kind in ConditionKind::ALL {
            if let Some(condition) = optional(kind.contract_name(), Condition::new(&ctx, kind))? {
                conditions.insert(kind, condition);
            }
        }
        let mut templates = HashMap::new();
        for kind in TemplateKind::ALL {
            if let Some(template) = optional(kind.contract_name(), Template::new(&ctx, kind))? {
                templates.insert(kind, template);
            }
        }

        let mut contracts: HashMap<String, ContractProxy> = [
            did_registry.contract(),
            token.contract(),
            agreement_manager.contract(),
            condition_manager.contract(),
        ]
        .into_iter()
        .chain(dispenser.as_ref().map(Dispenser::contract))
        .chain(nft.as_ref().map(Nft1155::contract))
        .chain(nft721.as_ref().map(Nft721::contract))
        .map(|contract| (contract.name().to_string(), contract.clone()))
        .collect();
        contracts.extend(
            conditions
                .values()
                .map(Condition::contract)
                .chain(templates.values().map(Template::contract))
                .map(|contract| (contract.name().to_string(), contract.clone())),
        );
        log::debug!("Keeper loaded {} contracts", contracts.len());

        Ok(Self {
            ctx,
            did_registry,
            token,
            dispenser,
            agreement_manager,
            condition_manager,
            nft,
            nft721,
            conditions,
            templates,
            contracts,
        })
    }

    pub fn context(&self) -> &KeeperContext {
        &self.ctx
    }

    pub fn network_name(&self) -> String {
        self.ctx.network_name()
    }

    pub fn condition(&self, kind: ConditionKind) -> Option<&Condition> {
        self.conditions.get(&kind)
    }

    pub fn template(&self, kind: TemplateKind) -> Option<&Template> {
        self.templates.get(&kind)
    }

    /// The loaded template deployed at `address`.
    pub fn template_by_address(&self, address: Address) -> Option<&Template> {
        self.templates.values().find(|t| t.address() == address)
    }

    /// Loaded contracts by contract name.
    pub fn contract_name_to_instance(&self) -> &HashMap<String, ContractProxy> {
        &self.contracts
    }

    /// A loaded contract, or a proxy built from the artifact of `name`.
    pub fn get_contract(&self, name: &str) -> Result<ContractProxy> {
        match self.contracts.get(name) {
            Some(contract) => Ok(contract.clone()),
            None => self.ctx.contract(name).inspect_err(|e| {
                log::error!("Cannot load contract {name}: {e}");
            }),
        }
    }

    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.ctx.connection().accounts().await
    }

    /// Balance of `address` in ETH.
    pub async fn get_ether_balance(&self, address: Address) -> Result<BigDecimal> {
        let wei = self.ctx.connection().balance(address).await?;
        Ok(utils::wei_to_eth(wei))
    }

    /// Signs `hash` with the EIP-191 personal message prefix, using the account's key file.
    pub fn sign_hash(&self, hash: B256, account: &Account) -> Result<Signature> {
        let key_file = account.key_file().ok_or_else(|| {
            Error::Signing(format!("Account {} has no key file", account.address()))
        })?;
        let signer = KeystoreSigner::load_keystore(&key_file, account.password().unwrap_or_default())?;
        if signer.address() != account.address() {
            return Err(Error::Signing(format!(
                "Key file {} doesn't belong to {}",
                key_file.display(),
                account.address()
            )));
        }
        signer.sign_hash(hash)
    }

    /// Recovers the signer of a raw `hash`, without any message prefix.
    pub fn ec_recover(hash: B256, signature: &Signature) -> Result<Address> {
        signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    /// Recovers the signer of `message` signed with the EIP-191 personal message prefix.
    pub fn personal_ec_recover(message: B256, signature: &Signature) -> Result<Address> {
        signature
            .recover_address_from_msg(message)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    pub fn generate_multi_value_hash(values: &[DynSolValue]) -> B256 {
        utils::generate_multi_value_hash(values)
    }
}
