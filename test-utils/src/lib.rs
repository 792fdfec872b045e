//! Test utilities for the Keeper contracts SDK: an in-memory node, mock contracts and
//! fixtures wiring them into a [`KeeperContext`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256, Bytes, LogData, U256, keccak256};
use alloy::sol_types::{SolEvent, SolValue};
use anyhow::Result;
use keeper_contracts_sdk::abi::{
    AgreementStoreManager, AgreementTemplate, ConditionStoreManager, DIDRegistry, Dispenser,
    NeverminedToken,
};
use keeper_contracts_sdk::artifacts::DEFAULT_NETWORK_NAME;
use keeper_contracts_sdk::signers::KeystoreSigner;
use keeper_contracts_sdk::{Account, ContractArtifact, KeeperConfig, KeeperContext, StaticArtifacts};

pub mod chain;
pub mod contracts;
pub mod controller;
pub mod server;

pub use chain::{MockChain, SentTransaction, SubmittedVia};
pub use contracts::{
    CallContext, DidRegistryMock, DispenserMock, MockContract, ScriptedContract, TokenMock,
};
pub use controller::{CallOverride, CallResponse, MockController};
pub use server::MockNodeServer;

/// Version reported by the artifacts of the fixtures.
pub const TEST_CONTRACT_VERSION: &str = "v1.0.0-test";

/// Largest single dispenser request, in token units.
pub const DISPENSER_MAX_AMOUNT: u64 = 1_000;

/// Blocks a requester has to wait between two dispenser requests.
pub const DISPENSER_MIN_PERIOD: u64 = 10;

pub fn init_logger(verbose: bool) {
    let level = match verbose {
        true => log::LevelFilter::Debug,
        false => log::LevelFilter::Info,
    };
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(level)
        .try_init();
}

/// An address nothing is deployed at yet.
pub fn random_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}

pub fn artifact(address: Address, abi: JsonAbi) -> ContractArtifact {
    ContractArtifact::new(address, abi, TEST_CONTRACT_VERSION)
}

/// ABI shared by the condition contracts of the fixtures, modelled on the lock payment
/// condition.
pub fn condition_abi() -> JsonAbi {
    JsonAbi::parse([
        "function hashValues(bytes32 _did, address _rewardAddress, uint256 _amount) external view returns (bytes32)",
        "function fulfill(bytes32 _agreementId, bytes32 _did, address _rewardAddress, uint256 _amount) external returns (uint8)",
        "function abortByTimeOut(bytes32 _id) external returns (uint8)",
        "function canFulfill(bytes32 _agreementId) external view returns (bool)",
        "event Fulfilled(bytes32 indexed _agreementId, bytes32 indexed _did, bytes32 indexed _conditionId, address _rewardAddress, uint256 _amount)",
    ])
    .expect("valid condition ABI")
}

/// ABI of a threshold condition, whose arguments are validated before sending.
pub fn threshold_condition_abi() -> JsonAbi {
    JsonAbi::parse([
        "function fulfill(bytes32 _agreementId, bytes32[] _inputConditions, uint256 threshold) external returns (uint8)",
        "function abortByTimeOut(bytes32 _id) external returns (uint8)",
        "event Fulfilled(bytes32 indexed _agreementId, bytes32 indexed _id, bytes32[] _inputConditions, uint256 threshold)",
    ])
    .expect("valid threshold condition ABI")
}

/// Creates a fresh key, stores it encrypted with `password` under `dir` and returns the
/// account pointing at it.
pub fn create_keystore_account(dir: &Path, password: &str) -> Result<Account> {
    let signer = KeystoreSigner::generate();
    let path = signer.save_keystore(dir, password)?;
    Ok(Account::new(
        signer.address(),
        Some(password.to_string()),
        Some(path.display().to_string()),
    ))
}

/// `Fulfilled` log of a condition built from [`condition_abi`].
pub fn fulfilled_log(
    agreement_id: B256,
    did: B256,
    condition_id: B256,
    reward_address: Address,
    amount: U256,
) -> LogData {
    let topic0 = keccak256("Fulfilled(bytes32,bytes32,bytes32,address,uint256)");
    LogData::new_unchecked(
        vec![topic0, agreement_id, did, condition_id],
        (reward_address, amount).abi_encode_params().into(),
    )
}

/// Template contract storing agreement parties and emitting `AgreementCreated`.
pub fn template_contract(provider: Address, condition_types: Vec<Address>) -> ScriptedContract {
    let parties = Arc::new(Mutex::new(HashMap::new()));
    let stored = parties.clone();
    ScriptedContract::new()
        .on_call::<AgreementTemplate::getConditionTypesCall, _>(move |_, _| {
            Ok(condition_types.abi_encode().into())
        })
        .on_call::<AgreementTemplate::getAgreementDataCall, _>(move |_, c| {
            let (consumer, provider): (Address, Address) = stored
                .lock()
                .map_err(|e| e.to_string())?
                .get(&c._id)
                .copied()
                .unwrap_or_default();
            Ok(Bytes::from((consumer, provider).abi_encode_params()))
        })
        .on_transact::<AgreementTemplate::createAgreementCall, _>(move |ctx, c| {
            parties
                .lock()
                .map_err(|e| e.to_string())?
                .insert(c._id, (c._accessConsumer, provider));
            Ok(vec![
                AgreementTemplate::AgreementCreated {
                    _agreementId: c._id,
                    _did: c._did,
                    _accessConsumer: c._accessConsumer,
                    _accessProvider: provider,
                    _timeLocks: c._timeLocks,
                    _timeOuts: c._timeOuts,
                    _conditionIdSeeds: c._conditionIds.clone(),
                    _conditionIds: c._conditionIds,
                    _idSeed: c._id,
                    _creator: ctx.from,
                }
                .encode_log_data(),
            ])
        })
}

/// A node with the Keeper contracts deployed and a context bound to it.
pub struct KeeperFixture {
    pub chain: MockChain,
    pub ctx: KeeperContext,
    /// Unlocked node account holding tokens and ether.
    pub owner: Address,
    pub did_registry: Address,
    pub token: Address,
    pub dispenser: Address,
    pub agreement_store: Address,
    pub condition_store: Address,
    pub lock_payment: Address,
    pub access_template: Address,
    /// Every artifact deployed, to extend or rebuild contexts from.
    pub artifacts: StaticArtifacts,
}

impl KeeperFixture {
    pub fn owner_account(&self) -> Account {
        Account::unlocked(self.owner)
    }
}

/// Deploys the registry, the token, the dispenser, both store managers, the lock payment
/// condition and the access template on a fresh [`MockChain`].
pub async fn keeper_fixture() -> Result<KeeperFixture> {
    keeper_fixture_with_config(KeeperConfig::default()).await
}

pub async fn keeper_fixture_with_config(config: KeeperConfig) -> Result<KeeperFixture> {
    let chain = MockChain::new();
    let owner = chain.add_account(None);
    chain.set_balance(owner, U256::from(10u128.pow(20)));

    let did_registry = random_address();
    let token = random_address();
    let dispenser = random_address();
    let agreement_store = random_address();
    let condition_store = random_address();
    let lock_payment = random_address();
    let access_template = random_address();

    chain.deploy(did_registry, DidRegistryMock::new());
    chain.deploy(
        token,
        TokenMock::new().with_balance(owner, U256::from(10u128.pow(24))),
    );
    chain.deploy(
        dispenser,
        DispenserMock::new(U256::from(DISPENSER_MAX_AMOUNT), DISPENSER_MIN_PERIOD),
    );
    chain.deploy(agreement_store, agreement_store_contract(access_template));
    chain.deploy(condition_store, condition_store_contract(lock_payment));
    chain.deploy(lock_payment, lock_payment_contract());
    chain.deploy(
        access_template,
        template_contract(owner, vec![lock_payment]),
    );

    let network = DEFAULT_NETWORK_NAME;
    let artifacts = StaticArtifacts::new()
        .with(network, "DIDRegistry", artifact(did_registry, DIDRegistry::abi::contract()))
        .with(network, "NeverminedToken", artifact(token, NeverminedToken::abi::contract()))
        .with(network, "Dispenser", artifact(dispenser, Dispenser::abi::contract()))
        .with(
            network,
            "AgreementStoreManager",
            artifact(agreement_store, AgreementStoreManager::abi::contract()),
        )
        .with(
            network,
            "ConditionStoreManager",
            artifact(condition_store, ConditionStoreManager::abi::contract()),
        )
        .with(network, "LockPaymentCondition", artifact(lock_payment, condition_abi()))
        .with(
            network,
            "AccessTemplate",
            artifact(access_template, AgreementTemplate::abi::contract()),
        );

    let ctx = KeeperContext::builder()
        .connection(Arc::new(chain.clone()))
        .artifacts(Arc::new(artifacts.clone()))
        .config(config)
        .build()
        .await?;

    Ok(KeeperFixture {
        chain,
        ctx,
        owner,
        did_registry,
        token,
        dispenser,
        agreement_store,
        condition_store,
        lock_payment,
        access_template,
        artifacts,
    })
}

/// Agreement store recording the DID owner of every agreement, all created through
/// `template`. Agreement ids are `keccak256(abi.encode(seed, creator))`.
fn agreement_store_contract(template: Address) -> ScriptedContract {
    let agreements = Arc::new(Mutex::new(HashMap::<B256, Address>::new()));
    let created = agreements.clone();
    let templates = agreements.clone();
    let counted = agreements.clone();
    ScriptedContract::new()
        .on_transact::<AgreementStoreManager::createAgreementCall, _>(move |ctx, c| {
            let mut agreements = created.lock().map_err(|e| e.to_string())?;
            if agreements.contains_key(&c._id) {
                return Err("Id already exists".to_string());
            }
            agreements.insert(c._id, ctx.from);
            Ok(Vec::new())
        })
        .on_call::<AgreementStoreManager::getAgreementTemplateCall, _>(move |_, c| {
            let known = templates.lock().map_err(|e| e.to_string())?.contains_key(&c._id);
            let address = if known { template } else { Address::ZERO };
            Ok(address.abi_encode().into())
        })
        .on_call::<AgreementStoreManager::getAgreementDIDOwnerCall, _>(move |_, c| {
            let owner = agreements
                .lock()
                .map_err(|e| e.to_string())?
                .get(&c._id)
                .copied()
                .unwrap_or_default();
            Ok(owner.abi_encode().into())
        })
        .on_call::<AgreementStoreManager::getAgreementListSizeCall, _>(move |_, _| {
            let size = counted.lock().map_err(|e| e.to_string())?.len();
            Ok(U256::from(size).abi_encode().into())
        })
        .on_call::<AgreementStoreManager::agreementIdCall, _>(|_, c| {
            let id = keccak256((c._idSeed, c._creator).abi_encode_params());
            Ok(id.abi_encode().into())
        })
}

/// Condition store reporting every condition as fulfilled by `type_ref`.
fn condition_store_contract(type_ref: Address) -> ScriptedContract {
    ScriptedContract::new()
        .on_call::<ConditionStoreManager::getConditionCall, _>(move |ctx, _| {
            Ok(Bytes::from(
                (
                    type_ref,
                    U256::from(2u8),
                    U256::ZERO,
                    U256::from(100u8),
                    U256::from(ctx.block_number),
                )
                    .abi_encode_params(),
            ))
        })
        .on_call::<ConditionStoreManager::getConditionStateCall, _>(|_, _| {
            Ok(U256::from(2u8).abi_encode().into())
        })
        .on_call::<ConditionStoreManager::getConditionListSizeCall, _>(|_, _| {
            Ok(U256::from(1u8).abi_encode().into())
        })
}

/// Lock payment condition whose hash and fulfilment mirror the client-side computation.
fn lock_payment_contract() -> ScriptedContract {
    let abi = condition_abi();
    let hash_values = abi.function("hashValues").and_then(|f| f.first()).cloned();
    let fulfill = abi.function("fulfill").and_then(|f| f.first()).cloned();
    let abort = abi.function("abortByTimeOut").and_then(|f| f.first()).cloned();
    let can_fulfill = abi.function("canFulfill").and_then(|f| f.first()).cloned();

    let mut contract = ScriptedContract::new();
    if let Some(f) = hash_values {
        contract = contract.on_selector_call(f.selector().0, |_, input| {
            let (did, reward, amount) =
                <(B256, Address, U256)>::abi_decode_params(&input[4..]).map_err(|e| e.to_string())?;
            let packed = [did.as_slice(), reward.as_slice(), &amount.to_be_bytes::<32>()].concat();
            Ok(keccak256(packed).abi_encode().into())
        });
    }
    if let Some(f) = can_fulfill {
        contract = contract.on_selector_call(f.selector().0, |_, _| Ok(true.abi_encode().into()));
    }
    if let Some(f) = fulfill {
        contract = contract.on_selector_transact(f.selector().0, |ctx, input| {
            let (agreement_id, did, reward, amount) =
                <(B256, B256, Address, U256)>::abi_decode_params(&input[4..])
                    .map_err(|e| e.to_string())?;
            if amount.is_zero() {
                return Err("LockPaymentCondition: amount can't be zero".to_string());
            }
            let condition_id = keccak256(
                [agreement_id.as_slice(), ctx.contract.as_slice()].concat(),
            );
            Ok(vec![fulfilled_log(agreement_id, did, condition_id, reward, amount)])
        });
    }
    if let Some(f) = abort {
        contract = contract.on_selector_transact(f.selector().0, |_, _| {
            Err("Condition: timeout not reached".to_string())
        });
    }
    contract
}
