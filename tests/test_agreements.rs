use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::sol_types::SolValue;
use keeper_contracts_sdk::abi::NFT721Upgradeable;
use keeper_contracts_sdk::receipt::is_tx_successful;
use keeper_contracts_sdk::wrappers::{
    Condition, ConditionKind, ConditionState, Nft721, Template, TemplateKind,
};
use keeper_contracts_sdk::{Error, Keeper, utils};
use keeper_test_utils::{
    KeeperFixture, ScriptedContract, artifact, init_logger, keeper_fixture, random_address,
    threshold_condition_abi,
};

const AGREEMENT_WAIT: Duration = Duration::from_secs(5);

fn lock_payment_args(did: B256, reward: Address, amount: u64) -> Vec<DynSolValue> {
    vec![
        DynSolValue::FixedBytes(did, 32),
        DynSolValue::Address(reward),
        DynSolValue::Uint(U256::from(amount), 256),
    ]
}

/// Creates an agreement through the access template and records it in the store.
async fn create_agreement(
    fx: &KeeperFixture,
    keeper: &Keeper,
    agreement_id: B256,
    did: B256,
    consumer: Address,
) -> anyhow::Result<B256> {
    let template = keeper.template(TemplateKind::Access).expect("access template");
    let condition_id = B256::repeat_byte(0xc1);
    assert!(
        template
            .create_agreement(
                agreement_id,
                did,
                vec![condition_id],
                vec![U256::ZERO],
                vec![U256::from(100)],
                consumer,
                &fx.owner_account(),
            )
            .await?
    );
    assert!(
        keeper
            .agreement_manager
            .create_agreement(
                agreement_id,
                did,
                vec![fx.lock_payment],
                vec![condition_id],
                vec![U256::ZERO],
                vec![U256::from(100)],
                &fx.owner_account(),
            )
            .await?
    );
    Ok(condition_id)
}

#[tokio::test]
async fn test_agreement_store() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let keeper = Keeper::new(fx.ctx.clone())?;
    let agreement_id = B256::repeat_byte(0xa1);
    let did = B256::repeat_byte(0xd1);
    let condition_id = create_agreement(&fx, &keeper, agreement_id, did, random_address()).await?;

    let agreement = keeper
        .agreement_manager
        .get_agreement(agreement_id)
        .await?
        .expect("agreement");
    assert_eq!(agreement.did, did);
    assert_eq!(agreement.owner, fx.owner);
    assert_eq!(agreement.template_id, fx.access_template);
    assert_eq!(agreement.condition_ids, vec![condition_id]);
    assert_eq!(agreement.id_seed, agreement_id);

    assert_eq!(keeper.agreement_manager.get_num_agreements().await?, U256::from(1));
    assert_eq!(
        keeper.agreement_manager.get_agreement_did_owner(agreement_id).await?,
        fx.owner
    );

    // The same id can't be stored twice.
    let duplicate = keeper
        .agreement_manager
        .create_agreement(
            agreement_id,
            did,
            vec![fx.lock_payment],
            vec![condition_id],
            vec![U256::ZERO],
            vec![U256::from(100)],
            &fx.owner_account(),
        )
        .await?;
    assert!(!duplicate);
    assert_eq!(keeper.agreement_manager.get_num_agreements().await?, U256::from(1));

    let seed = B256::repeat_byte(0x5e);
    assert_eq!(
        keeper.agreement_manager.agreement_id(seed, fx.owner).await?,
        keccak256((seed, fx.owner).abi_encode_params())
    );

    log::info!("✅ Agreement {agreement_id} stored and read back");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_agreement() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let keeper = Keeper::new(fx.ctx.clone())?;

    let start = tokio::time::Instant::now();
    let agreement = keeper
        .agreement_manager
        .get_agreement(B256::repeat_byte(0xee))
        .await?;
    assert!(agreement.is_none());
    assert!(start.elapsed() >= fx.ctx.config().event_wait_timeout);

    log::info!("✅ Unknown agreement not found");
    Ok(())
}

#[tokio::test]
async fn test_condition_store() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let keeper = Keeper::new(fx.ctx.clone())?;
    let condition_id = B256::repeat_byte(0xc2);

    let condition = keeper.condition_manager.get_condition(condition_id).await?;
    assert_eq!(condition.type_ref, fx.lock_payment);
    assert_eq!(condition.state, ConditionState::Fulfilled);
    assert_eq!(condition.time_lock, U256::ZERO);
    assert_eq!(condition.time_out, U256::from(100));
    assert_eq!(
        keeper.condition_manager.get_condition_state(condition_id).await?,
        ConditionState::Fulfilled
    );
    assert_eq!(keeper.condition_manager.get_num_condition().await?, U256::from(1));

    log::info!("✅ Condition state read from the store");
    Ok(())
}

#[tokio::test]
async fn test_fulfill_condition() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let condition = Condition::new(&fx.ctx, ConditionKind::LockPayment)?;
    let owner = fx.owner_account();
    let agreement_id = B256::repeat_byte(0xa2);
    let did = B256::repeat_byte(0xd2);
    let reward = random_address();
    let args = lock_payment_args(did, reward, 10);

    assert_eq!(
        condition.hash_values(&args).await?,
        utils::generate_multi_value_hash(&args)
    );
    assert_eq!(
        condition.generate_id(agreement_id, &args),
        utils::generate_multi_value_hash(&[
            DynSolValue::FixedBytes(agreement_id, 32),
            DynSolValue::Address(fx.lock_payment),
            DynSolValue::FixedBytes(utils::generate_multi_value_hash(&args), 32),
        ])
    );

    let can_fulfill = condition
        .call("canFulfill", &[DynSolValue::FixedBytes(agreement_id, 32)])
        .await?;
    assert_eq!(can_fulfill, vec![DynSolValue::Bool(true)]);

    let tx_hash = condition.fulfill(agreement_id, &args, &owner).await?;
    assert!(is_tx_successful(&fx.chain, tx_hash).await?);

    let event = condition
        .subscribe_condition_fulfilled(agreement_id, AGREEMENT_WAIT, BlockNumberOrTag::Earliest)
        .await?
        .expect("Fulfilled event");
    assert_eq!(event.arg_b256("_did"), Some(did));
    assert_eq!(event.arg_address("_rewardAddress"), Some(reward));
    assert_eq!(event.arg_u256("_amount"), Some(U256::from(10)));
    assert_eq!(
        event.arg_b256("_conditionId"),
        Some(keccak256([agreement_id.as_slice(), fx.lock_payment.as_slice()].concat()))
    );

    // A zero amount reverts, the transaction hash is still returned.
    let reverted = condition
        .fulfill(B256::repeat_byte(0xa3), &lock_payment_args(did, reward, 0), &owner)
        .await?;
    assert!(!is_tx_successful(&fx.chain, reverted).await?);

    let mut only_this = condition
        .get_event_filter_for_fulfilled(
            Some(agreement_id),
            BlockNumberOrTag::Earliest,
            BlockNumberOrTag::Latest,
        )
        .await?;
    assert_eq!(only_this.get_all_entries(1).await?.len(), 1);

    condition
        .fulfill(B256::repeat_byte(0xa4), &lock_payment_args(did, reward, 3), &owner)
        .await?;
    let mut all = condition
        .get_event_filter_for_fulfilled(None, BlockNumberOrTag::Earliest, BlockNumberOrTag::Latest)
        .await?;
    assert_eq!(all.get_all_entries(1).await?.len(), 2);

    assert!(
        !condition
            .abort_by_timeout(condition.generate_id(agreement_id, &args), &owner)
            .await?
    );

    log::info!("✅ Condition fulfilled and its event observed");
    Ok(())
}

#[tokio::test]
async fn test_threshold_arguments_checked_before_sending() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    fx.ctx.set_contract(
        ConditionKind::Threshold.contract_name(),
        artifact(random_address(), threshold_condition_abi()),
    );
    let condition = Condition::new(&fx.ctx, ConditionKind::Threshold)?;
    let inputs = |n: u8| {
        DynSolValue::Array(
            (1..=n)
                .map(|i| DynSolValue::FixedBytes(B256::repeat_byte(i), 32))
                .collect(),
        )
    };
    let threshold = |t: u64| DynSolValue::Uint(U256::from(t), 256);

    let result = condition
        .fulfill(B256::ZERO, &[inputs(1), threshold(1)], &fx.owner_account())
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = condition
        .fulfill(B256::ZERO, &[inputs(3), threshold(4)], &fx.owner_account())
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(fx.chain.sent_transactions().is_empty());

    condition
        .fulfill(B256::ZERO, &[inputs(3), threshold(2)], &fx.owner_account())
        .await?;
    assert_eq!(fx.chain.sent_transactions().len(), 1);

    log::info!("✅ Threshold arguments validated");
    Ok(())
}

#[tokio::test]
async fn test_template() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let keeper = Keeper::new(fx.ctx.clone())?;
    let template = Template::new(&fx.ctx, TemplateKind::Access)?;
    let agreement_id = B256::repeat_byte(0xa5);
    let did = B256::repeat_byte(0xd5);
    let consumer = random_address();
    create_agreement(&fx, &keeper, agreement_id, did, consumer).await?;

    assert_eq!(template.get_condition_types().await?, vec![fx.lock_payment]);
    assert_eq!(
        template.get_agreement_data(agreement_id).await?,
        (consumer, fx.owner)
    );
    assert_eq!(template.get_agreement_consumer(agreement_id).await?, consumer);

    let event = template
        .subscribe_agreement_created(agreement_id, AGREEMENT_WAIT, BlockNumberOrTag::Earliest)
        .await?
        .expect("AgreementCreated event");
    assert_eq!(event.arg_b256("_did"), Some(did));
    assert_eq!(event.arg_address("_accessConsumer"), Some(consumer));

    let mut by_provider = template
        .get_event_filter_for_agreement_created(
            Some(fx.owner),
            BlockNumberOrTag::Earliest,
            BlockNumberOrTag::Latest,
        )
        .await?;
    assert_eq!(by_provider.get_all_entries(1).await?.len(), 1);

    let mut other_provider = template
        .get_event_filter_for_agreement_created(
            Some(random_address()),
            BlockNumberOrTag::Earliest,
            BlockNumberOrTag::Latest,
        )
        .await?;
    assert!(other_provider.get_all_entries(1).await?.is_empty());

    log::info!("✅ Template agreement {agreement_id} created and observed");
    Ok(())
}

/// ERC-721 contract keyed by token id.
fn nft721_contract() -> ScriptedContract {
    let owners = Arc::new(Mutex::new(HashMap::<U256, Address>::new()));
    let minted = owners.clone();
    let transferred = owners.clone();
    let burnt = owners.clone();
    let counted = owners.clone();
    ScriptedContract::new()
        .on_transact::<NFT721Upgradeable::mintCall, _>(move |_, c| {
            let mut owners = minted.lock().map_err(|e| e.to_string())?;
            if owners.contains_key(&c.tokenId) {
                return Err("ERC721: token already minted".to_string());
            }
            owners.insert(c.tokenId, c.to);
            Ok(Vec::new())
        })
        .on_transact::<NFT721Upgradeable::safeTransferFromCall, _>(move |ctx, c| {
            let mut owners = transferred.lock().map_err(|e| e.to_string())?;
            if owners.get(&c.tokenId) != Some(&ctx.from) {
                return Err("ERC721: caller is not token owner".to_string());
            }
            owners.insert(c.tokenId, c.to);
            Ok(Vec::new())
        })
        .on_transact::<NFT721Upgradeable::burnCall, _>(move |ctx, c| {
            let mut owners = burnt.lock().map_err(|e| e.to_string())?;
            if owners.get(&c.tokenId) != Some(&ctx.from) {
                return Err("ERC721: caller is not token owner".to_string());
            }
            owners.remove(&c.tokenId);
            Ok(Vec::new())
        })
        .on_call::<NFT721Upgradeable::ownerOfCall, _>(move |_, c| {
            let owners = owners.lock().map_err(|e| e.to_string())?;
            let owner = owners
                .get(&c.tokenId)
                .ok_or_else(|| "ERC721: invalid token ID".to_string())?;
            Ok(owner.abi_encode().into())
        })
        .on_call::<NFT721Upgradeable::balanceOfCall, _>(move |_, c| {
            let owners = counted.lock().map_err(|e| e.to_string())?;
            let balance = owners.values().filter(|owner| **owner == c.owner).count();
            Ok(U256::from(balance).abi_encode().into())
        })
}

#[tokio::test]
async fn test_nft721() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let address = random_address();
    fx.chain.deploy(address, nft721_contract());
    fx.ctx.set_contract(
        Nft721::CONTRACT_NAME,
        artifact(address, NFT721Upgradeable::abi::contract()),
    );
    let keeper = Keeper::new(fx.ctx.clone())?;
    let nft = keeper.nft721.as_ref().expect("NFT721 contract");
    let owner = fx.owner_account();
    let did = B256::repeat_byte(0xd7);

    assert!(nft.mint(did, &owner).await?);
    assert!(!nft.mint(did, &owner).await?);
    assert_eq!(nft.owner(did).await?, fx.owner);
    assert_eq!(nft.balance(fx.owner).await?, U256::from(1));

    let buyer = random_address();
    assert!(nft.transfer_nft(did, buyer, &owner).await?);
    assert_eq!(nft.owner(did).await?, buyer);
    assert!(!nft.burn(did, &owner).await?);

    let result = nft.owner(B256::repeat_byte(0x01)).await;
    assert!(matches!(result, Err(Error::Node { .. })));

    log::info!("✅ NFT721 minted and transferred");
    Ok(())
}
