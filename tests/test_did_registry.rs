use alloy::primitives::{Address, B256, Bytes, U256};
use keeper_contracts_sdk::wrappers::{DidRegistration, DidRegistry, ProvenanceMethod};
use keeper_contracts_sdk::{Error, utils};
use keeper_test_utils::{DidRegistryMock, KeeperFixture, init_logger, keeper_fixture, random_address};

const ASSET_URL: &str = "https://metadata.keeper.example/api/v1/ddo";

fn registration(seed: u8) -> DidRegistration {
    DidRegistration::builder()
        .did_seed(B256::repeat_byte(seed))
        .checksum(B256::repeat_byte(0xcc))
        .url(ASSET_URL)
        .build()
}

async fn registered_did(fx: &KeeperFixture, registry: &DidRegistry, seed: u8) -> anyhow::Result<B256> {
    assert!(registry.register(registration(seed), &fx.owner_account()).await?);
    Ok(registry.hash_did(B256::repeat_byte(seed), fx.owner).await?)
}

#[tokio::test]
async fn test_register_did() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;
    let provider = random_address();
    let seed = B256::repeat_byte(7);

    let registered = registry
        .register(
            DidRegistration::builder()
                .did_seed(seed)
                .checksum(B256::repeat_byte(0xcc))
                .url(ASSET_URL)
                .providers(vec![provider])
                .build(),
            &fx.owner_account(),
        )
        .await?;
    assert!(registered);

    let did = registry.hash_did(seed, fx.owner).await?;
    assert_eq!(did, DidRegistryMock::hash_did(seed, fx.owner));
    assert_eq!(registry.get_did_owner(did).await?, fx.owner);
    assert!(registry.is_did_provider(did, provider).await?);

    let values = registry.get_did_register(did).await?;
    assert_eq!(values.owner, fx.owner);
    assert_eq!(values.url, ASSET_URL);
    assert_eq!(values.last_checksum, B256::repeat_byte(0xcc));
    assert_eq!(values.providers, vec![provider]);
    assert_eq!(values.mint_cap, U256::ZERO);

    let attribute = registry
        .get_registered_attribute(did)
        .await?
        .expect("registration event");
    assert_eq!(attribute.did, did);
    assert_eq!(attribute.owner, fx.owner);
    assert_eq!(attribute.value, ASSET_URL);
    assert_eq!(
        U256::from(attribute.block_number),
        registry.get_block_number_updated(did).await?
    );

    assert_eq!(registry.get_owner_asset_ids(fx.owner).await?, vec![did]);
    assert!(registry.get_owner_asset_ids(random_address()).await?.is_empty());

    log::info!("✅ DID {did} registered and read back");
    Ok(())
}

#[tokio::test]
async fn test_register_rejects_invalid_input() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;

    let no_seed = DidRegistration::builder().did_seed(B256::ZERO).url(ASSET_URL).build();
    let result = registry.register(no_seed, &fx.owner_account()).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let bad_url = DidRegistration::builder()
        .did_seed(B256::repeat_byte(1))
        .url("metadata")
        .build();
    let result = registry.register(bad_url, &fx.owner_account()).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(fx.chain.sent_transactions().is_empty());

    let result = registry.get_registered_attribute(B256::repeat_byte(9)).await;
    assert!(matches!(result, Err(Error::DidNotFound(_))));

    // Royalties above 100% revert on-chain.
    let registered = registry
        .register_mintable_did(registration(2), U256::from(10), 101, &fx.owner_account())
        .await?;
    assert!(!registered);

    log::info!("✅ Invalid registrations were refused");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_register_confirmed_by_event_without_receipt() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;
    fx.chain.set_mining(false);

    assert!(registry.register(registration(3), &fx.owner_account()).await?);
    assert!(fx.chain.call_count("eth_getTransactionReceipt") > 1);
    assert!(fx.chain.call_count("eth_newFilter") >= 1);

    log::info!("✅ Registration confirmed through the registry event");
    Ok(())
}

#[tokio::test]
async fn test_providers_permissions_and_ownership() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;
    let owner = fx.owner_account();
    let did = registered_did(&fx, &registry, 4).await?;

    let first = random_address();
    let second = random_address();
    assert!(registry.add_provider(did, first, &owner).await?);
    assert!(registry.add_provider(did, second, &owner).await?);
    assert!(registry.remove_provider(did, first, &owner).await?);
    assert!(!registry.is_did_provider(did, first).await?);
    assert_eq!(registry.get_did_providers(did).await?, vec![second]);

    let grantee = random_address();
    assert!(!registry.get_permission(did, grantee).await?);
    assert!(registry.grant_permission(did, grantee, &owner).await?);
    assert!(registry.get_permission(did, grantee).await?);
    assert!(registry.revoke_permission(did, grantee, &owner).await?);
    assert!(!registry.get_permission(did, grantee).await?);

    let new_owner = fx.chain.add_account(None);
    assert!(registry.transfer_did_ownership(did, new_owner, &owner).await?);
    assert_eq!(registry.get_did_owner(did).await?, new_owner);
    // The previous owner can no longer change the DID.
    assert!(!registry.add_provider(did, first, &owner).await?);

    log::info!("✅ Providers, permissions and ownership updated");
    Ok(())
}

#[tokio::test]
async fn test_provenance() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;
    let owner = fx.owner_account();
    let did = registered_did(&fx, &registry, 5).await?;

    let delegate = random_address();
    assert!(registry.add_did_provenance_delegate(did, delegate, &owner).await?);
    assert!(registry.is_provenance_delegate(did, delegate).await?);
    assert!(registry.remove_did_provenance_delegate(did, delegate, &owner).await?);
    assert!(!registry.is_provenance_delegate(did, delegate).await?);
    assert_eq!(registry.get_provenance_owner(did).await?, fx.owner);

    let prov_id = B256::repeat_byte(0x11);
    let activity_id = B256::repeat_byte(0x22);
    let receipt = registry
        .used(prov_id, did, fx.owner, activity_id, Bytes::new(), "downloaded", &owner)
        .await?
        .expect("receipt");
    assert!(receipt.is_success());
    assert_eq!(receipt.logs.len(), 2);

    let events = registry.get_did_provenance_events(did).await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].prov_id, Some(prov_id));
    assert_eq!(events[0].activity_id, Some(activity_id));
    assert_eq!(events[0].method, ProvenanceMethod::Used as u8);
    assert_eq!(events[0].attributes.as_deref(), Some("downloaded"));

    let used = registry
        .get_provenance_method_events(ProvenanceMethod::Used, did)
        .await?;
    assert_eq!(used.len(), 1);
    assert_eq!(used[0].agent_id, Some(fx.owner));

    let result = registry
        .get_provenance_method_events(ProvenanceMethod::WasInformedBy, did)
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    log::info!("✅ Provenance recorded and queried");
    Ok(())
}

#[tokio::test]
async fn test_did_nfts() -> anyhow::Result<()> {
    init_logger(false);

    let fx = keeper_fixture().await?;
    let registry = DidRegistry::new(&fx.ctx)?;
    let owner = fx.owner_account();

    assert!(
        registry
            .register_mintable_did(registration(6), U256::from(10), 5, &owner)
            .await?
    );
    let did = registry.hash_did(B256::repeat_byte(6), fx.owner).await?;
    let values = registry.get_did_register(did).await?;
    assert_eq!(values.mint_cap, U256::from(10));
    assert_eq!(values.royalties, U256::from(5));

    assert!(registry.mint(did, U256::from(4), &owner).await?);
    assert!(!registry.mint(did, U256::from(7), &owner).await?);
    assert_eq!(registry.balance(fx.owner, did).await?, U256::from(4));
    assert_eq!(utils::did_to_token_id(did), U256::from_be_bytes(did.0));

    let buyer: Address = random_address();
    assert!(registry.transfer_nft(did, buyer, U256::from(1), &owner).await?);
    assert_eq!(registry.balance(buyer, did).await?, U256::from(1));
    assert!(registry.burn(did, U256::from(3), &owner).await?);
    assert_eq!(registry.balance(fx.owner, did).await?, U256::ZERO);
    assert_eq!(registry.get_did_register(did).await?.nft_supply, U256::from(1));

    let operator = random_address();
    assert!(!registry.is_nft_approved_for_all(fx.owner, operator).await?);
    assert!(registry.set_nft_proxy_approval(operator, true, &owner).await?);
    assert!(registry.is_nft_approved_for_all(fx.owner, operator).await?);

    assert!(
        registry
            .are_royalties_valid(did, vec![U256::from(95), U256::from(5)], vec![buyer, fx.owner])
            .await?
    );
    assert!(
        !registry
            .are_royalties_valid(did, vec![U256::from(100)], vec![buyer])
            .await?
    );

    log::info!("✅ DID NFTs minted, transferred and burnt");
    Ok(())
}
