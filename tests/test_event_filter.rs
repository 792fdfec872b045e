use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::Event;
use alloy::primitives::{Address, U256, keccak256};
use alloy::rpc::types::FilterBlockOption;
use alloy::sol;
use alloy::sol_types::SolEvent;
use keeper_contracts_sdk::abi::NeverminedToken;
use keeper_contracts_sdk::contract::argument_filters;
use keeper_contracts_sdk::event_filter::FilterState;
use keeper_contracts_sdk::{Error, EventFilter, EventFilterConfig};
use keeper_test_utils::{CallOverride, CallResponse, MockChain, init_logger, random_address};

sol! {
    #[sol(abi)]
    contract Registry {
        event Named(string indexed name, bytes indexed tag, uint256 value);
        event Tagged(uint256[] indexed ids);
    }
}

fn registry_event(name: &str) -> Event {
    Registry::abi::contract()
        .event(name)
        .and_then(|events| events.first())
        .cloned()
        .expect("event in the registry ABI")
}

fn transfer_event() -> Event {
    NeverminedToken::abi::contract()
        .event("Transfer")
        .and_then(|events| events.first())
        .cloned()
        .expect("Transfer event in the token ABI")
}

fn emit_transfer(chain: &MockChain, token: Address, from: Address, value: u64) {
    chain.emit_log(
        token,
        NeverminedToken::Transfer {
            from,
            to: random_address(),
            value: U256::from(value),
        }
        .encode_log_data(),
    );
}

async fn transfer_filter(chain: &MockChain, token: Address) -> anyhow::Result<EventFilter> {
    Ok(EventFilter::new(
        Arc::new(chain.clone()),
        token,
        transfer_event(),
        Default::default(),
        BlockNumberOrTag::Earliest,
        BlockNumberOrTag::Latest,
        EventFilterConfig::default(),
    )
    .await?)
}

fn from_block(filter: &EventFilter) -> Option<BlockNumberOrTag> {
    match &filter.descriptor().block_option {
        FilterBlockOption::Range { from_block, .. } => *from_block,
        FilterBlockOption::AtBlockHash(_) => None,
    }
}

#[tokio::test]
async fn test_all_entries_and_argument_filters() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let token = random_address();
    let alice = random_address();
    let bob = random_address();
    emit_transfer(&chain, token, alice, 1);
    emit_transfer(&chain, token, bob, 2);
    emit_transfer(&chain, random_address(), alice, 3);
    emit_transfer(&chain, token, alice, 4);

    let mut all = transfer_filter(&chain, token).await?;
    assert_eq!(all.get_all_entries(1).await?.len(), 3);

    let mut from_alice = EventFilter::new(
        Arc::new(chain.clone()),
        token,
        transfer_event(),
        argument_filters([("from", DynSolValue::Address(alice))]),
        BlockNumberOrTag::Earliest,
        BlockNumberOrTag::Latest,
        EventFilterConfig::default(),
    )
    .await?;
    let entries = from_alice.get_new_entries(1).await?;
    let values: Vec<U256> = entries.iter().filter_map(|e| e.arg_u256("value")).collect();
    assert_eq!(values, vec![U256::from(1), U256::from(4)]);
    assert!(entries.iter().all(|e| e.event == "Transfer"));
    assert!(entries.iter().all(|e| e.arg_address("from") == Some(alice)));

    let result = EventFilter::new(
        Arc::new(chain.clone()),
        token,
        transfer_event(),
        argument_filters([("sender", DynSolValue::Address(alice))]),
        BlockNumberOrTag::Earliest,
        BlockNumberOrTag::Latest,
        EventFilterConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    log::info!("✅ Event filter returned the matching logs only");
    Ok(())
}

#[tokio::test]
async fn test_indexed_dynamic_arguments_filtered_by_hash() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let registry = random_address();
    for (name, tag, value) in [("alice", "a", 1u64), ("bob", "b", 2), ("alice", "b", 3)] {
        chain.emit_log(
            registry,
            Registry::Named {
                name: keccak256(name.as_bytes()),
                tag: keccak256(tag.as_bytes()),
                value: U256::from(value),
            }
            .encode_log_data(),
        );
    }

    let by_args = |filters: BTreeMap<String, DynSolValue>| {
        EventFilter::new(
            Arc::new(chain.clone()),
            registry,
            registry_event("Named"),
            filters,
            BlockNumberOrTag::Earliest,
            BlockNumberOrTag::Latest,
            EventFilterConfig::default(),
        )
    };

    let mut by_name = by_args(argument_filters([(
        "name",
        DynSolValue::String("alice".to_string()),
    )]))
    .await?;
    let values: Vec<U256> = by_name
        .get_all_entries(1)
        .await?
        .iter()
        .filter_map(|e| e.arg_u256("value"))
        .collect();
    assert_eq!(values, vec![U256::from(1), U256::from(3)]);
    // The caller's value is kept, only the installed topic is hashed.
    assert_eq!(
        by_name.argument_filters().get("name"),
        Some(&DynSolValue::String("alice".to_string()))
    );

    let mut by_both = by_args(argument_filters([
        ("name", DynSolValue::String("alice".to_string())),
        ("tag", DynSolValue::Bytes(b"b".to_vec())),
    ]))
    .await?;
    let entries = by_both.get_all_entries(1).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].arg_u256("value"), Some(U256::from(3)));

    let result = EventFilter::new(
        Arc::new(chain.clone()),
        registry,
        registry_event("Tagged"),
        argument_filters([(
            "ids",
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(1), 256)]),
        )]),
        BlockNumberOrTag::Earliest,
        BlockNumberOrTag::Latest,
        EventFilterConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    log::info!("✅ Indexed string and bytes arguments matched by hash");
    Ok(())
}

#[tokio::test]
async fn test_block_window_on_capped_network() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new().with_network_id(80001);
    chain.set_block_number(5_000);
    let filter = transfer_filter(&chain, random_address()).await?;
    assert_eq!(from_block(&filter), Some(BlockNumberOrTag::Number(4_010)));
    // The requested range is kept, only the installed descriptor is narrowed.
    assert_eq!(
        filter.block_range(),
        (BlockNumberOrTag::Earliest, BlockNumberOrTag::Latest)
    );

    chain.set_block_number(500);
    let filter = transfer_filter(&chain, random_address()).await?;
    assert_eq!(from_block(&filter), Some(BlockNumberOrTag::Number(0)));

    let uncapped = MockChain::new();
    uncapped.set_block_number(5_000);
    let filter = transfer_filter(&uncapped, random_address()).await?;
    assert_eq!(from_block(&filter), Some(BlockNumberOrTag::Earliest));

    log::info!("✅ Filters on the capped network start 990 blocks behind the head");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_filter_recreated_when_node_forgets_it() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let token = random_address();
    let mut filter = transfer_filter(&chain, token).await?;
    let first_id = filter.filter_id();
    emit_transfer(&chain, token, random_address(), 1);
    emit_transfer(&chain, token, random_address(), 2);

    assert_eq!(chain.drop_filters(), 1);
    let entries = filter.get_all_entries(3).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(chain.call_count("eth_newFilter"), 2);
    assert_ne!(filter.filter_id(), first_id);
    assert_eq!(chain.installed_filters().len(), 1);

    chain
        .controller()
        .override_rpc("eth_getFilterLogs", CallOverride::Always(CallResponse::filter_not_found()));
    assert!(filter.get_all_entries(2).await?.is_empty());
    assert_eq!(chain.call_count("eth_newFilter"), 4);

    log::info!("✅ Dropped filter was installed again");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_recreation_keeps_arguments_and_reads_repeat() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let token = random_address();
    let alice = random_address();
    emit_transfer(&chain, token, alice, 1);
    emit_transfer(&chain, token, random_address(), 2);
    emit_transfer(&chain, token, alice, 3);

    let mut filter = EventFilter::new(
        Arc::new(chain.clone()),
        token,
        transfer_event(),
        argument_filters([("from", DynSolValue::Address(alice))]),
        BlockNumberOrTag::Earliest,
        BlockNumberOrTag::Latest,
        EventFilterConfig::default(),
    )
    .await?;
    let arguments = filter.argument_filters().clone();
    let descriptor = filter.descriptor().clone();

    let first = filter.get_all_entries(1).await?;
    let second = filter.get_all_entries(1).await?;
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);

    assert_eq!(chain.drop_filters(), 1);
    let after_recreation = filter.get_all_entries(2).await?;
    assert_eq!(after_recreation, first);
    assert_eq!(chain.call_count("eth_newFilter"), 2);
    assert_eq!(filter.event_name(), "Transfer");
    assert_eq!(filter.argument_filters(), &arguments);
    assert_eq!(filter.descriptor(), &descriptor);

    log::info!("✅ Recreated filter kept its event and argument filters");
    Ok(())
}

#[tokio::test]
async fn test_method_not_found_yields_no_entries() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let token = random_address();
    emit_transfer(&chain, token, random_address(), 1);

    let mut filter = transfer_filter(&chain, token).await?;
    chain.controller().override_rpc(
        "eth_getFilterLogs",
        CallOverride::Once(CallResponse::method_not_found()),
    );
    assert!(filter.get_all_entries(5).await?.is_empty());
    assert_eq!(chain.call_count("eth_getFilterLogs"), 1);

    // Nodes without installable filters are queried with eth_getLogs instead.
    chain.controller().override_rpc(
        "eth_newFilter",
        CallOverride::Once(CallResponse::method_not_found()),
    );
    let mut stateless = transfer_filter(&chain, token).await?;
    assert_eq!(stateless.filter_id(), None);
    assert_eq!(stateless.get_all_entries(1).await?.len(), 1);
    assert_eq!(chain.call_count("eth_getLogs"), 1);

    chain.controller().override_rpc(
        "eth_getLogs",
        CallOverride::Once(CallResponse::method_not_found()),
    );
    assert!(stateless.get_all_entries(1).await?.is_empty());

    log::info!("✅ Unsupported log methods were treated as no entries");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retrieval_attempts_without_sleeping() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let mut filter = transfer_filter(&chain, random_address()).await?;

    for max_tries in [0, 1, 5] {
        let start = tokio::time::Instant::now();
        assert!(filter.get_all_entries(max_tries).await?.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
    assert_eq!(chain.call_count("eth_getFilterLogs"), 3);

    chain.controller().override_rpc(
        "eth_getFilterLogs",
        CallOverride::Once(CallResponse::Error("connection reset".to_string())),
    );
    assert!(matches!(
        filter.get_all_entries(5).await,
        Err(Error::Transport(_))
    ));

    log::info!("✅ Single attempts returned without waiting");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_entry_and_uninstall() -> anyhow::Result<()> {
    init_logger(false);

    let chain = MockChain::new();
    let token = random_address();
    let mut filter = transfer_filter(&chain, token).await?;

    let start = tokio::time::Instant::now();
    assert!(filter.wait_for_entry(Duration::from_secs(3)).await?.is_none());
    assert!(start.elapsed() >= Duration::from_secs(3));

    emit_transfer(&chain, token, random_address(), 9);
    let entry = filter.wait_for_entry(Duration::from_secs(3)).await?;
    assert_eq!(entry.and_then(|e| e.arg_u256("value")), Some(U256::from(9)));

    assert_eq!(filter.state(), FilterState::Active);
    assert!(filter.uninstall().await?);
    assert_eq!(filter.state(), FilterState::Closed);
    assert!(chain.installed_filters().is_empty());

    log::info!("✅ Waited for the entry and released the filter");
    Ok(())
}
