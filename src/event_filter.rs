use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, EventExt};
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::Event;
use alloy::primitives::{Address, B256, TxHash, U256, keccak256};
use alloy::rpc::types::{Filter, Log};

use crate::connection::{ChainConnection, FilterId};
use crate::error::{Error, Result};

/// Timing and network quirks applied to every event filter.
#[derive(Debug, Clone)]
pub struct EventFilterConfig {
    /// Sleep between two retrieval attempts.
    pub poll_interval: Duration,
    /// Sleep before recreating a filter the node has dropped.
    pub recreate_delay: Duration,
    /// Network ids whose log API refuses wide block ranges.
    pub capped_networks: Vec<u64>,
    /// Number of blocks behind the head queried on capped networks.
    pub capped_window: u64,
}

impl Default for EventFilterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            recreate_delay: Duration::from_secs(1),
            capped_networks: vec![80001],
            capped_window: 990,
        }
    }
}

/// Lifecycle of an [`EventFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum FilterState {
    Active,
    Closed,
}

/// A decoded contract event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    pub event: String,
    pub args: BTreeMap<String, DynSolValue>,
    pub address: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
    pub log_index: Option<u64>,
}

impl EventLog {
    /// Decodes `log` as an instance of `event`, naming every argument.
    pub fn decode(event: &Event, log: &Log) -> Result<Self> {
        let decoded = event.decode_log(&log.inner.data)?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut args = BTreeMap::new();
        for input in &event.inputs {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            let value = value.ok_or_else(|| {
                Error::Abi(format!("Log is missing argument {} of {}", input.name, event.name))
            })?;
            args.insert(input.name.clone(), value);
        }

        Ok(Self {
            event: event.name.clone(),
            args,
            address: log.address(),
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
        })
    }

    pub fn arg(&self, name: &str) -> Option<&DynSolValue> {
        self.args.get(name)
    }

    pub fn arg_b256(&self, name: &str) -> Option<B256> {
        match self.arg(name)? {
            DynSolValue::FixedBytes(word, 32) => Some(*word),
            _ => None,
        }
    }

    pub fn arg_address(&self, name: &str) -> Option<Address> {
        self.arg(name)?.as_address()
    }

    pub fn arg_u256(&self, name: &str) -> Option<U256> {
        self.arg(name)?.as_uint().map(|(v, _)| v)
    }

    pub fn arg_string(&self, name: &str) -> Option<String> {
        self.arg(name)?.as_str().map(str::to_string)
    }

    pub fn arg_b256_array(&self, name: &str) -> Option<Vec<B256>> {
        self.arg(name)?
            .as_array()?
            .iter()
            .map(|v| match v {
                DynSolValue::FixedBytes(word, 32) => Some(*word),
                _ => None,
            })
            .collect()
    }
}

/// Logs carry only the keccak hash of an indexed `string` or `bytes` argument, so filters on
/// those are compared by hash.
fn indexed_values(
    event: &Event,
    argument_filters: &BTreeMap<String, DynSolValue>,
) -> Result<BTreeMap<String, DynSolValue>> {
    let mut expected = BTreeMap::new();
    for (name, value) in argument_filters {
        let indexed = event.inputs.iter().any(|input| &input.name == name && input.indexed);
        let value = match value {
            DynSolValue::String(text) if indexed => {
                DynSolValue::FixedBytes(keccak256(text.as_bytes()), 32)
            }
            DynSolValue::Bytes(bytes) if indexed => DynSolValue::FixedBytes(keccak256(bytes), 32),
            DynSolValue::Array(_) | DynSolValue::FixedArray(_) | DynSolValue::Tuple(_)
                if indexed =>
            {
                return Err(Error::InvalidArgument(format!(
                    "Can't filter {} on indexed composite argument {name}",
                    event.name
                )));
            }
            other => other.clone(),
        };
        expected.insert(name.clone(), value);
    }
    Ok(expected)
}

/// Polls a contract event with argument-equality filters.
///
/// The filter is installed on the node when created. If the node later forgets it the filter is
/// recreated with the same event and argument filters. Nodes that don't support installed filters
/// are queried with `eth_getLogs` instead.
pub struct EventFilter {
    connection: Arc<dyn ChainConnection>,
    address: Address,
    event: Event,
    argument_filters: BTreeMap<String, DynSolValue>,
    /// Argument filters as they appear in decoded logs.
    expected: BTreeMap<String, DynSolValue>,
    from_block: BlockNumberOrTag,
    to_block: BlockNumberOrTag,
    config: EventFilterConfig,
    filter: Filter,
    filter_id: Option<FilterId>,
    state: FilterState,
}

impl std::fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFilter")
            .field("event", &self.event.name)
            .field("address", &self.address)
            .field("argument_filters", &self.argument_filters)
            .field("block_range", &(self.from_block, self.to_block))
            .field("filter_id", &self.filter_id)
            .field("state", &self.state)
            .finish()
    }
}

impl EventFilter {
    /// Creates the filter and installs it on the node.
    pub async fn new(
        connection: Arc<dyn ChainConnection>,
        address: Address,
        event: Event,
        argument_filters: BTreeMap<String, DynSolValue>,
        from_block: BlockNumberOrTag,
        to_block: BlockNumberOrTag,
        config: EventFilterConfig,
    ) -> Result<Self> {
        if let Some(unknown) = argument_filters
            .keys()
            .find(|name| !event.inputs.iter().any(|input| &input.name == *name))
        {
            return Err(Error::InvalidArgument(format!(
                "Event {} has no argument named {unknown}",
                event.name
            )));
        }

        let expected = indexed_values(&event, &argument_filters)?;
        let mut filter = Self {
            connection,
            address,
            event,
            argument_filters,
            expected,
            from_block,
            to_block,
            config,
            filter: Filter::new(),
            filter_id: None,
            state: FilterState::Active,
        };
        filter.create_filter().await?;
        Ok(filter)
    }

    pub fn event_name(&self) -> &str {
        &self.event.name
    }

    pub fn argument_filters(&self) -> &BTreeMap<String, DynSolValue> {
        &self.argument_filters
    }

    pub fn block_range(&self) -> (BlockNumberOrTag, BlockNumberOrTag) {
        (self.from_block, self.to_block)
    }

    /// The descriptor used for the next query.
    pub fn descriptor(&self) -> &Filter {
        &self.filter
    }

    pub fn filter_id(&self) -> Option<FilterId> {
        self.filter_id
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.config.poll_interval = interval;
    }

    /// Rebuilds the descriptor and reinstalls it on the node.
    pub async fn recreate_filter(&mut self) -> Result<()> {
        self.create_filter().await
    }

    async fn create_filter(&mut self) -> Result<()> {
        let network_id = self.connection.network_id().await?;
        let from_block = if self.config.capped_networks.contains(&network_id) {
            let head = self.connection.block_number().await?;
            BlockNumberOrTag::Number(head.saturating_sub(self.config.capped_window))
        } else {
            self.from_block
        };

        let mut filter = Filter::new()
            .address(self.address)
            .event_signature(self.event.selector())
            .from_block(from_block)
            .to_block(self.to_block);
        for (position, input) in self.event.inputs.iter().filter(|i| i.indexed).enumerate() {
            let topic = self
                .expected
                .get(&input.name)
                .and_then(DynSolValue::as_word);
            filter = match (position, topic) {
                (0, Some(topic)) => filter.topic1(topic),
                (1, Some(topic)) => filter.topic2(topic),
                (2, Some(topic)) => filter.topic3(topic),
                _ => filter,
            };
        }

        self.filter_id = match self.connection.new_filter(&filter).await {
            Ok(id) => Some(id),
            Err(e) if e.is_method_not_found() => {
                log::debug!(
                    "Node doesn't support installed filters, querying logs for {} directly",
                    self.event.name
                );
                None
            }
            Err(e) => return Err(e),
        };
        self.filter = filter;
        Ok(())
    }

    async fn query(&self) -> Result<Vec<Log>> {
        match self.filter_id {
            Some(id) => self.connection.filter_logs(id).await,
            None => self.connection.get_logs(&self.filter).await,
        }
    }

    fn matches(&self, entry: &EventLog) -> bool {
        self.expected
            .iter()
            .all(|(name, expected)| entry.arg(name) == Some(expected))
    }

    async fn get_entries(&mut self, max_tries: u32) -> Result<Vec<EventLog>> {
        let max_tries = max_tries.max(1);
        let mut attempt = 0;

        while attempt < max_tries {
            attempt += 1;
            match self.query().await {
                Ok(logs) => {
                    let mut entries = Vec::with_capacity(logs.len());
                    for log in &logs {
                        match EventLog::decode(&self.event, log) {
                            Ok(entry) if self.matches(&entry) => entries.push(entry),
                            Ok(_) => {}
                            Err(e) => log::debug!("Skipping undecodable {} log: {e}", self.event.name),
                        }
                    }
                    if !entries.is_empty() {
                        log::debug!(
                            "Found event logs: event-name={}, range={:?}, logs={}",
                            self.event.name,
                            self.block_range(),
                            entries.len()
                        );
                    }
                    return Ok(entries);
                }
                Err(e) if e.is_method_not_found() => return Ok(vec![]),
                Err(e) if e.is_filter_not_found() => {
                    log::info!(
                        "Recreating filter (filter not found): event={}, arg-filter={:?}, from/to={:?}",
                        self.event.name,
                        self.argument_filters,
                        self.block_range()
                    );
                    if attempt < max_tries {
                        tokio::time::sleep(self.config.recreate_delay).await;
                    }
                    self.create_filter().await?;
                }
                Err(e) => return Err(e),
            }

            if max_tries > 1 && attempt < max_tries {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Ok(vec![])
    }

    /// Retrieves every log matching the filter, trying up to `max_tries` times.
    pub async fn get_all_entries(&mut self, max_tries: u32) -> Result<Vec<EventLog>> {
        self.get_entries(max_tries).await
    }

    /// Same retrieval as [`Self::get_all_entries`].
    pub async fn get_new_entries(&mut self, max_tries: u32) -> Result<Vec<EventLog>> {
        self.get_entries(max_tries).await
    }

    /// Polls until a matching log shows up or `timeout` elapses.
    pub async fn wait_for_entry(&mut self, timeout: Duration) -> Result<Option<EventLog>> {
        let start_time = tokio::time::Instant::now();
        loop {
            if let Some(entry) = self.get_all_entries(1).await?.into_iter().next() {
                return Ok(Some(entry));
            }
            if start_time.elapsed() >= timeout {
                log::debug!(
                    "No {} event within {}",
                    self.event.name,
                    humantime::format_duration(timeout)
                );
                return Ok(None);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Releases the node-side filter.
    pub async fn uninstall(&mut self) -> Result<bool> {
        let removed = match self.filter_id.take() {
            Some(id) => self.connection.uninstall_filter(id).await?,
            None => false,
        };
        self.state = FilterState::Closed;
        Ok(removed)
    }
}
