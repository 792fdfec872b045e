//! In-memory node implementing [`ChainConnection`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::BlockNumberOrTag;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, B256, Bytes, LogData, TxHash, TxKind, U256, keccak256};
use alloy::rpc::types::{Filter, FilterBlockOption, Log, TransactionRequest};
use async_trait::async_trait;
use keeper_contracts_sdk::connection::{ChainConnection, FilterId};
use keeper_contracts_sdk::error::{Error, Result};
use keeper_contracts_sdk::receipt::Receipt;

use crate::contracts::{CallContext, MockContract};
use crate::controller::{CallResponse, MockController, should_fail};

/// Chain and network id of a fresh [`MockChain`].
pub const DEFAULT_CHAIN_ID: u64 = 1337;

/// Error code geth uses for rejected transactions and unknown filters.
const SERVER_ERROR_CODE: i64 = -32000;

/// Error code geth uses for reverted calls.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// How a transaction reached the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SubmittedVia {
    /// `eth_sendRawTransaction`
    Raw,
    /// `personal_sendTransaction`
    Passphrase,
    /// `eth_sendTransaction`
    Unlocked,
}

/// A transaction accepted by the node.
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub hash: TxHash,
    pub via: SubmittedVia,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
    pub gas: Option<u64>,
    pub chain_id: Option<u64>,
    pub nonce: u64,
}

struct ChainState {
    chain_id: u64,
    network_id: u64,
    block_number: u64,
    default_account: Option<Address>,
    accounts: Vec<Address>,
    passphrases: HashMap<Address, String>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Box<dyn MockContract>>,
    receipts: HashMap<TxHash, Receipt>,
    mining: bool,
    pending: Vec<TxHash>,
    logs: Vec<Log>,
    filters: BTreeMap<FilterId, Filter>,
    next_filter_id: u64,
    sent: Vec<SentTransaction>,
    gas_estimate: u64,
    gas_price: u128,
}

impl ChainState {
    fn new() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            network_id: DEFAULT_CHAIN_ID,
            block_number: 1,
            default_account: None,
            accounts: Vec::new(),
            passphrases: HashMap::new(),
            balances: HashMap::new(),
            nonces: HashMap::new(),
            contracts: HashMap::new(),
            receipts: HashMap::new(),
            mining: true,
            pending: Vec::new(),
            logs: Vec::new(),
            filters: BTreeMap::new(),
            next_filter_id: 1,
            sent: Vec::new(),
            gas_estimate: 100_000,
            gas_price: 1_000_000_000,
        }
    }

    fn block_hash(number: u64) -> B256 {
        keccak256(number.to_be_bytes())
    }

    fn next_nonce(&mut self, from: Address) -> u64 {
        let nonce = self.nonces.entry(from).or_default();
        let current = *nonce;
        *nonce += 1;
        current
    }

    /// Mines `tx` into its own block.
    fn execute(&mut self, tx: SentTransaction) -> TxHash {
        self.block_number += 1;
        let block_number = self.block_number;
        let block_hash = Self::block_hash(block_number);
        let ctx = CallContext {
            contract: tx.to.unwrap_or_default(),
            from: tx.from,
            value: tx.value,
            block_number,
        };

        let outcome = match tx.to.and_then(|to| self.contracts.get_mut(&to)) {
            Some(contract) => contract.transact(&ctx, &tx.input),
            None => Ok(Vec::new()),
        };
        let (status, emitted) = match outcome {
            Ok(logs) => (true, logs),
            Err(reason) => {
                log::debug!("Transaction {} reverted: {reason}", tx.hash);
                (false, Vec::new())
            }
        };

        let first_index = self.logs.len() as u64;
        let logs: Vec<Log> = emitted
            .into_iter()
            .enumerate()
            .map(|(i, data)| Log {
                inner: alloy::primitives::Log {
                    address: ctx.contract,
                    data,
                },
                block_hash: Some(block_hash),
                block_number: Some(block_number),
                transaction_hash: Some(tx.hash),
                transaction_index: Some(0),
                log_index: Some(first_index + i as u64),
                ..Default::default()
            })
            .collect();
        self.logs.extend(logs.iter().cloned());

        let hash = tx.hash;
        self.receipts.insert(
            hash,
            Receipt {
                transaction_hash: hash,
                status: Some(status),
                block_number: Some(block_number),
                block_hash: Some(block_hash),
                gas_used: 21_000,
                logs,
            },
        );
        if !self.mining {
            self.pending.push(hash);
        }
        self.sent.push(tx);
        hash
    }

    fn block_range(&self, filter: &Filter) -> (u64, u64) {
        let resolve = |tag: Option<BlockNumberOrTag>, default: u64| match tag {
            Some(BlockNumberOrTag::Number(n)) => n,
            Some(BlockNumberOrTag::Earliest) => 0,
            Some(_) => self.block_number,
            None => default,
        };
        match &filter.block_option {
            FilterBlockOption::Range {
                from_block,
                to_block,
            } => (
                resolve(*from_block, self.block_number),
                resolve(*to_block, self.block_number),
            ),
            FilterBlockOption::AtBlockHash(_) => (0, self.block_number),
        }
    }

    fn matches(&self, filter: &Filter, log: &Log) -> bool {
        let (from, to) = self.block_range(filter);
        let in_range = log.block_number.is_some_and(|n| n >= from && n <= to);
        let topics_match = filter.topics.iter().enumerate().all(|(i, topic)| {
            topic.is_empty() || log.topics().get(i).is_some_and(|t| topic.matches(t))
        });
        in_range && filter.address.matches(&log.address()) && topics_match
    }

    fn select_logs(&self, filter: &Filter, logs: &[Log]) -> Vec<Log> {
        logs.iter()
            .filter(|log| self.matches(filter, log))
            .cloned()
            .collect()
    }
}

fn node_error(message: impl Into<String>) -> Error {
    Error::node(SERVER_ERROR_CODE, message)
}

enum Intercept {
    Proceed,
    Null,
}

/// A single-node chain kept in memory. Clones share state.
///
/// Every transaction is mined into its own block as soon as it is accepted. With mining
/// switched off the receipts stay hidden until [`MockChain::mine_pending`].
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
    controller: MockController,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::new())),
            controller: MockController::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.lock().chain_id = chain_id;
        self
    }

    pub fn with_network_id(self, network_id: u64) -> Self {
        self.lock().network_id = network_id;
        self
    }

    pub fn with_default_account(self, account: Address) -> Self {
        self.lock().default_account = Some(account);
        self
    }

    pub fn controller(&self) -> &MockController {
        &self.controller
    }

    /// Number of times the node received `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.controller.call_count(method)
    }

    /// Creates a node account. Accounts without a passphrase are unlocked.
    pub fn add_account(&self, passphrase: Option<&str>) -> Address {
        let address = Address::from(rand::random::<[u8; 20]>());
        self.add_account_address(address, passphrase);
        address
    }

    pub fn add_account_address(&self, address: Address, passphrase: Option<&str>) {
        let mut state = self.lock();
        if !state.accounts.contains(&address) {
            state.accounts.push(address);
        }
        match passphrase {
            Some(passphrase) => state.passphrases.insert(address, passphrase.to_string()),
            None => state.passphrases.remove(&address),
        };
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.lock().balances.insert(address, balance);
    }

    pub fn deploy(&self, address: Address, contract: impl MockContract + 'static) {
        self.lock().contracts.insert(address, Box::new(contract));
    }

    pub fn block_number(&self) -> u64 {
        self.lock().block_number
    }

    pub fn set_block_number(&self, block_number: u64) {
        self.lock().block_number = block_number;
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.lock().gas_estimate = gas;
    }

    /// With mining off, accepted transactions get no receipt until [`Self::mine_pending`].
    pub fn set_mining(&self, mining: bool) {
        self.lock().mining = mining;
    }

    /// Releases the receipts of transactions accepted while mining was off.
    pub fn mine_pending(&self) -> usize {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        pending.len()
    }

    /// Emits a log from `address` in a new block, outside of any transaction.
    pub fn emit_log(&self, address: Address, data: LogData) -> Log {
        let mut state = self.lock();
        state.block_number += 1;
        let block_number = state.block_number;
        let log = Log {
            inner: alloy::primitives::Log { address, data },
            block_hash: Some(ChainState::block_hash(block_number)),
            block_number: Some(block_number),
            transaction_hash: Some(keccak256(block_number.to_le_bytes())),
            transaction_index: Some(0),
            log_index: Some(state.logs.len() as u64),
            ..Default::default()
        };
        state.logs.push(log.clone());
        log
    }

    pub fn sent_transactions(&self) -> Vec<SentTransaction> {
        self.lock().sent.clone()
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.lock().nonces.get(&address).copied().unwrap_or_default()
    }

    /// Descriptors of the filters currently installed.
    pub fn installed_filters(&self) -> Vec<Filter> {
        self.lock().filters.values().cloned().collect()
    }

    /// Forgets every installed filter, like a node restart does.
    pub fn drop_filters(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.filters.len();
        state.filters.clear();
        dropped
    }

    fn intercept(&self, method: &str) -> Result<Intercept> {
        self.controller.record_call(method);
        let Some(active) = self.controller.take_next_override(method) else {
            return Ok(Intercept::Proceed);
        };
        log::debug!("{}: applying {}", active.endpoint_name, active.response);
        match active.response() {
            CallResponse::Error(message) => Err(Error::Transport(message.clone())),
            CallResponse::NodeError { code, message } => Err(Error::node(*code, message.clone())),
            CallResponse::Null => Ok(Intercept::Null),
            CallResponse::Success => Ok(Intercept::Proceed),
            CallResponse::FailEachNth { error, frequency } => {
                match should_fail(*frequency, active.call_count) {
                    true => Err(Error::Transport(error.clone())),
                    false => Ok(Intercept::Proceed),
                }
            }
        }
    }

    /// Like [`Self::intercept`] for methods that can't answer `null`.
    fn intercept_value(&self, method: &str) -> Result<()> {
        match self.intercept(method)? {
            Intercept::Proceed => Ok(()),
            Intercept::Null => Err(Error::Transport(format!("{method}: null response"))),
        }
    }

    fn accept_node_signed(
        &self,
        tx: TransactionRequest,
        via: SubmittedVia,
        passphrase: Option<&str>,
    ) -> Result<TxHash> {
        let mut state = self.lock();
        let from = tx
            .from
            .ok_or_else(|| node_error("missing sender of the transaction"))?;
        if !state.accounts.contains(&from) {
            return Err(node_error(format!("unknown account {from}")));
        }
        match (state.passphrases.get(&from), passphrase) {
            (Some(expected), Some(given)) if expected != given => {
                return Err(node_error("could not decrypt key with given password"));
            }
            (Some(_), None) => return Err(node_error("authentication needed: password or unlock")),
            _ => {}
        }

        let nonce = state.next_nonce(from);
        let input = tx.input.input().cloned().unwrap_or_default();
        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&input);
        let hash = keccak256(preimage);

        let to = match tx.to {
            Some(TxKind::Call(to)) => Some(to),
            _ => None,
        };
        Ok(state.execute(SentTransaction {
            hash,
            via,
            from,
            to,
            input,
            value: tx.value.unwrap_or_default(),
            gas: tx.gas,
            chain_id: tx.chain_id,
            nonce,
        }))
    }
}

#[async_trait]
impl ChainConnection for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        self.intercept_value("eth_chainId")?;
        Ok(self.lock().chain_id)
    }

    async fn network_id(&self) -> Result<u64> {
        self.intercept_value("net_version")?;
        Ok(self.lock().network_id)
    }

    async fn block_number(&self) -> Result<u64> {
        self.intercept_value("eth_blockNumber")?;
        Ok(self.lock().block_number)
    }

    fn default_account(&self) -> Option<Address> {
        self.lock().default_account
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.intercept_value("eth_accounts")?;
        Ok(self.lock().accounts.clone())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.intercept_value("eth_getBalance")?;
        Ok(self.lock().balances.get(&address).copied().unwrap_or_default())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.intercept_value("eth_getTransactionCount")?;
        Ok(self.nonce(address))
    }

    async fn gas_price(&self) -> Result<u128> {
        self.intercept_value("eth_gasPrice")?;
        Ok(self.lock().gas_price)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64> {
        self.intercept_value("eth_estimateGas")?;
        Ok(self.lock().gas_estimate)
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.intercept_value("eth_call")?;
        let state = self.lock();
        let Some(TxKind::Call(to)) = tx.to else {
            return Err(node_error("eth_call without a target"));
        };
        let Some(contract) = state.contracts.get(&to) else {
            return Ok(Bytes::new());
        };
        let ctx = CallContext {
            contract: to,
            from: tx.from.unwrap_or_default(),
            value: tx.value.unwrap_or_default(),
            block_number: state.block_number,
        };
        let input = tx.input.input().cloned().unwrap_or_default();
        contract.call(&ctx, &input).map_err(|reason| {
            Error::node(
                EXECUTION_REVERTED_CODE,
                format!("execution reverted: {reason}"),
            )
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        self.intercept_value("eth_sendTransaction")?;
        self.accept_node_signed(tx, SubmittedVia::Unlocked, None)
    }

    async fn send_transaction_with_passphrase(
        &self,
        tx: TransactionRequest,
        passphrase: &str,
    ) -> Result<TxHash> {
        self.intercept_value("personal_sendTransaction")?;
        self.accept_node_signed(tx, SubmittedVia::Passphrase, Some(passphrase))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash> {
        self.intercept_value("eth_sendRawTransaction")?;
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| node_error(format!("rlp: {e}")))?;
        let from = envelope
            .recover_signer()
            .map_err(|e| node_error(format!("invalid sender: {e}")))?;

        let mut state = self.lock();
        if envelope.chain_id() != Some(state.chain_id) {
            return Err(node_error("invalid chain id for signer"));
        }
        let expected = state.nonces.get(&from).copied().unwrap_or_default();
        match envelope.nonce().cmp(&expected) {
            std::cmp::Ordering::Less => return Err(node_error("nonce too low")),
            std::cmp::Ordering::Greater => return Err(node_error("nonce too high")),
            std::cmp::Ordering::Equal => {}
        }
        state.next_nonce(from);

        Ok(state.execute(SentTransaction {
            hash: keccak256(raw),
            via: SubmittedVia::Raw,
            from,
            to: envelope.to(),
            input: envelope.input().clone(),
            value: envelope.value(),
            gas: Some(envelope.gas_limit()),
            chain_id: envelope.chain_id(),
            nonce: envelope.nonce(),
        }))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>> {
        if let Intercept::Null = self.intercept("eth_getTransactionReceipt")? {
            return Ok(None);
        }
        let state = self.lock();
        if state.pending.contains(&hash) {
            return Ok(None);
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn new_filter(&self, filter: &Filter) -> Result<FilterId> {
        self.intercept_value("eth_newFilter")?;
        let mut state = self.lock();
        let id = U256::from(state.next_filter_id);
        state.next_filter_id += 1;
        state.filters.insert(id, filter.clone());
        Ok(id)
    }

    async fn uninstall_filter(&self, id: FilterId) -> Result<bool> {
        self.intercept_value("eth_uninstallFilter")?;
        Ok(self.lock().filters.remove(&id).is_some())
    }

    async fn filter_logs(&self, id: FilterId) -> Result<Vec<Log>> {
        self.intercept_value("eth_getFilterLogs")?;
        let state = self.lock();
        let filter = state
            .filters
            .get(&id)
            .ok_or_else(|| node_error("filter not found"))?;
        Ok(state.select_logs(filter, &state.logs))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.intercept_value("eth_getLogs")?;
        let state = self.lock();
        Ok(state.select_logs(filter, &state.logs))
    }
}
