//! In-memory contracts executed by [`MockChain`](crate::chain::MockChain).

use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, B256, Bytes, LogData, U256, keccak256};
use alloy::sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use keeper_contracts_sdk::abi::DIDRegistry::{self, DIDRegistryCalls};
use keeper_contracts_sdk::abi::Dispenser::{self, DispenserCalls};
use keeper_contracts_sdk::abi::NeverminedToken::{self, NeverminedTokenCalls};

/// Environment of a single call or transaction.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub contract: Address,
    pub from: Address,
    pub value: U256,
    pub block_number: u64,
}

/// A contract deployed on the mock chain.
///
/// `call` serves `eth_call` and must not change state. `transact` executes a mined
/// transaction and returns the emitted logs; an `Err` reverts with that reason.
pub trait MockContract: Send {
    fn call(&self, ctx: &CallContext, input: &[u8]) -> Result<Bytes, String>;

    fn transact(&mut self, ctx: &CallContext, input: &[u8]) -> Result<Vec<LogData>, String>;
}

type CallHandler = Box<dyn Fn(&CallContext, &[u8]) -> Result<Bytes, String> + Send>;
type TxHandler = Box<dyn FnMut(&CallContext, &[u8]) -> Result<Vec<LogData>, String> + Send>;

/// A contract whose functions are answered by closures, keyed by selector.
/// Unknown selectors revert.
#[derive(Default)]
pub struct ScriptedContract {
    calls: HashMap<[u8; 4], CallHandler>,
    transactions: HashMap<[u8; 4], TxHandler>,
}

impl ScriptedContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the read-only call `C`.
    pub fn on_call<C, F>(self, handler: F) -> Self
    where
        C: SolCall,
        F: Fn(&CallContext, C) -> Result<Bytes, String> + Send + 'static,
    {
        self.on_selector_call(C::SELECTOR, move |ctx, input| {
            let call = C::abi_decode(input).map_err(|e| e.to_string())?;
            handler(ctx, call)
        })
    }

    /// Executes transactions calling `C`.
    pub fn on_transact<C, F>(self, mut handler: F) -> Self
    where
        C: SolCall,
        F: FnMut(&CallContext, C) -> Result<Vec<LogData>, String> + Send + 'static,
    {
        self.on_selector_transact(C::SELECTOR, move |ctx, input| {
            let call = C::abi_decode(input).map_err(|e| e.to_string())?;
            handler(ctx, call)
        })
    }

    pub fn on_selector_call<F>(mut self, selector: [u8; 4], handler: F) -> Self
    where
        F: Fn(&CallContext, &[u8]) -> Result<Bytes, String> + Send + 'static,
    {
        self.calls.insert(selector, Box::new(handler));
        self
    }

    pub fn on_selector_transact<F>(mut self, selector: [u8; 4], handler: F) -> Self
    where
        F: FnMut(&CallContext, &[u8]) -> Result<Vec<LogData>, String> + Send + 'static,
    {
        self.transactions.insert(selector, Box::new(handler));
        self
    }
}

fn selector(input: &[u8]) -> Result<[u8; 4], String> {
    input
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| "missing function selector".to_string())
}

impl MockContract for ScriptedContract {
    fn call(&self, ctx: &CallContext, input: &[u8]) -> Result<Bytes, String> {
        let selector = selector(input)?;
        match self.calls.get(&selector) {
            Some(handler) => handler(ctx, input),
            None => Err(format!("no call handler for 0x{}", hex_selector(selector))),
        }
    }

    fn transact(&mut self, ctx: &CallContext, input: &[u8]) -> Result<Vec<LogData>, String> {
        let selector = selector(input)?;
        match self.transactions.get_mut(&selector) {
            Some(handler) => handler(ctx, input),
            None => Err(format!("no transaction handler for 0x{}", hex_selector(selector))),
        }
    }
}

fn hex_selector(selector: [u8; 4]) -> String {
    selector.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Default)]
struct DidRecord {
    owner: Address,
    checksum: B256,
    url: String,
    last_updated_by: Address,
    block_number_updated: u64,
    providers: Vec<Address>,
    mint_cap: U256,
    royalties: u8,
    nft_supply: U256,
    permissions: HashSet<Address>,
    delegates: HashSet<Address>,
}

/// The DID registry, with DID NFT balances and provenance delegates.
#[derive(Debug, Default)]
pub struct DidRegistryMock {
    dids: HashMap<B256, DidRecord>,
    balances: HashMap<(B256, Address), U256>,
    proxy_approvals: HashSet<Address>,
}

impl DidRegistryMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `keccak256(abi.encode(seed, creator))`, as the registry derives DIDs.
    pub fn hash_did(seed: B256, creator: Address) -> B256 {
        keccak256((seed, creator).abi_encode_params())
    }

    fn record(&self, did: &B256) -> Result<&DidRecord, String> {
        self.dids.get(did).ok_or_else(|| "DID not registered".to_string())
    }

    fn owned_record(&mut self, did: &B256, caller: Address) -> Result<&mut DidRecord, String> {
        match self.dids.get_mut(did) {
            Some(record) if record.owner == caller => Ok(record),
            Some(_) => Err("Only owner is allowed".to_string()),
            None => Err("DID not registered".to_string()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn register(
        &mut self,
        ctx: &CallContext,
        seed: B256,
        checksum: B256,
        providers: Vec<Address>,
        url: String,
        cap: U256,
        royalties: u8,
    ) -> Result<Vec<LogData>, String> {
        if royalties > 100 {
            return Err("Invalid royalties".to_string());
        }
        let did = Self::hash_did(seed, ctx.from);
        let record = self.dids.entry(did).or_insert_with(|| DidRecord {
            owner: ctx.from,
            ..Default::default()
        });
        if record.owner != ctx.from {
            return Err("Only owner is allowed".to_string());
        }
        record.checksum = checksum;
        record.url = url.clone();
        record.last_updated_by = ctx.from;
        record.block_number_updated = ctx.block_number;
        record.mint_cap = cap;
        record.royalties = royalties;
        for provider in providers {
            if !record.providers.contains(&provider) {
                record.providers.push(provider);
            }
        }

        Ok(vec![
            DIDRegistry::DIDAttributeRegistered {
                _did: did,
                _owner: record.owner,
                _checksum: checksum,
                _value: url,
                _lastUpdatedBy: ctx.from,
                _blockNumberUpdated: U256::from(ctx.block_number),
            }
            .encode_log_data(),
        ])
    }
}

impl MockContract for DidRegistryMock {
    fn call(&self, _ctx: &CallContext, input: &[u8]) -> Result<Bytes, String> {
        let call = DIDRegistryCalls::abi_decode(input).map_err(|e| e.to_string())?;
        let output = match call {
            DIDRegistryCalls::hashDID(c) => Self::hash_did(c._didSeed, c._creator).abi_encode(),
            DIDRegistryCalls::getBlockNumberUpdated(c) => {
                let block = self.dids.get(&c._did).map(|r| r.block_number_updated);
                U256::from(block.unwrap_or_default()).abi_encode()
            }
            DIDRegistryCalls::getDIDOwner(c) => self
                .dids
                .get(&c._did)
                .map(|r| r.owner)
                .unwrap_or_default()
                .abi_encode(),
            DIDRegistryCalls::isDIDProvider(c) => self
                .dids
                .get(&c._did)
                .is_some_and(|r| r.providers.contains(&c._provider))
                .abi_encode(),
            DIDRegistryCalls::getPermission(c) => self
                .dids
                .get(&c._did)
                .is_some_and(|r| r.permissions.contains(&c._grantee))
                .abi_encode(),
            DIDRegistryCalls::isProvenanceDelegate(c) => self
                .dids
                .get(&c._did)
                .is_some_and(|r| r.delegates.contains(&c._delegate))
                .abi_encode(),
            DIDRegistryCalls::getProvenanceOwner(c) => self.record(&c._did)?.owner.abi_encode(),
            DIDRegistryCalls::getDIDRegister(c) => {
                let r = self.record(&c._did)?;
                (
                    r.owner,
                    r.checksum,
                    r.url.clone(),
                    r.last_updated_by,
                    U256::from(r.block_number_updated),
                    r.providers.clone(),
                    r.nft_supply,
                    r.mint_cap,
                    U256::from(r.royalties),
                )
                    .abi_encode_params()
            }
            DIDRegistryCalls::balanceOf(c) => {
                let did = B256::from(c.id.to_be_bytes::<32>());
                self.balances
                    .get(&(did, c.account))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            DIDRegistryCalls::isApprovedForAll(c) => {
                self.proxy_approvals.contains(&c.operator).abi_encode()
            }
            DIDRegistryCalls::areRoyaltiesValid(c) => {
                let record = self.record(&c._did)?;
                let total = c._amounts.iter().fold(U256::ZERO, |acc, a| acc + a);
                let owner_share = c
                    ._receivers
                    .iter()
                    .zip(&c._amounts)
                    .filter(|(receiver, _)| **receiver == record.owner)
                    .fold(U256::ZERO, |acc, (_, amount)| acc + amount);
                let required = total * U256::from(record.royalties) / U256::from(100u64);
                (owner_share >= required).abi_encode()
            }
            _ => return Err("function not supported by the mock registry".to_string()),
        };
        Ok(output.into())
    }

    fn transact(&mut self, ctx: &CallContext, input: &[u8]) -> Result<Vec<LogData>, String> {
        let call = DIDRegistryCalls::abi_decode(input).map_err(|e| e.to_string())?;
        match call {
            DIDRegistryCalls::registerDID(c) => self.register(
                ctx,
                c._didSeed,
                c._checksum,
                c._providers,
                c._url,
                U256::ZERO,
                0,
            ),
            DIDRegistryCalls::registerMintableDID(c) => self.register(
                ctx,
                c._didSeed,
                c._checksum,
                c._providers,
                c._url,
                c._cap,
                c._royalties,
            ),
            DIDRegistryCalls::addDIDProvider(c) => {
                let record = self.owned_record(&c._did, ctx.from)?;
                if !record.providers.contains(&c._provider) {
                    record.providers.push(c._provider);
                }
                Ok(vec![])
            }
            DIDRegistryCalls::removeDIDProvider(c) => {
                let record = self.owned_record(&c._did, ctx.from)?;
                // The registry zeroes removed entries instead of compacting the list.
                for provider in record.providers.iter_mut() {
                    if *provider == c._provider {
                        *provider = Address::ZERO;
                    }
                }
                Ok(vec![])
            }
            DIDRegistryCalls::transferDIDOwnership(c) => {
                self.owned_record(&c._did, ctx.from)?.owner = c._newOwner;
                Ok(vec![])
            }
            DIDRegistryCalls::grantPermission(c) => {
                self.owned_record(&c._did, ctx.from)?
                    .permissions
                    .insert(c._grantee);
                Ok(vec![])
            }
            DIDRegistryCalls::revokePermission(c) => {
                self.owned_record(&c._did, ctx.from)?
                    .permissions
                    .remove(&c._grantee);
                Ok(vec![])
            }
            DIDRegistryCalls::addDIDProvenanceDelegate(c) => {
                self.owned_record(&c._did, ctx.from)?
                    .delegates
                    .insert(c.delegated);
                Ok(vec![])
            }
            DIDRegistryCalls::removeDIDProvenanceDelegate(c) => {
                self.owned_record(&c._did, ctx.from)?
                    .delegates
                    .remove(&c.delegated);
                Ok(vec![])
            }
            DIDRegistryCalls::used(c) => {
                self.record(&c._did)?;
                Ok(vec![
                    DIDRegistry::Used {
                        _did: c._did,
                        _agentId: c._agentId,
                        _activityId: c._activityId,
                        provId: c._provId,
                        _attributes: c._attributes.clone(),
                        _blockNumberUpdated: U256::from(ctx.block_number),
                    }
                    .encode_log_data(),
                    DIDRegistry::ProvenanceAttributeRegistered {
                        provId: c._provId,
                        _did: c._did,
                        _agentId: c._agentId,
                        _activityId: c._activityId,
                        _relatedDid: B256::ZERO,
                        _agentInvolvedId: Address::ZERO,
                        _method: 3,
                        _attributes: c._attributes,
                        _blockNumberUpdated: U256::from(ctx.block_number),
                    }
                    .encode_log_data(),
                ])
            }
            DIDRegistryCalls::mint(c) => {
                let record = self.owned_record(&c._did, ctx.from)?;
                if record.mint_cap.is_zero() {
                    return Err("DID is not mintable".to_string());
                }
                if record.nft_supply + c._amount > record.mint_cap {
                    return Err("Cap exceeded".to_string());
                }
                record.nft_supply += c._amount;
                *self.balances.entry((c._did, ctx.from)).or_default() += c._amount;
                Ok(vec![])
            }
            DIDRegistryCalls::burn(c) => {
                let balance = self.balances.entry((c._did, ctx.from)).or_default();
                if *balance < c._amount {
                    return Err("burn amount exceeds balance".to_string());
                }
                *balance -= c._amount;
                if let Some(record) = self.dids.get_mut(&c._did) {
                    record.nft_supply = record.nft_supply.saturating_sub(c._amount);
                }
                Ok(vec![])
            }
            DIDRegistryCalls::safeTransferFrom(c) => {
                let did = B256::from(c.id.to_be_bytes::<32>());
                let from_balance = self.balances.entry((did, c.from)).or_default();
                if *from_balance < c.amount {
                    return Err("insufficient balance for transfer".to_string());
                }
                *from_balance -= c.amount;
                *self.balances.entry((did, c.to)).or_default() += c.amount;
                Ok(vec![])
            }
            DIDRegistryCalls::setProxyApproval(c) => {
                match c.approved {
                    true => self.proxy_approvals.insert(c.operator),
                    false => self.proxy_approvals.remove(&c.operator),
                };
                Ok(vec![])
            }
            _ => Err("function not supported by the mock registry".to_string()),
        }
    }
}

/// ERC-20 token with balances set up front.
#[derive(Debug, Default)]
pub struct TokenMock {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl TokenMock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, account: Address, amount: U256) -> Self {
        self.balances.insert(account, amount);
        self
    }

    fn approval(owner: Address, spender: Address, value: U256) -> LogData {
        NeverminedToken::Approval {
            owner,
            spender,
            value,
        }
        .encode_log_data()
    }
}

impl MockContract for TokenMock {
    fn call(&self, _ctx: &CallContext, input: &[u8]) -> Result<Bytes, String> {
        let call = NeverminedTokenCalls::abi_decode(input).map_err(|e| e.to_string())?;
        let output = match call {
            NeverminedTokenCalls::balanceOf(c) => self
                .balances
                .get(&c.account)
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            NeverminedTokenCalls::allowance(c) => self
                .allowances
                .get(&(c.owner, c.spender))
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            NeverminedTokenCalls::totalSupply(_) => {
                self.balances.values().fold(U256::ZERO, |acc, b| acc + b).abi_encode()
            }
            _ => return Err("not a view function".to_string()),
        };
        Ok(output.into())
    }

    fn transact(&mut self, ctx: &CallContext, input: &[u8]) -> Result<Vec<LogData>, String> {
        let call = NeverminedTokenCalls::abi_decode(input).map_err(|e| e.to_string())?;
        match call {
            NeverminedTokenCalls::transfer(c) => {
                let balance = self.balances.entry(ctx.from).or_default();
                if *balance < c.amount {
                    return Err("ERC20: transfer amount exceeds balance".to_string());
                }
                *balance -= c.amount;
                *self.balances.entry(c.recipient).or_default() += c.amount;
                Ok(vec![
                    NeverminedToken::Transfer {
                        from: ctx.from,
                        to: c.recipient,
                        value: c.amount,
                    }
                    .encode_log_data(),
                ])
            }
            NeverminedTokenCalls::approve(c) => {
                self.allowances.insert((ctx.from, c.spender), c.amount);
                Ok(vec![Self::approval(ctx.from, c.spender, c.amount)])
            }
            NeverminedTokenCalls::increaseAllowance(c) => {
                let allowance = self.allowances.entry((ctx.from, c.spender)).or_default();
                *allowance += c.addedValue;
                Ok(vec![Self::approval(ctx.from, c.spender, *allowance)])
            }
            NeverminedTokenCalls::decreaseAllowance(c) => {
                let allowance = self.allowances.entry((ctx.from, c.spender)).or_default();
                if *allowance < c.subtractedValue {
                    return Err("ERC20: decreased allowance below zero".to_string());
                }
                *allowance -= c.subtractedValue;
                Ok(vec![Self::approval(ctx.from, c.spender, *allowance)])
            }
            _ => Err("not a transaction".to_string()),
        }
    }
}

/// Token faucet that rate limits requesters by block distance and amount.
#[derive(Debug)]
pub struct DispenserMock {
    max_amount: U256,
    min_period: u64,
    last_request: HashMap<Address, u64>,
    paused: bool,
}

impl DispenserMock {
    pub fn new(max_amount: U256, min_period: u64) -> Self {
        Self {
            max_amount,
            min_period,
            last_request: HashMap::new(),
            paused: false,
        }
    }

    /// Every request reverts.
    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }
}

impl MockContract for DispenserMock {
    fn call(&self, _ctx: &CallContext, _input: &[u8]) -> Result<Bytes, String> {
        Err("not a view function".to_string())
    }

    fn transact(&mut self, ctx: &CallContext, input: &[u8]) -> Result<Vec<LogData>, String> {
        let DispenserCalls::requestTokens(c) =
            DispenserCalls::abi_decode(input).map_err(|e| e.to_string())?;
        if self.paused {
            return Err("Pausable: paused".to_string());
        }
        if c.amount > self.max_amount {
            return Ok(vec![
                Dispenser::RequestLimitExceeded {
                    requester: ctx.from,
                    amount: c.amount,
                    maxAmount: self.max_amount,
                }
                .encode_log_data(),
            ]);
        }
        if let Some(last) = self.last_request.get(&ctx.from) {
            if ctx.block_number.saturating_sub(*last) < self.min_period {
                return Ok(vec![
                    Dispenser::RequestFrequencyExceeded {
                        requester: ctx.from,
                        minPeriod: U256::from(self.min_period),
                    }
                    .encode_log_data(),
                ]);
            }
        }
        self.last_request.insert(ctx.from, ctx.block_number);
        Ok(vec![])
    }
}
