use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;

use crate::artifacts::ContractArtifact;
use crate::connection::ChainConnection;
use crate::context::KeeperContext;
use crate::error::{Error, Result};
use crate::event_filter::{EventFilter, EventLog};
use crate::receipt::{self, Receipt};
use crate::transaction::{TxOptions, transact};

/// A deployed contract bound to a [`KeeperContext`].
///
/// Reads go through `eth_call`, writes through [`transact`]. Typed calls use the
/// [`sol!`](alloy::sol) descriptors in [`crate::abi`], the `*_function` variants resolve the
/// function by name in the artifact ABI.
#[derive(Clone)]
pub struct ContractProxy {
    name: String,
    artifact: ContractArtifact,
    ctx: KeeperContext,
}

impl ContractProxy {
    pub fn new(name: &str, artifact: ContractArtifact, ctx: KeeperContext) -> Self {
        Self {
            name: name.to_string(),
            artifact,
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.artifact.address
    }

    pub fn version(&self) -> &str {
        &self.artifact.version
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.artifact.abi
    }

    pub fn context(&self) -> &KeeperContext {
        &self.ctx
    }

    pub fn connection(&self) -> Arc<dyn ChainConnection> {
        self.ctx.connection()
    }

    pub fn function_names(&self) -> Vec<String> {
        self.artifact.abi.functions.keys().cloned().collect()
    }

    /// Argument names of `event_name`, in declaration order.
    pub fn event_argument_names(&self, event_name: &str) -> Result<Vec<String>> {
        Ok(self
            .event(event_name)?
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect())
    }

    pub fn event(&self, event_name: &str) -> Result<Event> {
        self.artifact
            .abi
            .event(event_name)
            .and_then(|events| events.first())
            .cloned()
            .ok_or_else(|| {
                Error::configuration(format!("Contract {} has no event {event_name}", self.name))
            })
    }

    /// The overload of `name` taking `arity` arguments.
    pub fn function(&self, name: &str, arity: usize) -> Result<&Function> {
        let overloads = self.artifact.abi.function(name).ok_or_else(|| {
            Error::configuration(format!("Contract {} has no function {name}", self.name))
        })?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Function {}.{name} doesn't take {arity} arguments",
                    self.name
                ))
            })
    }

    /// Read-only call of a typed function.
    pub async fn call<C: SolCall>(&self, call: C) -> Result<C::Return> {
        log::debug!("Calling {}.{}", self.name, C::SIGNATURE);
        let tx = TransactionRequest::default()
            .with_to(self.address())
            .with_input(call.abi_encode());
        let output = self.connection().call(&tx).await?;
        Ok(C::abi_decode_returns(&output)?)
    }

    /// Submits a typed function call as a transaction.
    pub async fn send_transaction<C: SolCall>(&self, call: C, options: TxOptions) -> Result<TxHash> {
        log::debug!("Sending {}.{}", self.name, C::SIGNATURE);
        transact(
            &*self.connection(),
            Some(self.address()),
            call.abi_encode().into(),
            options,
        )
        .await
    }

    /// Read-only call of a function resolved by name in the ABI.
    pub async fn call_function(&self, name: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let function = self.function(name, args.len())?;
        let tx = TransactionRequest::default()
            .with_to(self.address())
            .with_input(function.abi_encode_input(args)?);
        let output = self.connection().call(&tx).await?;
        Ok(function.abi_decode_output(&output)?)
    }

    /// Submits a function resolved by name in the ABI as a transaction.
    pub async fn send_function(
        &self,
        name: &str,
        args: &[DynSolValue],
        options: TxOptions,
    ) -> Result<TxHash> {
        let function = self.function(name, args.len())?;
        log::debug!("Sending {}.{}", self.name, function.signature());
        let input = function.abi_encode_input(args)?;
        transact(&*self.connection(), Some(self.address()), input.into(), options).await
    }

    pub async fn get_tx_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>> {
        receipt::get_tx_receipt(&*self.connection(), tx_hash).await
    }

    pub async fn is_tx_successful(&self, tx_hash: TxHash) -> Result<bool> {
        receipt::is_tx_successful(&*self.connection(), tx_hash).await
    }

    /// Submits `call` and reports whether it was mined successfully.
    pub async fn transact_and_confirm<C: SolCall>(&self, call: C, options: TxOptions) -> Result<bool> {
        let tx_hash = self.send_transaction(call, options).await?;
        self.is_tx_successful(tx_hash).await
    }

    /// Installs a filter for `event_name` emitted by this contract.
    pub async fn event_filter(
        &self,
        event_name: &str,
        argument_filters: BTreeMap<String, DynSolValue>,
        from_block: BlockNumberOrTag,
        to_block: BlockNumberOrTag,
    ) -> Result<EventFilter> {
        EventFilter::new(
            self.connection(),
            self.address(),
            self.event(event_name)?,
            argument_filters,
            from_block,
            to_block,
            self.ctx.config().event_filter.clone(),
        )
        .await
    }

    /// Waits up to `timeout` for an `event_name` log matching `argument_filters`.
    pub async fn wait_for_event(
        &self,
        event_name: &str,
        argument_filters: BTreeMap<String, DynSolValue>,
        timeout: Duration,
        from_block: BlockNumberOrTag,
    ) -> Result<Option<EventLog>> {
        let mut filter = self
            .event_filter(event_name, argument_filters, from_block, BlockNumberOrTag::Latest)
            .await?;
        let entry = filter.wait_for_entry(timeout).await;
        if let Err(e) = filter.uninstall().await {
            log::warn!("Failed to uninstall {event_name} filter: {e}");
        }
        entry
    }

    pub fn to_checksum_address(address: Address) -> String {
        address.to_checksum(None)
    }

    pub fn to_checksum_addresses(addresses: &[Address]) -> Vec<String> {
        addresses.iter().map(|a| a.to_checksum(None)).collect()
    }

    /// A missing token address means the native currency, represented by the zero address.
    pub fn validate_token_address(address: Option<Address>) -> Address {
        address.unwrap_or(Address::ZERO)
    }
}

impl fmt::Display for ContractProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.name, self.address().to_checksum(None))
    }
}

impl fmt::Debug for ContractProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractProxy")
            .field("name", &self.name)
            .field("address", &self.artifact.address)
            .field("version", &self.artifact.version)
            .finish()
    }
}

/// Builds an argument filter map from `(name, value)` pairs.
pub fn argument_filters<const N: usize>(
    pairs: [(&str, DynSolValue); N],
) -> BTreeMap<String, DynSolValue> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
