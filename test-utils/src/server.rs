//! JSON-RPC front end of a [`MockChain`], for tests that go through a real HTTP provider.

use std::net::SocketAddr;

use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, U64, U256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use jsonrpsee::core::{RpcResult, async_trait};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{RpcModule, Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use keeper_contracts_sdk::connection::ChainConnection;
use keeper_contracts_sdk::error::Error;
use url::Url;

use crate::chain::MockChain;
use crate::controller::MockController;

/// Code used for failures that a real node would surface as an internal error.
const INTERNAL_ERROR_CODE: i32 = -32603;

fn to_rpc_error(error: Error) -> ErrorObjectOwned {
    match error {
        Error::Node { code, message } => {
            ErrorObjectOwned::owned(code as i32, message, None::<()>)
        }
        other => ErrorObjectOwned::owned(INTERNAL_ERROR_CODE, other.to_string(), None::<()>),
    }
}

#[rpc(server, namespace = "eth")]
pub trait EthRpc {
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<U64>;

    #[method(name = "accounts")]
    async fn accounts(&self) -> RpcResult<Vec<Address>>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, address: Address, block: Option<BlockId>) -> RpcResult<U256>;

    #[method(name = "getTransactionCount")]
    async fn get_transaction_count(
        &self,
        address: Address,
        block: Option<BlockId>,
    ) -> RpcResult<U64>;

    #[method(name = "gasPrice")]
    async fn gas_price(&self) -> RpcResult<U256>;

    #[method(name = "estimateGas")]
    async fn estimate_gas(
        &self,
        request: TransactionRequest,
        block: Option<BlockId>,
    ) -> RpcResult<U64>;

    #[method(name = "call")]
    async fn call(&self, request: TransactionRequest, block: Option<BlockId>) -> RpcResult<Bytes>;

    #[method(name = "newFilter")]
    async fn new_filter(&self, filter: Filter) -> RpcResult<U256>;

    #[method(name = "uninstallFilter")]
    async fn uninstall_filter(&self, id: U256) -> RpcResult<bool>;

    #[method(name = "getFilterLogs")]
    async fn get_filter_logs(&self, id: U256) -> RpcResult<Vec<Log>>;

    #[method(name = "getLogs")]
    async fn get_logs(&self, filter: Filter) -> RpcResult<Vec<Log>>;
}

#[rpc(server, namespace = "net")]
pub trait NetRpc {
    #[method(name = "version")]
    async fn version(&self) -> RpcResult<String>;
}

#[async_trait]
impl EthRpcServer for MockChain {
    async fn chain_id(&self) -> RpcResult<U64> {
        ChainConnection::chain_id(self)
            .await
            .map(U64::from)
            .map_err(to_rpc_error)
    }

    async fn block_number(&self) -> RpcResult<U64> {
        ChainConnection::block_number(self)
            .await
            .map(U64::from)
            .map_err(to_rpc_error)
    }

    async fn accounts(&self) -> RpcResult<Vec<Address>> {
        ChainConnection::accounts(self).await.map_err(to_rpc_error)
    }

    async fn get_balance(&self, address: Address, _block: Option<BlockId>) -> RpcResult<U256> {
        self.balance(address).await.map_err(to_rpc_error)
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        _block: Option<BlockId>,
    ) -> RpcResult<U64> {
        self.transaction_count(address)
            .await
            .map(U64::from)
            .map_err(to_rpc_error)
    }

    async fn gas_price(&self) -> RpcResult<U256> {
        ChainConnection::gas_price(self)
            .await
            .map(U256::from)
            .map_err(to_rpc_error)
    }

    async fn estimate_gas(
        &self,
        request: TransactionRequest,
        _block: Option<BlockId>,
    ) -> RpcResult<U64> {
        ChainConnection::estimate_gas(self, &request)
            .await
            .map(U64::from)
            .map_err(to_rpc_error)
    }

    async fn call(&self, request: TransactionRequest, _block: Option<BlockId>) -> RpcResult<Bytes> {
        ChainConnection::call(self, &request)
            .await
            .map_err(to_rpc_error)
    }

    async fn new_filter(&self, filter: Filter) -> RpcResult<U256> {
        ChainConnection::new_filter(self, &filter)
            .await
            .map_err(to_rpc_error)
    }

    async fn uninstall_filter(&self, id: U256) -> RpcResult<bool> {
        ChainConnection::uninstall_filter(self, id)
            .await
            .map_err(to_rpc_error)
    }

    async fn get_filter_logs(&self, id: U256) -> RpcResult<Vec<Log>> {
        self.filter_logs(id).await.map_err(to_rpc_error)
    }

    async fn get_logs(&self, filter: Filter) -> RpcResult<Vec<Log>> {
        ChainConnection::get_logs(self, &filter)
            .await
            .map_err(to_rpc_error)
    }
}

#[async_trait]
impl NetRpcServer for MockChain {
    async fn version(&self) -> RpcResult<String> {
        self.network_id()
            .await
            .map(|id| id.to_string())
            .map_err(to_rpc_error)
    }
}

/// A [`MockChain`] served over HTTP on a random local port.
///
/// The server stops when this value is dropped.
pub struct MockNodeServer {
    pub chain: MockChain,
    url: Url,
    _handle: ServerHandle,
}

impl MockNodeServer {
    pub async fn start(chain: MockChain) -> anyhow::Result<Self> {
        let mut module = RpcModule::new(());
        module.merge(EthRpcServer::into_rpc(chain.clone()))?;
        module.merge(NetRpcServer::into_rpc(chain.clone()))?;

        let server = Server::builder()
            .build("127.0.0.1:0".parse::<SocketAddr>()?)
            .await?;
        let addr = server.local_addr()?;
        log::info!("Mock node listening on {addr}");

        let handle = server.start(module);
        Ok(Self {
            chain,
            url: Url::parse(&format!("http://{addr}"))?,
            _handle: handle,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn controller(&self) -> &MockController {
        self.chain.controller()
    }
}
