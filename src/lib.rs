// # Keeper contracts SDK
//!
//! Client for the Keeper contracts: the on-chain registry of DIDs, data-sharing agreements,
//! their conditions and the token used to pay for them.
//!
//! Everything starts from a [`KeeperContext`], which binds a [`ChainConnection`] to the
//! contract artifacts deployed on the connected network:
//!
//! ```no_run
//! # async fn run() -> keeper_contracts_sdk::error::Result<()> {
//! use std::sync::Arc;
//! use keeper_contracts_sdk::{Keeper, KeeperContext, ResilientProvider, StaticArtifacts};
//!
//! let url = "http://localhost:8545".parse().expect("valid url");
//! let connection = ResilientProvider::connect(url, Default::default());
//! let ctx = KeeperContext::builder()
//!     .connection(Arc::new(connection))
//!     .artifacts(Arc::new(StaticArtifacts::new()))
//!     .build()
//!     .await?;
//! let keeper = Keeper::new(ctx)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Transaction Abstractions
//!
//! Writes go through one of three signing strategies, picked from the [`TxOptions`]:
//! - a local encrypted key file, signed in-process and sent as a raw transaction;
//! - a passphrase, sent through the node's `personal_sendTransaction`;
//! - neither, sent as is for the node's unlocked account.
//!
//! Use the wrappers in [`wrappers`] for contract operations, [`ContractProxy`] for contracts
//! without a wrapper, and [`transaction::transact`] for raw control.

/// Re-export commonly used types from `alloy`.
pub use alloy::primitives::{Address, B256, U256, keccak256};
pub use alloy::signers::Signature;

pub use account::Account;
pub use artifacts::{ArtifactResolver, ContractArtifact, StaticArtifacts};
pub use connection::ChainConnection;
pub use context::{KeeperConfig, KeeperContext};
pub use contract::ContractProxy;
pub use error::{Error, Result};
pub use event_filter::{EventFilter, EventFilterConfig, EventLog};
pub use keeper::Keeper;
pub use receipt::{Receipt, TxOutcome};
pub use resilient_provider::{ResilientProvider, ResilientProviderConfig};
pub use transaction::{SigningStrategy, TxOptions};

/// Solidity interfaces of the contracts with a fixed ABI.
pub mod abi;

/// Accounts and where their keys live.
pub mod account;

/// Contract artifacts: address, ABI and version per network.
pub mod artifacts;

/// The node operations the SDK depends on.
pub mod connection;

/// Shared connection, artifacts and contract cache.
pub mod context;

/// Generic contract proxy.
pub mod contract;

/// Error types.
pub mod error;

/// Event log filters that survive node restarts.
pub mod event_filter;

/// Aggregate of all Keeper contract wrappers.
pub mod keeper;

/// Transaction receipts and the receipt waiter.
pub mod receipt;

/// An alloy provider with transport retries.
pub mod resilient_provider;

/// Local key handling and transaction signing.
pub mod signers;

/// Building and submitting contract transactions.
pub mod transaction;

/// Module with utility functions.
/// Includes unit conversions, hashing and path expansion.
pub mod utils;

pub mod wrappers;
