use std::fmt;
use std::path::PathBuf;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;

use crate::account::Account;
use crate::connection::ChainConnection;
use crate::error::{Error, Result};
use crate::signers::KeystoreSigner;

/// Options attached to a contract write call.
#[derive(Clone, Default)]
pub struct TxOptions {
    pub from: Option<Address>,
    pub passphrase: Option<String>,
    pub keyfile: Option<PathBuf>,
    pub gas: Option<u64>,
    pub chain_id: Option<u64>,
    pub value: Option<U256>,
    /// Call data is always produced from the called function, a value here is rejected.
    pub data: Option<Bytes>,
}

impl TxOptions {
    /// Sender, passphrase and key file taken from `account`.
    pub fn from_account(account: &Account) -> Self {
        Self {
            from: Some(account.address()),
            passphrase: account.password().map(str::to_string),
            keyfile: account.key_file(),
            ..Default::default()
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }
}

impl fmt::Debug for TxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxOptions")
            .field("from", &self.from)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("keyfile", &self.keyfile)
            .field("gas", &self.gas)
            .field("chain_id", &self.chain_id)
            .field("value", &self.value)
            .field("data", &self.data)
            .finish()
    }
}

/// How a transaction is signed before it reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SigningStrategy {
    /// Decrypt the key file locally, sign, and submit raw bytes.
    #[display("local keyfile")]
    LocalKeyfile,
    /// The node unlocks the sender with the passphrase for this call only.
    #[display("node passphrase")]
    NodePassphrase,
    /// The node signs with an account it already holds unlocked.
    #[display("node unlocked")]
    NodeUnlocked,
}

impl SigningStrategy {
    /// A passphrase together with a key file signs locally. A passphrase alone delegates to the
    /// node. Anything else, including a key file without passphrase, uses the node's default send.
    pub fn select(options: &TxOptions) -> Self {
        match (&options.passphrase, &options.keyfile) {
            (Some(_), Some(_)) => SigningStrategy::LocalKeyfile,
            (Some(_), None) => SigningStrategy::NodePassphrase,
            _ => SigningStrategy::NodeUnlocked,
        }
    }
}

/// Builds, signs and submits a contract call. Exactly one submission is attempted.
///
/// Missing `from`, `gas` and `chain_id` are filled from the connection. The returned hash
/// says nothing about the outcome, see [`crate::receipt`].
pub async fn transact(
    connection: &dyn ChainConnection,
    to: Option<Address>,
    input: Bytes,
    options: TxOptions,
) -> Result<TxHash> {
    if options.data.is_some() {
        return Err(Error::configuration(
            "Cannot set data in transaction options, it is derived from the called function",
        ));
    }
    let to = to.ok_or_else(|| {
        Error::configuration("Please ensure that this contract instance has an address")
    })?;
    let from = options
        .from
        .or_else(|| connection.default_account())
        .ok_or_else(|| {
            Error::configuration("No sender given and the connection has no default account")
        })?;

    let mut request = TransactionRequest::default()
        .with_from(from)
        .with_to(to)
        .with_input(input);
    if let Some(value) = options.value {
        request = request.with_value(value);
    }

    let gas = match options.gas {
        Some(gas) => gas,
        None => connection.estimate_gas(&request).await?,
    };
    request = request.with_gas_limit(gas);

    let chain_id = match options.chain_id {
        Some(chain_id) => chain_id,
        None => connection.chain_id().await?,
    };
    request = request.with_chain_id(chain_id);

    let strategy = SigningStrategy::select(&options);
    log::debug!("Sending transaction from {from} to {to} (gas {gas}, chain {chain_id}) using {strategy}");

    match (strategy, options.passphrase, options.keyfile) {
        (SigningStrategy::LocalKeyfile, Some(passphrase), Some(keyfile)) => {
            let signer = KeystoreSigner::load_keystore(&keyfile, &passphrase)?;
            if signer.address() != from {
                return Err(Error::configuration(format!(
                    "Key file {} belongs to {}, not to sender {from}",
                    keyfile.display(),
                    signer.address()
                )));
            }
            let nonce = connection.transaction_count(from).await?;
            let gas_price = connection.gas_price().await?;
            let request = request.with_nonce(nonce).with_gas_price(gas_price);

            let raw = signer.sign_transaction(request)?;
            connection.send_raw_transaction(&raw).await
        }
        (SigningStrategy::NodePassphrase, Some(passphrase), _) => {
            connection
                .send_transaction_with_passphrase(request, &passphrase)
                .await
        }
        _ => connection.send_transaction(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_strategy_by_credentials() {
        let mut options = TxOptions::default();
        assert_eq!(SigningStrategy::select(&options), SigningStrategy::NodeUnlocked);

        options.keyfile = Some(PathBuf::from("/tmp/key.json"));
        assert_eq!(SigningStrategy::select(&options), SigningStrategy::NodeUnlocked);

        options.passphrase = Some("pw".into());
        assert_eq!(SigningStrategy::select(&options), SigningStrategy::LocalKeyfile);

        options.keyfile = None;
        assert_eq!(SigningStrategy::select(&options), SigningStrategy::NodePassphrase);
    }

    #[test]
    fn debug_hides_passphrase() {
        let options = TxOptions {
            passphrase: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{options:?}").contains("hunter2"));
    }
}
