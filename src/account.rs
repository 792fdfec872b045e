use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;

use crate::utils::expand_path;

/// An Ethereum identity used to authorize transactions.
///
/// The password and key file select how a transaction gets signed, see
/// [`SigningStrategy`](crate::transaction::SigningStrategy).
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    address: Address,
    password: Option<String>,
    key_file: Option<String>,
}

impl Account {
    pub fn new(address: Address, password: Option<String>, key_file: Option<String>) -> Self {
        Self {
            address,
            password,
            key_file,
        }
    }

    /// An account whose transactions are signed by the node.
    pub fn unlocked(address: Address) -> Self {
        Self::new(address, None, None)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Path of the encrypted key file, with `~` and environment variables expanded.
    /// Expansion happens on every read, so environment changes are picked up.
    pub fn key_file(&self) -> Option<PathBuf> {
        self.key_file.as_deref().map(expand_path)
    }

    /// The key file path as configured, before expansion.
    pub fn raw_key_file(&self) -> Option<&str> {
        self.key_file.as_deref()
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self::unlocked(address)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address.to_checksum(None))
    }
}
