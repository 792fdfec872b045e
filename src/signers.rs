use std::fs;
use std::path::{Path, PathBuf};

use alloy::consensus::{SignableTransaction, TypedTransaction};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::{LocalSignerError, PrivateKeySigner};
use alloy::signers::{Signature, SignerSync};
use rand::thread_rng;

use crate::error::{Error, Result};

/// A signer holding a decrypted private key in memory.
pub struct KeystoreSigner {
    signer: PrivateKeySigner,
}

impl KeystoreSigner {
    /// Generates a new random private key
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Decrypts a JSON keystore (web3 secret storage) file.
    pub fn load_keystore(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();
        let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| match e {
            LocalSignerError::EcdsaError(e) => Error::Keystore(format!("ECDSA error: {e}")),
            LocalSignerError::EthKeystoreError(e) => {
                Error::Keystore(format!("{}: {e}", path.display()))
            }
            e => Error::Keystore(format!("Error loading key: {e}")),
        })?;
        Ok(Self { signer })
    }

    /// Loads a signer from a file containing the raw 32 byte private key, binary or hex.
    pub fn load_raw_key(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())
            .map_err(|e| Error::Keystore(format!("Failed to read private key file: {e}")))?;
        let key = match bytes.len() {
            32 => B256::from_slice(&bytes),
            _ => {
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim();
                let decoded = hex::decode(text.strip_prefix("0x").unwrap_or(text))
                    .map_err(|e| Error::Keystore(format!("Failed to parse private key: {e}")))?;
                if decoded.len() != 32 {
                    return Err(Error::Keystore("Private key must be 32 bytes".to_string()));
                }
                B256::from_slice(&decoded)
            }
        };
        let signer = PrivateKeySigner::from_bytes(&key)
            .map_err(|e| Error::Keystore(format!("Failed to parse private key: {e}")))?;
        Ok(Self { signer })
    }

    /// Encrypts the key into `dir` as `key_<address>.json` and returns the file path.
    pub fn save_keystore(&self, dir: impl AsRef<Path>, password: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Keystore(format!("Failed to create {}: {e}", dir.display())))?;
        }
        let name = format!("key_{}.json", self.address());

        let mut rng = thread_rng();
        PrivateKeySigner::encrypt_keystore(
            dir,
            &mut rng,
            self.signer.credential().to_bytes(),
            password,
            Some(&name),
        )
        .map_err(|e| Error::Keystore(e.to_string()))?;

        Ok(dir.join(name))
    }

    /// Signs a fully populated request and returns its EIP-2718 encoding,
    /// ready for `eth_sendRawTransaction`.
    pub fn sign_transaction(&self, tx: TransactionRequest) -> Result<Vec<u8>> {
        let unsigned: TypedTransaction = tx
            .build_unsigned()
            .map_err(|e| Error::Signing(format!("Incomplete transaction: {e}")))?;

        let signature = self.signer.sign_hash_sync(&unsigned.signature_hash())?;
        let signed = unsigned.into_signed(signature);

        let mut encoded = Vec::new();
        signed.eip2718_encode(&mut encoded);

        log::trace!(
            "Signed transaction (hash: 0x{:x}): 0x{}",
            signed.hash(),
            hex::encode(&encoded)
        );
        Ok(encoded)
    }

    /// Signs `hash` with the `\x19Ethereum Signed Message:\n32` prefix (`personal_sign`).
    pub fn sign_hash(&self, hash: B256) -> Result<Signature> {
        Ok(self.signer.sign_message_sync(hash.as_slice())?)
    }
}
