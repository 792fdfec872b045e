use alloy::transports::TransportError;
use alloy::rpc::json_rpc::RpcError;
use displaydoc::Display;
use thiserror::Error;

/// JSON-RPC error code returned by nodes that don't implement a method.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Errors returned by the Keeper contracts SDK.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Invalid configuration: {0}
    Configuration(String),
    /// Contract {name} not found for network {network}
    ContractNotFound { name: String, network: String },
    /// Node returned error {code}: {message}
    Node { code: i64, message: String },
    /// Failed to reach the node: {0}
    Transport(String),
    /// Failed to sign transaction: {0}
    Signing(String),
    /// Keystore error: {0}
    Keystore(String),
    /// ABI encoding or decoding failed: {0}
    Abi(String),
    /// Invalid argument: {0}
    InvalidArgument(String),
    /// DID {0} is not registered
    DidNotFound(String),
    /// Invalid transaction: {0}
    InvalidTransaction(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the node reports that a previously installed filter is gone.
    /// The message is matched case-insensitively.
    pub fn is_filter_not_found(&self) -> bool {
        match self {
            Error::Node { message, .. } => message.to_lowercase().contains("filter not found"),
            _ => false,
        }
    }

    /// True when the node doesn't support the called RPC method.
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, Error::Node { code, .. } if *code == METHOD_NOT_FOUND_CODE)
    }

    /// True when the receipt isn't queryable yet because the node is still indexing.
    pub fn is_indexing_in_progress(&self) -> bool {
        match self {
            Error::Node { message, .. } => message.contains("transaction indexing is in progress"),
            _ => false,
        }
    }

    pub fn node(code: i64, message: impl Into<String>) -> Self {
        Error::Node {
            code,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            RpcError::ErrorResp(payload) => Error::Node {
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::NullResp => Error::Transport("node returned null response".to_string()),
            RpcError::DeserError { err, text } => {
                log::debug!("Deserialization error: {err}, response text: {text}");
                Error::Transport(format!("deserialization error: {err}"))
            }
            e => Error::Transport(e.to_string()),
        }
    }
}

impl From<alloy::sol_types::Error> for Error {
    fn from(e: alloy::sol_types::Error) -> Self {
        Error::Abi(e.to_string())
    }
}

impl From<alloy::dyn_abi::Error> for Error {
    fn from(e: alloy::dyn_abi::Error) -> Self {
        Error::Abi(e.to_string())
    }
}

impl From<alloy::signers::Error> for Error {
    fn from(e: alloy::signers::Error) -> Self {
        Error::Signing(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_node_errors() {
        assert!(Error::node(-32000, "Filter not found").is_filter_not_found());
        assert!(Error::node(-32000, "filter not found").is_filter_not_found());
        assert!(!Error::node(-32000, "execution reverted").is_filter_not_found());
        assert!(Error::node(METHOD_NOT_FOUND_CODE, "the method does not exist").is_method_not_found());
        assert!(!Error::Transport("filter not found".into()).is_filter_not_found());
    }

    #[test]
    fn renders_messages() {
        let err = Error::ContractNotFound {
            name: "DIDRegistry".into(),
            network: "spree".into(),
        };
        assert_eq!(err.to_string(), "Contract DIDRegistry not found for network spree");
    }
}
