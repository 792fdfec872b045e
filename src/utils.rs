use std::path::PathBuf;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{B256, U256, keccak256};
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, ToPrimitive};

use crate::error::{Error, Result};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Converts an ETH amount to wei as a `U256`.
/// Returns an error if the value is negative or too large to fit in a `u128`.
pub fn eth_to_wei(eth: BigDecimal) -> Result<U256> {
    let wei = (eth * BigDecimal::from(WEI_PER_ETH))
        .to_u128()
        .ok_or_else(|| Error::InvalidArgument("Value out of range".to_string()))?;
    Ok(U256::from(wei))
}

/// Converts a wei amount (`U256`) to ETH as a `BigDecimal`.
pub fn wei_to_eth(wei: U256) -> BigDecimal {
    let wei = BigInt::from_bytes_be(Sign::Plus, &wei.to_be_bytes::<32>());
    BigDecimal::from(wei) / BigDecimal::from(WEI_PER_ETH)
}

/// Hashes the tightly packed encoding of `values`, like Solidity's `keccak256(abi.encodePacked(...))`.
pub fn generate_multi_value_hash(values: &[DynSolValue]) -> B256 {
    let packed: Vec<u8> = values.iter().flat_map(|v| v.abi_encode_packed()).collect();
    keccak256(packed)
}

/// ERC-1155 and ERC-721 token id of a DID: the DID read as a big-endian integer.
pub fn did_to_token_id(did: B256) -> U256 {
    U256::from_be_bytes(did.0)
}

/// Expands a leading `~` to the home directory and `$VAR` / `${VAR}` to environment values.
/// Unknown variables are left untouched.
pub fn expand_path(path: &str) -> PathBuf {
    let path = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => format!("{}{rest}", home.display()),
            None => path.to_string(),
        },
        _ => path.to_string(),
    };
    PathBuf::from(expand_vars(&path))
}

fn expand_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let value = match name.is_empty() {
            true => None,
            false => std::env::var(name).ok(),
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, address, b256};
    use std::str::FromStr;

    #[test]
    fn converts_between_eth_and_wei() {
        let wei = eth_to_wei(BigDecimal::from_str("1.5").unwrap()).unwrap();
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(wei_to_eth(wei), BigDecimal::from_str("1.5").unwrap());
        assert!(eth_to_wei(BigDecimal::from(-1)).is_err());
    }

    #[test]
    fn packs_values_before_hashing() {
        let agreement = b256!("0x0101010101010101010101010101010101010101010101010101010101010101");
        let contract: Address = address!("0x00000000000000000000000000000000000000aa");
        let values = [
            DynSolValue::FixedBytes(agreement, 32),
            DynSolValue::Address(contract),
        ];
        let mut packed = agreement.to_vec();
        packed.extend_from_slice(contract.as_slice());
        assert_eq!(generate_multi_value_hash(&values), keccak256(packed));
    }

    #[test]
    fn expands_variables() {
        // SAFETY: test-local variable name, not read concurrently by other tests.
        unsafe { std::env::set_var("KEEPER_UTILS_TEST_DIR", "/tmp/keys") };
        assert_eq!(
            expand_path("$KEEPER_UTILS_TEST_DIR/a.json"),
            PathBuf::from("/tmp/keys/a.json")
        );
        assert_eq!(
            expand_path("${KEEPER_UTILS_TEST_DIR}/b.json"),
            PathBuf::from("/tmp/keys/b.json")
        );
        assert_eq!(
            expand_path("$KEEPER_UTILS_UNSET_VAR/c.json"),
            PathBuf::from("$KEEPER_UTILS_UNSET_VAR/c.json")
        );
    }

    #[test]
    fn expands_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/key.json"), home.join("key.json"));
        assert_eq!(expand_path("/abs/~x"), PathBuf::from("/abs/~x"));
    }
}
