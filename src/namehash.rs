//! Namehash computation (EIP-137) and the identifier-salted TLD variant.

use ethers::types::U256;
use ethers::utils::keccak256;

use crate::error::{Result, Web3NameError};

/// True if the label is a `[<64 hex chars>]` encoded labelhash.
pub fn is_encoded_labelhash(label: &str) -> bool {
    label.starts_with('[') && label.ends_with(']') && label.len() == 66
}

/// Decode a `[<64 hex chars>]` label into the 32-byte hash it carries.
pub fn decode_labelhash(label: &str) -> Result<[u8; 32]> {
    if !(label.starts_with('[') && label.ends_with(']')) {
        return Err(Web3NameError::InvalidName(format!(
            "encoded labelhash must start and end with square brackets: {label}"
        )));
    }
    if label.len() != 66 {
        return Err(Web3NameError::InvalidName(format!(
            "encoded labelhash must be 66 characters long: {label}"
        )));
    }

    let mut hash = [0u8; 32];
    hex::decode_to_slice(&label[1..65], &mut hash)
        .map_err(|e| Web3NameError::InvalidName(format!("bad encoded labelhash {label}: {e}")))?;
    Ok(hash)
}

/// Calculate the labelhash (keccak256 of a label, or the decoded value of
/// an encoded labelhash)
/// e.g., labelhash("vitalik") -> bytes32
pub fn labelhash(label: &str) -> Result<[u8; 32]> {
    if label.starts_with('[') || label.ends_with(']') {
        return decode_labelhash(label);
    }
    Ok(keccak256(label.as_bytes()))
}

/// Calculate the namehash of a name
/// e.g., namehash("spaceid.bnb") -> bytes32
///
/// Labels are hashed as given; callers normalize first.
pub fn namehash(name: &str) -> Result<[u8; 32]> {
    let mut node = [0u8; 32];

    if name.is_empty() {
        return Ok(node);
    }

    for label in name.rsplit('.') {
        let label_hash = labelhash(label)?;
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&node);
        combined[32..].copy_from_slice(&label_hash);
        node = keccak256(combined);
    }

    Ok(node)
}

/// Namehash of a name under an identifier-salted TLD.
///
/// A zero identifier means a plain TLD. Otherwise the identifier is appended
/// as a synthetic final label `[<identifier as 32-byte hex>]`, which lets a
/// single registry serve many TLDs.
pub fn tld_namehash(name: &str, identifier: Option<U256>) -> Result<[u8; 32]> {
    match identifier {
        Some(id) if !id.is_zero() => {
            let mut raw = [0u8; 32];
            id.to_big_endian(&mut raw);
            namehash(&format!("{name}.[{}]", hex::encode(raw)))
        }
        _ => namehash(name),
    }
}

/// Reverse node for an EVM address: `<lowercase hex without 0x>.addr.reverse`.
pub fn reverse_node(address: &ethers::types::Address) -> String {
    format!("{}.addr.reverse", hex::encode(address.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namehash_empty() {
        assert_eq!(namehash("").unwrap(), [0u8; 32]);
    }

    #[test]
    fn test_namehash_eth() {
        // namehash("eth") should be a known value
        let hash = namehash("eth").unwrap();
        let expected =
            hex::decode("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_namehash_vitalik_eth() {
        let hash = namehash("vitalik.eth").unwrap();
        let expected =
            hex::decode("ee6c4522aab0003e8d14cd40a6af439055fd2577951148c14b6cea9a53475835").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_labelhash() {
        let hash = labelhash("vitalik").unwrap();
        let expected =
            hex::decode("af2caa1c2ca1d027f1ac823b529d0a67cd144264b2789fa2ea4d63a67c7103cc").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn test_namehash_is_deterministic() {
        for name in ["spaceid.bnb", "a.b.c", "中文.arb", "🥰.eth"] {
            assert_eq!(namehash(name).unwrap(), namehash(name).unwrap());
            assert_eq!(tld_namehash(name, None).unwrap(), namehash(name).unwrap());
            assert_eq!(
                tld_namehash(name, Some(U256::zero())).unwrap(),
                namehash(name).unwrap()
            );
        }
    }

    #[test]
    fn test_encoded_label_substitutes_hash() {
        let encoded = format!("[{}]", hex::encode(labelhash("vitalik").unwrap()));
        assert!(is_encoded_labelhash(&encoded));
        assert_eq!(
            namehash(&format!("{encoded}.eth")).unwrap(),
            namehash("vitalik.eth").unwrap()
        );
    }

    #[test]
    fn test_malformed_encoded_label_fails() {
        assert!(namehash("[abcd].eth").is_err());
        assert!(namehash(&format!("[{}.eth", "a".repeat(64))).is_err());
        assert!(namehash(&format!("[{}]", "z".repeat(64))).is_err());
    }

    #[test]
    fn test_tld_namehash_appends_identifier_label() {
        let identifier = U256::from_dec_str(
            "2615353277007099930642231241208939993573210331169845997366433981082573",
        )
        .unwrap();
        let mut raw = [0u8; 32];
        identifier.to_big_endian(&mut raw);
        let expected = namehash(&format!("build.woaf8.[{}]", hex::encode(raw))).unwrap();

        assert_eq!(
            tld_namehash("build.woaf8", Some(identifier)).unwrap(),
            expected
        );
        assert_ne!(
            tld_namehash("build.woaf8", Some(identifier)).unwrap(),
            namehash("build.woaf8").unwrap()
        );
    }

    #[test]
    fn test_reverse_node_is_lowercase() {
        let addr: ethers::types::Address = "0xB5932A6B7D50A966AEC6C74C97385412FB497540"
            .parse()
            .unwrap();
        assert_eq!(
            reverse_node(&addr),
            "b5932a6b7d50a966aec6c74c97385412fb497540.addr.reverse"
        );
    }
}
