//! Contract bindings for the registry, resolver and directory contracts.
//!
//! Each contract lives in its own module so that overloaded function names
//! (`addr` in particular) generate distinct call structs.

use ethers::abi::{ParamType, Tokenizable};
use ethers::types::Bytes;

use crate::error::{Result, Web3NameError};

pub mod registry {
    use ethers::prelude::*;

    // Shared by SPACE ID registries and the ENS registry
    abigen!(
        SidRegistry,
        r#"[
            function resolver(bytes32 node) external view returns (address)
        ]"#
    );
}

pub mod resolver {
    use ethers::prelude::*;

    abigen!(
        PublicResolver,
        r#"[
            function addr(bytes32 node) external view returns (address)
            function name(bytes32 node) external view returns (string)
            function tldName(bytes32 node, uint256 identifier) external view returns (string)
            function text(bytes32 node, string key) external view returns (string)
            function contenthash(bytes32 node) external view returns (bytes)
        ]"#
    );
}

pub mod multicoin {
    use ethers::prelude::*;

    // ENSIP-9 multi-coin address record
    abigen!(
        MultiCoinResolver,
        r#"[
            function addr(bytes32 node, uint256 coinType) external view returns (bytes)
        ]"#
    );
}

pub mod hub {
    use ethers::prelude::*;

    // getTldInfo returns a tuple array and is encoded by hand in `crate::hub`
    abigen!(
        VerifiedTldHub,
        r#"[
            function getChainTlds(uint256 chainId) external view returns (string[])
            function getTlds() external view returns (string[])
        ]"#
    );
}

pub mod sann {
    use ethers::prelude::*;

    abigen!(
        Sann,
        r#"[
            function tldBase(uint256 identifier) external view returns (address)
        ]"#
    );
}

pub mod tld_base {
    use ethers::prelude::*;

    abigen!(
        TldBase,
        r#"[
            function tokenURI(uint256 tokenId) external view returns (string)
        ]"#,
        methods {
            tokenURI(uint256) as token_uri;
        }
    );
}

pub mod uns {
    use ethers::prelude::*;

    abigen!(
        ProxyReader,
        r#"[
            function getMany(string[] keys, uint256 tokenId) external view returns (string[])
        ]"#
    );

    abigen!(
        UnsRegistry,
        r#"[
            function reverseNameOf(address addr) external view returns (string)
        ]"#
    );
}

pub mod payment_id {
    use ethers::prelude::*;

    abigen!(
        PaymentIdReader,
        r#"[
            function addr(uint256 tokenId, uint256 tldCode, uint256 chainId) external view returns (bytes)
        ]"#
    );
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    ethers::utils::id(signature)
}

/// Decode a single return value of the given ABI type.
pub fn decode_output<T: Tokenizable>(kind: ParamType, data: &[u8]) -> Result<T> {
    let token = ethers::abi::decode(&[kind], data)?
        .pop()
        .ok_or_else(|| Web3NameError::Abi("empty return data".into()))?;
    Ok(T::from_token(token)?)
}

/// Encode a call with an explicit selector, for functions without bindings.
pub fn encode_with_selector(selector: [u8; 4], tokens: &[ethers::abi::Token]) -> Bytes {
    let mut data = selector.to_vec();
    data.extend(ethers::abi::encode(tokens));
    data.into()
}
