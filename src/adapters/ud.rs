//! Unstoppable Domains (`.crypto`) on Polygon.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::{AbiEncode, ParamType};
use ethers::types::{Address, H160, U256};

use super::{parse_address, LookupOptions, NameService, ReverseQuery};
use crate::abi::{self, uns::GetManyCall, uns::ReverseNameOfCall};
use crate::chains::Chain;
use crate::client::ReadClient;
use crate::error::Result;
use crate::namehash::namehash;
use crate::reader::ContractReader;
use crate::timeout::Deadline;
use crate::validate::normalize;

/// 0x423F2531bd5d3C3D4EF7C318c2D1d9BEDE67c680
pub const PROXY_READER: Address = H160([
    0x42, 0x3f, 0x25, 0x31, 0xbd, 0x5d, 0x3c, 0x3d, 0x4e, 0xf7, 0xc3, 0x18, 0xc2, 0xd1, 0xd9,
    0xbe, 0xde, 0x67, 0xc6, 0x80,
]);

/// 0xa9a6A3626993D487d2Dbda3173cf58cA1a9D9e9f
pub const UNS_REGISTRY: Address = H160([
    0xa9, 0xa6, 0xa3, 0x62, 0x69, 0x93, 0xd4, 0x87, 0xd2, 0xdb, 0xda, 0x31, 0x73, 0xcf, 0x58,
    0xca, 0x1a, 0x9d, 0x9e, 0x9f,
]);

const ETH_ADDRESS_KEY: &str = "crypto.ETH.address";

pub struct UdService {
    reader: Arc<ContractReader>,
    chain: Chain,
}

impl UdService {
    pub fn new(reader: Arc<ContractReader>) -> Self {
        Self {
            reader,
            chain: Chain::PolygonMainnet,
        }
    }

    /// Always the Polygon endpoint; a caller's RPC URL targets another chain.
    fn client(&self) -> Result<Arc<dyn ReadClient>> {
        self.reader.connect(self.chain.chain_id(), self.chain.rpc_url())
    }
}

#[async_trait]
impl NameService for UdService {
    fn ecosystem(&self) -> &'static str {
        "unstoppable"
    }

    async fn get_address(
        &self,
        name: &str,
        _options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let client = self.client()?;
        let token_id = U256::from_big_endian(&namehash(&normalize(name))?);
        let data = GetManyCall {
            keys: vec![ETH_ADDRESS_KEY.to_string()],
            token_id,
        }
        .encode();

        let raw = self
            .reader
            .call(client.as_ref(), PROXY_READER, data, deadline)
            .await?;
        let values: Vec<String> =
            abi::decode_output(ParamType::Array(Box::new(ParamType::String)), &raw)?;
        Ok(values.into_iter().next().filter(|value| !value.is_empty()))
    }

    async fn get_domain_name(
        &self,
        query: &ReverseQuery<'_>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let addr = parse_address(query.address)?;
        let client = self.client()?;
        let raw = self
            .reader
            .call(
                client.as_ref(),
                UNS_REGISTRY,
                ReverseNameOfCall { addr }.encode(),
                deadline,
            )
            .await?;
        let name: String = abi::decode_output(ParamType::String, &raw)?;

        // only .crypto names are served here
        Ok(name.ends_with(".crypto").then_some(name))
    }
}
