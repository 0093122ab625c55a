//! ENS (`.eth`) resolution.
//!
//! Names use the plain namehash and skip validation. The hub's `eth` entry
//! supplies chain and registry; without one, Ethereum mainnet and the
//! canonical ENS registry are used.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, H160, U256};

use super::{parse_address, LookupOptions, NameService, ReverseQuery};
use crate::chains::Chain;
use crate::error::Result;
use crate::hub::TldInfo;
use crate::namehash::{namehash, reverse_node};
use crate::reader::ContractReader;
use crate::timeout::Deadline;
use crate::validate::normalize;

/// 0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e
pub const ENS_REGISTRY: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x2e, 0x07, 0x4e, 0xc6, 0x9a, 0x0d, 0xfb, 0x29, 0x97,
    0xba, 0x6c, 0x7d, 0x2e, 0x1e,
]);

pub struct EnsService {
    reader: Arc<ContractReader>,
}

impl EnsService {
    pub fn new(reader: Arc<ContractReader>) -> Self {
        Self { reader }
    }

    /// Unverified reverse record of `address`. ENS reverse records are
    /// always read with `name()`.
    pub async fn reverse_in(
        &self,
        info: &TldInfo,
        address: Address,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let client = self.reader.client_for(info, rpc_url)?;
        let node = namehash(&reverse_node(&address))?;

        // no zero-resolver short-circuit; a call to the zero address fails
        let resolver = self
            .reader
            .registry_resolver(client.as_ref(), info.registry, node, deadline)
            .await?;
        self.reader
            .read_name(client.as_ref(), resolver, node, info, false, deadline)
            .await
    }

    async fn tld_info(&self, deadline: &Deadline) -> Result<TldInfo> {
        let info = self.reader.tld_info("eth", deadline).await?;
        Ok(info.unwrap_or_else(mainnet_info))
    }
}

fn mainnet_info() -> TldInfo {
    let chain = Chain::EthereumMainnet;
    TldInfo {
        tld: "eth".into(),
        identifier: U256::zero(),
        chain_id: chain.chain_id(),
        registry: ENS_REGISTRY,
        default_rpc: chain.rpc_url().into(),
        sann: Address::zero(),
    }
}

#[async_trait]
impl NameService for EnsService {
    fn ecosystem(&self) -> &'static str {
        "ens"
    }

    async fn get_address(
        &self,
        name: &str,
        options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let info = self.tld_info(deadline).await?;
        let client = self.reader.client_for(&info, options.rpc_url.as_deref())?;
        let node = namehash(&normalize(name))?;
        let resolver = self
            .reader
            .get_resolver(client.as_ref(), info.registry, node, deadline)
            .await?;
        self.reader
            .read_addr(client.as_ref(), resolver, node, options.coin_type, deadline)
            .await
    }

    async fn get_domain_name(
        &self,
        query: &ReverseQuery<'_>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let address = parse_address(query.address)?;
        let info = self.tld_info(deadline).await?;
        self.reverse_in(&info, address, query.rpc_url, deadline).await
    }
}
