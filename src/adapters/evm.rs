//! Generic resolution for every TLD registered with the hub.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::Address;

use super::{parse_address, tld_of, LookupOptions, NameService, ReverseQuery};
use crate::error::{Result, Web3NameError};
use crate::hub::TldInfo;
use crate::namehash::{namehash, reverse_node};
use crate::reader::ContractReader;
use crate::timeout::Deadline;
use crate::validate::NameRules;

pub struct EvmNameService {
    reader: Arc<ContractReader>,
    rules: Arc<NameRules>,
}

impl EvmNameService {
    pub fn new(reader: Arc<ContractReader>, rules: Arc<NameRules>) -> Self {
        Self { reader, rules }
    }

    /// Unverified reverse record of `address` under an already fetched TLD.
    pub async fn reverse_in(
        &self,
        info: &TldInfo,
        address: Address,
        is_tld_name: bool,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let client = self.reader.client_for(info, rpc_url)?;
        let node = namehash(&reverse_node(&address))?;
        let resolver = self
            .reader
            .get_resolver(client.as_ref(), info.registry, node, deadline)
            .await?;
        self.reader
            .read_name(client.as_ref(), resolver, node, info, is_tld_name, deadline)
            .await
    }
}

#[async_trait]
impl NameService for EvmNameService {
    fn ecosystem(&self) -> &'static str {
        "evm"
    }

    async fn get_address(
        &self,
        name: &str,
        options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let normalized = self.rules.validate_name(name)?;
        let tld = tld_of(&normalized);
        let info = self
            .reader
            .tld_info(&tld, deadline)
            .await?
            .ok_or(Web3NameError::TldNotFound(tld))?;

        let client = self.reader.client_for(&info, options.rpc_url.as_deref())?;
        let node = self.reader.name_node(&normalized, &info)?;
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
        let info = self
            .reader
            .tld_info(query.tld, deadline)
            .await?
            .ok_or_else(|| Web3NameError::TldNotFound(query.tld.to_string()))?;
        self.reverse_in(&info, address, query.is_tld_name, query.rpc_url, deadline)
            .await
    }
}
