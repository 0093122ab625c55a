//! Resolver discovery and typed record reads.
//!
//! The reader owns the two per-instance memo tables: whether a resolver's
//! bytecode carries `tldName(bytes32,uint256)`, and which name function was
//! chosen for a resolver. Both are filled lazily and never invalidated.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ethers::abi::{AbiEncode, ParamType};
use ethers::contract::EthCall;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::{keccak256, to_checksum};
use parking_lot::Mutex;

use crate::abi::{
    self, multicoin, registry::ResolverCall, resolver, sann::TldBaseCall,
    tld_base::TokenUriCall,
};
use crate::client::{send_json, BatchCall, Connector, ReadClient};
use crate::error::{Result, Web3NameError};
use crate::hub::{TldDirectory, TldInfo};
use crate::namehash::{namehash, tld_namehash};
use crate::timeout::Deadline;

/// ENSIP-9 coin type of Ethereum
pub const ETH_COIN_TYPE: u64 = 60;

/// Read function used for reverse lookups on a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFunction {
    /// `name(bytes32)`
    Name,
    /// `tldName(bytes32, uint256 identifier)`
    TldName,
}

impl NameFunction {
    pub fn encode(self, node: [u8; 32], identifier: U256) -> Bytes {
        match self {
            NameFunction::Name => resolver::NameCall { node }.encode().into(),
            NameFunction::TldName => resolver::TldNameCall { node, identifier }
                .encode()
                .into(),
        }
    }
}

type ProbeKey = (Address, String);
type ChoiceKey = (Address, String, bool);

pub struct ContractReader {
    connector: Arc<dyn Connector>,
    directory: TldDirectory,
    http: reqwest::Client,
    v2_tlds: HashSet<String>,
    tld_name_support: Mutex<HashMap<ProbeKey, bool>>,
    name_functions: Mutex<HashMap<ChoiceKey, NameFunction>>,
}

impl ContractReader {
    pub fn new(
        connector: Arc<dyn Connector>,
        directory: TldDirectory,
        v2_tlds: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            connector,
            directory,
            http: reqwest::Client::new(),
            v2_tlds: v2_tlds.into_iter().map(|tld| tld.to_lowercase()).collect(),
            tld_name_support: Mutex::new(HashMap::new()),
            name_functions: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &TldDirectory {
        &self.directory
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// V2 TLDs hash names without their identifier.
    pub fn is_v2_tld(&self, tld: &str) -> bool {
        self.v2_tlds.contains(&tld.to_lowercase())
    }

    /// Client for a TLD's chain, preferring the caller's endpoint.
    pub fn client_for(&self, info: &TldInfo, rpc_url: Option<&str>) -> Result<Arc<dyn ReadClient>> {
        let url = rpc_url.unwrap_or(&info.default_rpc);
        self.connector.connect(info.chain_id, url)
    }

    pub fn connect(&self, chain_id: u64, rpc_url: &str) -> Result<Arc<dyn ReadClient>> {
        self.connector.connect(chain_id, rpc_url)
    }

    /// Metadata for a single TLD, `None` if the hub does not know it.
    pub async fn tld_info(&self, tld: &str, deadline: &Deadline) -> Result<Option<TldInfo>> {
        let tld = tld.to_lowercase();
        let list = self
            .directory
            .get_tld_info(std::slice::from_ref(&tld), deadline)
            .await?;
        Ok(list.into_iter().find(|info| info.tld == tld))
    }

    /// Lookup key of a normalized name under its TLD.
    pub fn name_node(&self, normalized: &str, info: &TldInfo) -> Result<[u8; 32]> {
        if self.is_v2_tld(&info.tld) {
            namehash(normalized)
        } else {
            tld_namehash(normalized, Some(info.identifier))
        }
    }

    pub async fn call(
        &self,
        client: &dyn ReadClient,
        to: Address,
        data: impl Into<Bytes>,
        deadline: &Deadline,
    ) -> Result<Bytes> {
        deadline
            .run(client.call(to, data.into(), deadline.token()))
            .await
    }

    /// Raw `resolver(node)` answer, zero address included.
    pub async fn registry_resolver(
        &self,
        client: &dyn ReadClient,
        registry: Address,
        node: [u8; 32],
        deadline: &Deadline,
    ) -> Result<Address> {
        let raw = self
            .call(client, registry, ResolverCall { node }.encode(), deadline)
            .await?;
        abi::decode_output(ParamType::Address, &raw)
    }

    /// Resolver for `node`; a zero address is [`Web3NameError::ResolverNotFound`].
    pub async fn get_resolver(
        &self,
        client: &dyn ReadClient,
        registry: Address,
        node: [u8; 32],
        deadline: &Deadline,
    ) -> Result<Address> {
        let resolver = self.registry_resolver(client, registry, node, deadline).await?;
        if resolver.is_zero() {
            return Err(Web3NameError::ResolverNotFound);
        }
        Ok(resolver)
    }

    /// Whether the resolver's bytecode contains the `tldName` selector.
    ///
    /// This is a byte search, not ABI introspection: the four bytes can appear
    /// in code that never dispatches to `tldName`, which reads as support.
    pub async fn supports_tld_name(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        tld: &str,
        deadline: &Deadline,
    ) -> Result<bool> {
        let key = (resolver, tld.to_string());
        if let Some(supported) = self.tld_name_support.lock().get(&key) {
            return Ok(*supported);
        }

        let code = deadline
            .run(client.get_code(resolver, deadline.token()))
            .await?;
        let selector = resolver::TldNameCall::selector();
        let supported = code.windows(4).any(|window| window == selector);
        tracing::debug!(?resolver, tld, supported, "probed resolver for tldName");

        self.tld_name_support.lock().insert(key, supported);
        Ok(supported)
    }

    /// Pick `name` or `tldName` for a reverse lookup on `resolver`.
    ///
    /// Outside TLD-list queries it is always `name`. V2 TLDs use `tldName`
    /// only when the resolver carries it; other TLDs always use it.
    pub async fn choose_name_function(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        info: &TldInfo,
        is_tld_name: bool,
        deadline: &Deadline,
    ) -> Result<NameFunction> {
        let key = (resolver, info.tld.clone(), is_tld_name);
        if let Some(function) = self.name_functions.lock().get(&key) {
            return Ok(*function);
        }

        let function = if !is_tld_name {
            NameFunction::Name
        } else if self.is_v2_tld(&info.tld) {
            if self
                .supports_tld_name(client, resolver, &info.tld, deadline)
                .await?
            {
                NameFunction::TldName
            } else {
                NameFunction::Name
            }
        } else {
            NameFunction::TldName
        };

        self.name_functions.lock().insert(key, function);
        Ok(function)
    }

    /// Name stored for a reverse node, `None` when empty.
    pub async fn read_name(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        reverse_node: [u8; 32],
        info: &TldInfo,
        is_tld_name: bool,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let function = self
            .choose_name_function(client, resolver, info, is_tld_name, deadline)
            .await?;
        let raw = self
            .call(
                client,
                resolver,
                function.encode(reverse_node, info.identifier),
                deadline,
            )
            .await?;
        decode_name(&raw)
    }

    /// `addr(node)`, or the ENSIP-9 `addr(node, coinType)` when a coin type
    /// is given.
    pub async fn read_addr(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        node: [u8; 32],
        coin_type: Option<U256>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        match coin_type {
            None => {
                let raw = self
                    .call(client, resolver, resolver::AddrCall { node }.encode(), deadline)
                    .await?;
                decode_addr(&raw)
            }
            Some(coin_type) => {
                let raw = self
                    .call(
                        client,
                        resolver,
                        multicoin::AddrCall { node, coin_type }.encode(),
                        deadline,
                    )
                    .await?;
                let value: Bytes = abi::decode_output(ParamType::Bytes, &raw)?;
                Ok(format_coin_address(&value, coin_type))
            }
        }
    }

    pub async fn read_text(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        node: [u8; 32],
        key: &str,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let data = resolver::TextCall {
            node,
            key: key.to_string(),
        }
        .encode();
        let raw = self.call(client, resolver, data, deadline).await?;
        let value: String = abi::decode_output(ParamType::String, &raw)?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// Content hash as `0x` hex, `None` when unset.
    pub async fn read_contenthash(
        &self,
        client: &dyn ReadClient,
        resolver: Address,
        node: [u8; 32],
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let raw = self
            .call(client, resolver, resolver::ContenthashCall { node }.encode(), deadline)
            .await?;
        let value: Bytes = abi::decode_output(ParamType::Bytes, &raw)?;
        Ok((!value.is_empty()).then(|| format!("0x{}", hex::encode(&value))))
    }

    /// Metadata URI of a name via the TLD's SANN and base contract.
    pub async fn token_uri(
        &self,
        client: &dyn ReadClient,
        info: &TldInfo,
        normalized: &str,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        if !info.has_sann() {
            return Ok(None);
        }

        let raw = self
            .call(
                client,
                info.sann,
                TldBaseCall {
                    identifier: info.identifier,
                }
                .encode(),
                deadline,
            )
            .await?;
        let base: Address = abi::decode_output(ParamType::Address, &raw)?;
        if base.is_zero() {
            return Ok(None);
        }

        let label = normalized.split('.').next().unwrap_or(normalized);
        let token_id = U256::from_big_endian(&keccak256(label.as_bytes()));
        let raw = self
            .call(client, base, TokenUriCall { token_id }.encode(), deadline)
            .await?;
        decode_name(&raw)
    }

    /// GET a metadata document and parse it as JSON.
    pub async fn fetch_json(&self, uri: &str, deadline: &Deadline) -> Result<serde_json::Value> {
        deadline
            .run(send_json(self.http.get(uri), deadline.token()))
            .await
    }

    pub async fn aggregate(
        &self,
        client: &dyn ReadClient,
        calls: Vec<BatchCall>,
        deadline: &Deadline,
    ) -> Result<Vec<Option<Bytes>>> {
        deadline
            .run(client.aggregate(calls, deadline.token()))
            .await
    }

    /// One multicall round trip of `resolver(node)` per node. Zero or
    /// undecodable answers come back as `None`.
    pub async fn batch_resolvers(
        &self,
        client: &dyn ReadClient,
        registry: Address,
        nodes: &[[u8; 32]],
        deadline: &Deadline,
    ) -> Result<Vec<Option<Address>>> {
        let calls = nodes
            .iter()
            .map(|node| BatchCall::new(registry, ResolverCall { node: *node }.encode()))
            .collect();
        let results = self.aggregate(client, calls, deadline).await?;

        Ok(results
            .into_iter()
            .map(|raw| {
                raw.and_then(|raw| abi::decode_output::<Address>(ParamType::Address, &raw).ok())
                    .filter(|resolver| !resolver.is_zero())
            })
            .collect())
    }

    /// One multicall round trip reading the reverse name for every
    /// `(resolver, reverse node)` pair.
    pub async fn batch_names(
        &self,
        client: &dyn ReadClient,
        info: &TldInfo,
        entries: &[(Address, [u8; 32])],
        is_tld_name: bool,
        deadline: &Deadline,
    ) -> Result<Vec<Option<String>>> {
        let mut calls = Vec::with_capacity(entries.len());
        for (resolver, node) in entries {
            let function = self
                .choose_name_function(client, *resolver, info, is_tld_name, deadline)
                .await?;
            calls.push(BatchCall::new(*resolver, function.encode(*node, info.identifier)));
        }
        let results = self.aggregate(client, calls, deadline).await?;

        Ok(results
            .into_iter()
            .map(|raw| raw.and_then(|raw| decode_name(&raw).ok().flatten()))
            .collect())
    }

    /// One multicall round trip of `addr(node)` per `(resolver, node)` pair.
    pub async fn batch_addrs(
        &self,
        client: &dyn ReadClient,
        entries: &[(Address, [u8; 32])],
        deadline: &Deadline,
    ) -> Result<Vec<Option<String>>> {
        let calls = entries
            .iter()
            .map(|(resolver, node)| {
                BatchCall::new(*resolver, resolver::AddrCall { node: *node }.encode())
            })
            .collect();
        let results = self.aggregate(client, calls, deadline).await?;

        Ok(results
            .into_iter()
            .map(|raw| raw.and_then(|raw| decode_addr(&raw).ok().flatten()))
            .collect())
    }
}

fn decode_name(raw: &[u8]) -> Result<Option<String>> {
    let name: String = abi::decode_output(ParamType::String, raw)?;
    Ok((!name.is_empty()).then_some(name))
}

fn decode_addr(raw: &[u8]) -> Result<Option<String>> {
    let address: Address = abi::decode_output(ParamType::Address, raw)?;
    Ok((!address.is_zero()).then(|| to_checksum(&address, None)))
}

/// Render a multi-coin address record. Ethereum-format records become a
/// checksummed address, anything else stays raw hex.
fn format_coin_address(value: &[u8], coin_type: U256) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if coin_type == U256::from(ETH_COIN_TYPE) && value.len() == 20 {
        return Some(to_checksum(&Address::from_slice(value), None));
    }
    Some(format!("0x{}", hex::encode(value)))
}
