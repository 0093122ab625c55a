//! In-memory chain used by the unit tests.
//!
//! `MockChain` answers `eth_call`, `eth_getCode` and multicall batches for
//! every contract the resolver talks to, dispatching on the calldata
//! selector. One instance plays the hub, the registries and the resolvers
//! of every TLD at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::{AbiDecode, ParamType, Token};
use ethers::contract::EthCall;
use ethers::types::{Address, Bytes, H160, U256};
use ethers::utils::keccak256;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::abi::{self, hub, multicoin, payment_id, registry, resolver, sann, tld_base, uns};
use crate::client::{BatchCall, Connector, ReadClient};
use crate::error::{Result, Web3NameError};
use crate::hub::{encode_tld_info_list, HubConfig, TldDirectory, TldInfo, GET_TLD_INFO_SIGNATURE};
use crate::namehash::{namehash, reverse_node, tld_namehash};
use crate::reader::ContractReader;
use crate::validate::DEFAULT_SHORT_LABEL_EXEMPT_TLDS;

pub const HUB: Address = H160([0x11; 20]);
pub const SANN: Address = H160([0x5a; 20]);

/// 0xB5932A6B7D50A966AEC6C74C97385412FB497540
pub const USER: Address = H160([
    0xb5, 0x93, 0x2a, 0x6b, 0x7d, 0x50, 0xa9, 0x66, 0xae, 0xc6, 0xc7, 0x4c, 0x97, 0x38, 0x54,
    0x12, 0xfb, 0x49, 0x75, 0x40,
]);

fn derive_address(seed: &str) -> Address {
    Address::from_slice(&keccak256(seed.as_bytes())[12..])
}

pub fn registry_of(tld: &str) -> Address {
    derive_address(&format!("registry:{tld}"))
}

pub fn resolver_of(tld: &str) -> Address {
    derive_address(&format!("resolver:{tld}"))
}

fn tld(name: &str, identifier: U256, chain_id: u64) -> TldInfo {
    TldInfo {
        tld: name.to_string(),
        identifier,
        chain_id,
        registry: registry_of(name),
        default_rpc: format!("mock://{name}"),
        sann: Address::zero(),
    }
}

pub fn bnb_tld() -> TldInfo {
    tld("bnb", U256::zero(), 56)
}

/// V2 TLD with a non-zero identifier that its namehash ignores
pub fn arb_tld() -> TldInfo {
    tld("arb", U256::from(u128::MAX) * U256::from(42161u64), 42161)
}

pub fn eth_tld() -> TldInfo {
    tld("eth", U256::zero(), 1)
}

/// V3 TLD with a metadata service
pub fn zeta_tld() -> TldInfo {
    let mut info = tld("zeta", U256::from(u128::MAX) * U256::from(7000u64), 7000);
    info.sann = SANN;
    info
}

fn is_v2(tld: &str) -> bool {
    DEFAULT_SHORT_LABEL_EXEMPT_TLDS.contains(&tld)
}

/// Lookup key the resolver expects for `name` under `info`.
pub fn node_of(name: &str, info: &TldInfo) -> [u8; 32] {
    let node = if is_v2(&info.tld) {
        namehash(name)
    } else {
        tld_namehash(name, Some(info.identifier))
    };
    node.expect("fixture names hash")
}

pub fn reverse_node_of(address: Address) -> [u8; 32] {
    namehash(&reverse_node(&address)).expect("reverse node hashes")
}

#[derive(Default)]
struct State {
    tlds: Vec<TldInfo>,
    chain_tlds: Vec<(u64, String)>,
    resolvers: HashMap<(Address, [u8; 32]), Address>,
    addrs: HashMap<(Address, [u8; 32]), Address>,
    coin_addrs: HashMap<(Address, [u8; 32], U256), Vec<u8>>,
    names: HashMap<(Address, [u8; 32]), String>,
    tld_names: HashMap<(Address, [u8; 32], U256), String>,
    texts: HashMap<(Address, [u8; 32], String), String>,
    contenthashes: HashMap<(Address, [u8; 32]), Vec<u8>>,
    code: HashMap<Address, Vec<u8>>,
    tld_bases: HashMap<(Address, U256), Address>,
    token_uris: HashMap<(Address, U256), String>,
    many: HashMap<(Address, U256), Vec<String>>,
    reverse_names: HashMap<(Address, Address), String>,
    payment_ids: HashMap<(Address, U256, U256, U256), Vec<u8>>,
    delay: Option<Duration>,
    fail_aggregate: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    get_code_calls: AtomicUsize,
    aggregate_calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockChain {
    inner: Arc<Inner>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            address: HUB,
            chain_id: 56,
            rpc_url: "mock://hub".into(),
        }
    }

    pub fn client(&self) -> Arc<dyn ReadClient> {
        Arc::new(self.clone())
    }

    pub fn connector(&self) -> Arc<MockConnector> {
        Arc::new(MockConnector::new(self.clone()))
    }

    pub fn reader(&self) -> ContractReader {
        let connector: Arc<dyn Connector> = self.connector();
        ContractReader::new(
            connector.clone(),
            TldDirectory::new(self.hub_config(), connector),
            DEFAULT_SHORT_LABEL_EXEMPT_TLDS.iter().map(|tld| tld.to_string()),
        )
    }

    pub fn get_code_calls(&self) -> usize {
        self.inner.get_code_calls.load(Ordering::SeqCst)
    }

    pub fn aggregate_calls(&self) -> usize {
        self.inner.aggregate_calls.load(Ordering::SeqCst)
    }

    /// Delay every request by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.state.lock().delay = Some(delay);
    }

    pub fn fail_aggregate(&self) {
        self.inner.state.lock().fail_aggregate = true;
    }

    /// Register a TLD with the hub, hosted on the given chains.
    pub fn add_tld(&self, info: TldInfo, chains: &[u64]) {
        let mut state = self.inner.state.lock();
        for chain_id in chains {
            state.chain_tlds.push((*chain_id, info.tld.clone()));
        }
        state.tlds.push(info);
    }

    pub fn set_addr(&self, name: &str, info: &TldInfo, address: Address) {
        let node = node_of(name, info);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state.addrs.insert((resolver, node), address);
    }

    pub fn set_coin_addr(&self, name: &str, info: &TldInfo, coin_type: u64, value: Vec<u8>) {
        let node = node_of(name, info);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state
            .coin_addrs
            .insert((resolver, node, U256::from(coin_type)), value);
    }

    /// Store `name` as the reverse record of `address` for both `name()`
    /// and `tldName()`.
    pub fn set_reverse(&self, address: Address, info: &TldInfo, name: &str) {
        let node = reverse_node_of(address);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state.names.insert((resolver, node), name.to_string());
        state
            .tld_names
            .insert((resolver, node, info.identifier), name.to_string());
    }

    /// Reverse record readable only through `tldName()`.
    pub fn set_tld_name_only(&self, address: Address, info: &TldInfo, name: &str) {
        let node = reverse_node_of(address);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state
            .tld_names
            .insert((resolver, node, info.identifier), name.to_string());
    }

    pub fn set_text(&self, name: &str, info: &TldInfo, key: &str, value: &str) {
        let node = node_of(name, info);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state
            .texts
            .insert((resolver, node, key.to_string()), value.to_string());
    }

    pub fn set_contenthash(&self, name: &str, info: &TldInfo, value: Vec<u8>) {
        let node = node_of(name, info);
        let resolver = resolver_of(&info.tld);
        let mut state = self.inner.state.lock();
        state.resolvers.insert((info.registry, node), resolver);
        state.contenthashes.insert((resolver, node), value);
    }

    /// Deploy bytecode on `resolver`, with or without the `tldName` selector.
    pub fn set_supports_tld_name(&self, resolver: Address, supported: bool) {
        let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52, 0x63];
        if supported {
            code.extend(resolver::TldNameCall::selector());
        }
        code.extend([0x14, 0x61, 0x00, 0x57]);
        self.inner.state.lock().code.insert(resolver, code);
    }

    pub fn set_token_uri(&self, info: &TldInfo, base: Address, label: &str, uri: &str) {
        let token_id = U256::from_big_endian(&keccak256(label.as_bytes()));
        let mut state = self.inner.state.lock();
        state.tld_bases.insert((info.sann, info.identifier), base);
        state.token_uris.insert((base, token_id), uri.to_string());
    }

    pub fn set_many(&self, contract: Address, token_id: U256, values: Vec<String>) {
        self.inner
            .state
            .lock()
            .many
            .insert((contract, token_id), values);
    }

    pub fn set_reverse_name_of(&self, contract: Address, address: Address, name: &str) {
        self.inner
            .state
            .lock()
            .reverse_names
            .insert((contract, address), name.to_string());
    }

    pub fn set_payment_id(
        &self,
        contract: Address,
        token_id: U256,
        tld_code: u64,
        chain_id: u64,
        value: Vec<u8>,
    ) {
        self.inner.state.lock().payment_ids.insert(
            (contract, token_id, U256::from(tld_code), U256::from(chain_id)),
            value,
        );
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        let delay = self.inner.state.lock().delay;
        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Web3NameError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(())
    }

    fn answer(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let revert = || Web3NameError::UnexpectedResponse("execution reverted".into());
        if data.len() < 4 {
            return Err(revert());
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
        let state = self.inner.state.lock();

        if to == HUB {
            if selector == abi::selector(GET_TLD_INFO_SIGNATURE) {
                let requested: Vec<String> = abi::decode_output(
                    ParamType::Array(Box::new(ParamType::String)),
                    &data[4..],
                )?;
                let list = requested
                    .iter()
                    .map(|tld| {
                        state
                            .tlds
                            .iter()
                            .find(|info| &info.tld == tld)
                            .cloned()
                            .unwrap_or_else(|| TldInfo {
                                tld: String::new(),
                                identifier: U256::zero(),
                                chain_id: 0,
                                registry: Address::zero(),
                                default_rpc: String::new(),
                                sann: Address::zero(),
                            })
                    })
                    .collect();
                return Ok(encode_tld_info_list(list));
            }
            if selector == hub::GetChainTldsCall::selector() {
                let call = hub::GetChainTldsCall::decode(data)?;
                let tlds: Vec<Token> = state
                    .chain_tlds
                    .iter()
                    .filter(|(chain_id, _)| U256::from(*chain_id) == call.chain_id)
                    .map(|(_, tld)| Token::String(tld.clone()))
                    .collect();
                return Ok(ethers::abi::encode(&[Token::Array(tlds)]));
            }
            if selector == hub::GetTldsCall::selector() {
                let tlds = state
                    .tlds
                    .iter()
                    .map(|info| Token::String(info.tld.clone()))
                    .collect();
                return Ok(ethers::abi::encode(&[Token::Array(tlds)]));
            }
            return Err(revert());
        }

        let address = |value: Option<&Address>| {
            ethers::abi::encode(&[Token::Address(value.copied().unwrap_or_default())])
        };
        let string = |value: Option<&String>| {
            ethers::abi::encode(&[Token::String(value.cloned().unwrap_or_default())])
        };
        let bytes = |value: Option<&Vec<u8>>| {
            ethers::abi::encode(&[Token::Bytes(value.cloned().unwrap_or_default())])
        };

        if selector == registry::ResolverCall::selector() {
            let call = registry::ResolverCall::decode(data)?;
            return Ok(address(state.resolvers.get(&(to, call.node))));
        }
        if selector == resolver::AddrCall::selector() {
            let call = resolver::AddrCall::decode(data)?;
            return Ok(address(state.addrs.get(&(to, call.node))));
        }
        if selector == multicoin::AddrCall::selector() {
            let call = multicoin::AddrCall::decode(data)?;
            return Ok(bytes(
                state.coin_addrs.get(&(to, call.node, call.coin_type)),
            ));
        }
        if selector == resolver::NameCall::selector() {
            let call = resolver::NameCall::decode(data)?;
            return Ok(string(state.names.get(&(to, call.node))));
        }
        if selector == resolver::TldNameCall::selector() {
            let call = resolver::TldNameCall::decode(data)?;
            return Ok(string(
                state.tld_names.get(&(to, call.node, call.identifier)),
            ));
        }
        if selector == resolver::TextCall::selector() {
            let call = resolver::TextCall::decode(data)?;
            return Ok(string(state.texts.get(&(to, call.node, call.key))));
        }
        if selector == resolver::ContenthashCall::selector() {
            let call = resolver::ContenthashCall::decode(data)?;
            return Ok(bytes(state.contenthashes.get(&(to, call.node))));
        }
        if selector == sann::TldBaseCall::selector() {
            let call = sann::TldBaseCall::decode(data)?;
            return Ok(address(state.tld_bases.get(&(to, call.identifier))));
        }
        if selector == tld_base::TokenUriCall::selector() {
            let call = tld_base::TokenUriCall::decode(data)?;
            return Ok(string(state.token_uris.get(&(to, call.token_id))));
        }
        if selector == uns::GetManyCall::selector() {
            let call = uns::GetManyCall::decode(data)?;
            let values = state
                .many
                .get(&(to, call.token_id))
                .cloned()
                .unwrap_or_else(|| vec![String::new(); call.keys.len()]);
            let values = values.into_iter().map(Token::String).collect();
            return Ok(ethers::abi::encode(&[Token::Array(values)]));
        }
        if selector == uns::ReverseNameOfCall::selector() {
            let call = uns::ReverseNameOfCall::decode(data)?;
            return Ok(string(state.reverse_names.get(&(to, call.addr))));
        }
        if selector == payment_id::AddrCall::selector() {
            let call = payment_id::AddrCall::decode(data)?;
            return Ok(bytes(state.payment_ids.get(&(
                to,
                call.token_id,
                call.tld_code,
                call.chain_id,
            ))));
        }

        Err(revert())
    }
}

#[async_trait]
impl ReadClient for MockChain {
    async fn call(&self, to: Address, data: Bytes, cancel: &CancellationToken) -> Result<Bytes> {
        self.wait(cancel).await?;
        Ok(self.answer(to, &data)?.into())
    }

    async fn get_code(&self, address: Address, cancel: &CancellationToken) -> Result<Bytes> {
        self.inner.get_code_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(cancel).await?;
        let code = self.inner.state.lock().code.get(&address).cloned();
        Ok(code.unwrap_or_default().into())
    }

    async fn aggregate(
        &self,
        calls: Vec<BatchCall>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Bytes>>> {
        self.inner.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(cancel).await?;
        if self.inner.state.lock().fail_aggregate {
            return Err(Web3NameError::UnexpectedResponse("multicall reverted".into()));
        }
        Ok(calls
            .iter()
            .map(|call| self.answer(call.target, &call.data).ok().map(Bytes::from))
            .collect())
    }
}

/// Hands out the same [`MockChain`] for every endpoint and records which
/// endpoints were asked for.
pub struct MockConnector {
    chain: MockChain,
    endpoints: Mutex<Vec<(u64, String)>>,
}

impl MockConnector {
    pub fn new(chain: MockChain) -> Self {
        Self {
            chain,
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(chain: MockChain) -> Arc<dyn Connector> {
        Arc::new(Self::new(chain))
    }

    pub fn endpoints(&self) -> Vec<(u64, String)> {
        self.endpoints.lock().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, chain_id: u64, rpc_url: &str) -> Result<Arc<dyn ReadClient>> {
        self.endpoints.lock().push((chain_id, rpc_url.to_string()));
        Ok(self.chain.client())
    }
}
