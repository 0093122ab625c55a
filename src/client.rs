//! Read-only contract-call service.
//!
//! Everything the resolver needs from a chain goes through [`ReadClient`]:
//! `eth_call`, `eth_getCode` and Multicall3 aggregation. The production
//! implementation wraps an ethers `Provider<Http>`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::abi;
use crate::error::{Result, Web3NameError};

/// Multicall3, deployed at the same address on every supported chain
pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

pub const AGGREGATE3_SIGNATURE: &str = "aggregate3((address,bool,bytes)[])";

/// One call inside a multicall batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    pub data: Bytes,
}

impl BatchCall {
    pub fn new(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            data: data.into(),
        }
    }
}

#[async_trait]
pub trait ReadClient: Send + Sync {
    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes, cancel: &CancellationToken) -> Result<Bytes>;

    /// Deployed bytecode at `address`.
    async fn get_code(&self, address: Address, cancel: &CancellationToken) -> Result<Bytes>;

    /// Execute all calls in one round trip. Individual reverts come back as
    /// `None`; a failure of the round trip itself fails the whole batch.
    async fn aggregate(
        &self,
        calls: Vec<BatchCall>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Bytes>>>;
}

/// Creates (or reuses) a client for an endpoint.
pub trait Connector: Send + Sync {
    fn connect(&self, chain_id: u64, rpc_url: &str) -> Result<Arc<dyn ReadClient>>;
}

/// Encode `aggregate3` with `allowFailure = true` on every call.
pub fn encode_aggregate3(calls: &[BatchCall]) -> Bytes {
    let calls = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bool(true),
                Token::Bytes(call.data.to_vec()),
            ])
        })
        .collect();
    abi::encode_with_selector(abi::selector(AGGREGATE3_SIGNATURE), &[Token::Array(calls)])
}

/// Decode `aggregate3` results into per-call return data.
pub fn decode_aggregate3(data: &[u8]) -> Result<Vec<Option<Bytes>>> {
    let kind = ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::Bool,
        ParamType::Bytes,
    ])));
    let malformed = || Web3NameError::UnexpectedResponse("malformed aggregate3 result".into());

    let results = ethers::abi::decode(&[kind], data)?
        .pop()
        .and_then(Token::into_array)
        .ok_or_else(malformed)?;

    results
        .into_iter()
        .map(|result| {
            let mut fields = result.into_tuple().ok_or_else(malformed)?.into_iter();
            let success = fields.next().and_then(Token::into_bool).ok_or_else(malformed)?;
            let data = fields.next().and_then(Token::into_bytes).ok_or_else(malformed)?;
            Ok(success.then(|| Bytes::from(data)))
        })
        .collect()
}

/// [`ReadClient`] over an ethers HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpReadClient {
    provider: Provider<Http>,
    multicall: Address,
}

impl HttpReadClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider =
            Provider::<Http>::try_from(rpc_url).map_err(|e| Web3NameError::InvalidRpcUrl {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;
        let multicall = MULTICALL3_ADDRESS
            .parse()
            .map_err(|e| Web3NameError::UnexpectedResponse(format!("multicall address: {e}")))?;
        Ok(Self { provider, multicall })
    }
}

#[async_trait]
impl ReadClient for HttpReadClient {
    async fn call(&self, to: Address, data: Bytes, cancel: &CancellationToken) -> Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        tokio::select! {
            _ = cancel.cancelled() => Err(Web3NameError::Cancelled),
            res = self.provider.call(&tx, None) => Ok(res?),
        }
    }

    async fn get_code(&self, address: Address, cancel: &CancellationToken) -> Result<Bytes> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Web3NameError::Cancelled),
            res = self.provider.get_code(address, None) => Ok(res?),
        }
    }

    async fn aggregate(
        &self,
        calls: Vec<BatchCall>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Bytes>>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let expected = calls.len();
        let raw = self
            .call(self.multicall, encode_aggregate3(&calls), cancel)
            .await?;
        let results = decode_aggregate3(&raw)?;
        if results.len() != expected {
            return Err(Web3NameError::UnexpectedResponse(format!(
                "multicall returned {} results for {expected} calls",
                results.len()
            )));
        }
        Ok(results)
    }
}

/// HTTP connector that keeps one provider per endpoint URL.
#[derive(Default)]
pub struct HttpConnector {
    clients: RwLock<HashMap<String, Arc<HttpReadClient>>>,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints with a live provider
    pub fn endpoints(&self) -> Vec<String> {
        self.clients.read().keys().cloned().collect()
    }
}

impl Connector for HttpConnector {
    fn connect(&self, chain_id: u64, rpc_url: &str) -> Result<Arc<dyn ReadClient>> {
        if let Some(client) = self.clients.read().get(rpc_url) {
            return Ok(client.clone());
        }

        tracing::debug!(chain_id, rpc_url, "creating provider");
        let client = Arc::new(HttpReadClient::new(rpc_url)?);
        self.clients
            .write()
            .insert(rpc_url.to_string(), client.clone());
        Ok(client)
    }
}

/// Send an HTTP request and parse the JSON body, aborting on `cancel`.
pub async fn send_json(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Web3NameError::Cancelled),
        res = async {
            let response = request.send().await?.error_for_status()?;
            Ok(response.json::<serde_json::Value>().await?)
        } => res,
    }
}
