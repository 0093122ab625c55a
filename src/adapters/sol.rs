//! Solana Name Service client backed by the public SNS HTTP proxy.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::external::ExternalNameClient;
use crate::client::send_json;
use crate::error::{Result, Web3NameError};

pub const SNS_PROXY_URL: &str = "https://sns-sdk-proxy.bonfida.workers.dev";

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    s: String,
    result: Value,
}

pub struct SnsProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnsProxyClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, SNS_PROXY_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, cancel: &CancellationToken) -> Result<Value> {
        let request = self.http.get(format!("{}/{path}", self.base_url));
        send_json(request, cancel).await
    }
}

/// Unwrap `{"s": "ok", "result": ...}`; any other status is "not found".
fn ok_result(body: Value) -> Result<Option<Value>> {
    let response: ProxyResponse = serde_json::from_value(body)
        .map_err(|e| Web3NameError::adapter("sol", format!("bad proxy response: {e}")))?;
    Ok((response.s == "ok").then_some(response.result))
}

fn owner_from(body: Value) -> Result<Option<String>> {
    Ok(ok_result(body)?.and_then(|result| result.as_str().map(str::to_string)))
}

fn favorite_from(body: Value) -> Result<Option<String>> {
    Ok(ok_result(body)?.and_then(|result| {
        result
            .get("reverse")
            .and_then(Value::as_str)
            .map(|reverse| format!("{reverse}.sol"))
    }))
}

#[async_trait]
impl ExternalNameClient for SnsProxyClient {
    async fn resolve(&self, name: &str, cancel: &CancellationToken) -> Result<Option<String>> {
        let label = name.strip_suffix(".sol").unwrap_or(name);
        owner_from(self.get(&format!("resolve/{label}"), cancel).await?)
    }

    async fn reverse_lookup(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        favorite_from(self.get(&format!("favorite-domain/{address}"), cancel).await?)
    }
}
