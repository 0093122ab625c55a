//! Lens handles (`.lens`) over the Lens GraphQL API.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{LookupOptions, NameService, ReverseQuery};
use crate::client::send_json;
use crate::error::Result;
use crate::timeout::Deadline;

pub const LENS_API_URL: &str = "https://api-v2.lens.dev/";

const PROFILE_QUERY: &str = r#"
query Profile($forHandle: Handle) {
  profile(request: { forHandle: $forHandle }) {
    id
    ownedBy { address chainId }
  }
}"#;

const DEFAULT_PROFILE_QUERY: &str = r#"
query DefaultProfile($request: DefaultProfileRequest!) {
  defaultProfile(request: $request) {
    id
    handle { namespace localName }
  }
}"#;

pub struct LensService {
    http: reqwest::Client,
    endpoint: String,
}

impl LensService {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoint(http, LENS_API_URL)
    }

    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    async fn query(&self, query: &str, variables: Value, deadline: &Deadline) -> Result<Value> {
        let request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        deadline.run(send_json(request, deadline.token())).await
    }
}

/// `data.profile.ownedBy.address`
fn owner_from(response: &Value) -> Option<String> {
    response
        .pointer("/data/profile/ownedBy/address")
        .and_then(Value::as_str)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
}

/// `<localName>.<namespace>` of the default profile
fn handle_from(response: &Value) -> Option<String> {
    let handle = response.pointer("/data/defaultProfile/handle")?;
    let local_name = handle.get("localName")?.as_str()?;
    let namespace = handle.get("namespace")?.as_str()?;
    Some(format!("{local_name}.{namespace}"))
}

#[async_trait]
impl NameService for LensService {
    fn ecosystem(&self) -> &'static str {
        "lens"
    }

    async fn get_address(
        &self,
        name: &str,
        _options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let local_name = name.split('.').next().unwrap_or(name).to_lowercase();
        let response = self
            .query(
                PROFILE_QUERY,
                json!({ "forHandle": format!("lens/{local_name}") }),
                deadline,
            )
            .await?;
        Ok(owner_from(&response))
    }

    async fn get_domain_name(
        &self,
        query: &ReverseQuery<'_>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let response = self
            .query(
                DEFAULT_PROFILE_QUERY,
                json!({ "request": { "for": query.address } }),
                deadline,
            )
            .await?;
        Ok(handle_from(&response))
    }
}
