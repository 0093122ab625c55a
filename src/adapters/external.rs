//! Naming systems reached through an opaque client (Solana, Sei, Injective).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{LookupOptions, NameService, ReverseQuery};
use crate::error::Result;
use crate::timeout::Deadline;

/// Black-box client of a non-EVM name system.
#[async_trait]
pub trait ExternalNameClient: Send + Sync {
    async fn resolve(&self, name: &str, cancel: &CancellationToken) -> Result<Option<String>>;

    async fn reverse_lookup(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>>;
}

/// [`NameService`] over an [`ExternalNameClient`]. Without a client every
/// lookup is "not found".
pub struct ExternalNameService {
    ecosystem: &'static str,
    client: Option<Arc<dyn ExternalNameClient>>,
}

impl ExternalNameService {
    pub fn new(ecosystem: &'static str, client: Option<Arc<dyn ExternalNameClient>>) -> Self {
        Self { ecosystem, client }
    }

    fn client(&self) -> Option<&Arc<dyn ExternalNameClient>> {
        if self.client.is_none() {
            tracing::debug!(ecosystem = self.ecosystem, "no client configured");
        }
        self.client.as_ref()
    }
}

#[async_trait]
impl NameService for ExternalNameService {
    fn ecosystem(&self) -> &'static str {
        self.ecosystem
    }

    async fn get_address(
        &self,
        name: &str,
        _options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let Some(client) = self.client() else {
            return Ok(None);
        };
        deadline.run(client.resolve(name, deadline.token())).await
    }

    async fn get_domain_name(
        &self,
        query: &ReverseQuery<'_>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let Some(client) = self.client() else {
            return Ok(None);
        };
        deadline
            .run(client.reverse_lookup(query.address, deadline.token()))
            .await
    }
}
