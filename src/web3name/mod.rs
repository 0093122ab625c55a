//! The `Web3Name` facade.
//!
//! Every public method mints one [`Deadline`] from its own `timeout_ms` or
//! the instance default, and every network step below it shares that
//! deadline. Per-candidate failures are logged and read as "not found";
//! timeouts and caller mistakes (bad names, bad addresses) are returned as
//! errors.

use std::sync::Arc;

use ethers::types::U256;
use serde::Serialize;

use crate::adapters::{
    tld_of, EnsService, EvmNameService, ExternalNameClient, ExternalNameService, LensService,
    LookupOptions, PaymentIdService, Router, SnsProxyClient, UdService, SPECIAL_TLDS,
};
use crate::client::{Connector, HttpConnector, ReadClient};
use crate::config::Web3NameConfig;
use crate::error::{Result, Web3NameError};
use crate::hub::{TldDirectory, TldInfo};
use crate::reader::ContractReader;
use crate::timeout::{effective_timeout, with_timeout, Deadline};
use crate::validate::{normalize, NameRules};

mod batch;
mod reverse;

/// `getAddress` modifiers.
#[derive(Debug, Clone, Default)]
pub struct AddressOptions {
    /// ENSIP-9 coin type
    pub coin_type: Option<u64>,
    pub rpc_url: Option<String>,
    pub timeout_ms: Option<i64>,
    /// Target chain for PaymentID names
    pub chain_id: Option<u64>,
}

impl AddressOptions {
    fn lookup(&self) -> LookupOptions {
        LookupOptions {
            coin_type: self.coin_type.map(U256::from),
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
        }
    }
}

/// Reverse lookup modifiers. The two query lists are mutually exclusive;
/// when both are set the chain list wins.
#[derive(Debug, Clone, Default)]
pub struct DomainNameOptions {
    pub query_chain_id_list: Vec<u64>,
    pub query_tld_list: Vec<String>,
    pub rpc_url: Option<String>,
    pub timeout_ms: Option<i64>,
}

/// Modifiers for record reads and the multicall batches.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    pub rpc_url: Option<String>,
    pub timeout_ms: Option<i64>,
}

/// One row of a batch reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainEntry {
    pub address: String,
    pub domain: Option<String>,
}

/// One row of a batch forward lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressEntry {
    pub domain: String,
    pub address: Option<String>,
}

/// Black-box clients for the naming systems that live outside EVM chains.
#[derive(Clone, Default)]
pub struct ExternalClients {
    pub sol: Option<Arc<dyn ExternalNameClient>>,
    pub sei: Option<Arc<dyn ExternalNameClient>>,
    pub inj: Option<Arc<dyn ExternalNameClient>>,
}

impl ExternalClients {
    /// Clients with a public endpoint. Only Solana has one.
    pub fn public(http: &reqwest::Client) -> Self {
        Self {
            sol: Some(Arc::new(SnsProxyClient::new(http.clone()))),
            ..Self::default()
        }
    }
}

pub struct Web3Name {
    reader: Arc<ContractReader>,
    rules: Arc<NameRules>,
    router: Router,
    evm: Arc<EvmNameService>,
    ens: Arc<EnsService>,
    timeout_ms: Option<i64>,
}

impl Web3Name {
    pub fn new(config: Web3NameConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(HttpConnector::new()))
    }

    pub fn with_connector(config: Web3NameConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let clients = ExternalClients::public(&reqwest::Client::new());
        Self::build(config, connector, clients)
    }

    pub fn build(
        config: Web3NameConfig,
        connector: Arc<dyn Connector>,
        clients: ExternalClients,
    ) -> Result<Self> {
        let directory = TldDirectory::new(config.hub_config()?, connector.clone());
        let reader = Arc::new(ContractReader::new(
            connector,
            directory,
            config.v2_tlds.iter().cloned(),
        ));
        let rules = Arc::new(config.rules);

        let evm = Arc::new(EvmNameService::new(reader.clone(), rules.clone()));
        let ens = Arc::new(EnsService::new(reader.clone()));
        let router = Router::new(Arc::new(PaymentIdService::new(reader.clone())), evm.clone())
            .with_route("eth", ens.clone())
            .with_route("lens", Arc::new(LensService::new(reader.http().clone())))
            .with_route("crypto", Arc::new(UdService::new(reader.clone())))
            .with_route("sol", Arc::new(ExternalNameService::new("sol", clients.sol)))
            .with_route("sei", Arc::new(ExternalNameService::new("sei", clients.sei)))
            .with_route("inj", Arc::new(ExternalNameService::new("inj", clients.inj)));

        Ok(Self {
            reader,
            rules,
            router,
            evm,
            ens,
            timeout_ms: config.timeout_ms,
        })
    }

    fn timeout(&self, per_call: Option<i64>) -> Option<i64> {
        effective_timeout(per_call, self.timeout_ms)
    }

    /// Address a name points to. Unknown TLDs and unset records are `None`.
    pub async fn get_address(&self, name: &str, options: &AddressOptions) -> Result<Option<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            self.resolve_address(name, &options.lookup(), &deadline)
                .await
        })
        .await
    }

    pub(crate) async fn resolve_address(
        &self,
        name: &str,
        lookup: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let service = self.router.route(name);
        swallow(
            service.get_address(name, lookup, deadline).await,
            service.ecosystem(),
            name,
        )
    }

    /// Text record `key` of a name.
    pub async fn get_domain_record(
        &self,
        name: &str,
        key: &str,
        options: &RecordOptions,
    ) -> Result<Option<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let result: Result<Option<String>> = async {
                let target = self.record_target(name, options.rpc_url.as_deref(), &deadline).await?;
                let resolver = target.resolver(self, &deadline).await?;
                self.reader
                    .read_text(target.client.as_ref(), resolver, target.node, key, &deadline)
                    .await
            }
            .await;
            swallow(result, "record", name)
        })
        .await
    }

    /// Content hash of a name as `0x` hex.
    pub async fn get_content_hash(&self, name: &str, options: &RecordOptions) -> Result<Option<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let result: Result<Option<String>> = async {
                let target = self.record_target(name, options.rpc_url.as_deref(), &deadline).await?;
                let resolver = target.resolver(self, &deadline).await?;
                self.reader
                    .read_contenthash(target.client.as_ref(), resolver, target.node, &deadline)
                    .await
            }
            .await;
            swallow(result, "contenthash", name)
        })
        .await
    }

    /// NFT metadata document of a name. Needs a TLD with a SANN contract.
    pub async fn get_metadata(
        &self,
        name: &str,
        options: &RecordOptions,
    ) -> Result<Option<serde_json::Value>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let result = self.metadata(name, options.rpc_url.as_deref(), &deadline).await;
            swallow(result, "metadata", name)
        })
        .await
    }

    /// The `image` field of the metadata document.
    pub async fn get_domain_avatar(&self, name: &str, options: &RecordOptions) -> Result<Option<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let result = self.metadata(name, options.rpc_url.as_deref(), &deadline).await;
            let metadata = swallow(result, "avatar", name)?;
            Ok(metadata
                .as_ref()
                .and_then(|metadata| metadata.get("image"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string))
        })
        .await
    }

    async fn metadata(
        &self,
        name: &str,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<serde_json::Value>> {
        let target = self.record_target(name, rpc_url, deadline).await?;
        if !target.info.has_sann() {
            return Ok(None);
        }
        let uri = self
            .reader
            .token_uri(target.client.as_ref(), &target.info, &target.normalized, deadline)
            .await?;
        match uri {
            Some(uri) => Ok(Some(self.reader.fetch_json(&uri, deadline).await?)),
            None => Ok(None),
        }
    }

    /// Hub metadata, client and lookup key for a record read.
    async fn record_target(
        &self,
        name: &str,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<RecordTarget> {
        let tld = tld_of(name);
        let normalized = if SPECIAL_TLDS.contains(&tld.as_str()) {
            normalize(name)
        } else {
            self.rules.validate_name(name)?
        };
        let info = self
            .reader
            .tld_info(&tld, deadline)
            .await?
            .ok_or(Web3NameError::TldNotFound(tld))?;
        let client = self.reader.client_for(&info, rpc_url)?;
        let node = self.reader.name_node(&normalized, &info)?;
        Ok(RecordTarget {
            info,
            client,
            normalized,
            node,
        })
    }
}

struct RecordTarget {
    info: TldInfo,
    client: Arc<dyn ReadClient>,
    normalized: String,
    node: [u8; 32],
}

impl RecordTarget {
    async fn resolver(&self, web3name: &Web3Name, deadline: &Deadline) -> Result<ethers::types::Address> {
        web3name
            .reader
            .get_resolver(self.client.as_ref(), self.info.registry, self.node, deadline)
            .await
    }
}

/// Pass timeouts and caller mistakes through, read anything else as "not
/// found".
fn swallow<T>(result: Result<Option<T>>, context: &str, subject: &str) -> Result<Option<T>> {
    match result {
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            tracing::debug!(context, subject, error = %err, "lookup failed");
            Ok(None)
        }
        ok => ok,
    }
}
