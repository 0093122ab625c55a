//! Per-ecosystem name services and the TLD routing table.
//!
//! Every naming system is a [`NameService`]. The [`Router`] maps a name's
//! TLD to its service once, at construction; TLDs without a dedicated
//! service fall through to the generic hub-backed EVM resolver.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, U256};

use crate::error::{Result, Web3NameError};
use crate::timeout::Deadline;

pub mod ens;
pub mod evm;
pub mod external;
pub mod lens;
pub mod payment_id;
pub mod sol;
pub mod ud;

pub use ens::EnsService;
pub use evm::EvmNameService;
pub use external::{ExternalNameClient, ExternalNameService};
pub use lens::LensService;
pub use payment_id::PaymentIdService;
pub use sol::SnsProxyClient;
pub use ud::UdService;

/// TLDs served outside the hub's registries. Names under them skip
/// validation.
pub const SPECIAL_TLDS: [&str; 3] = ["eth", "lens", "crypto"];

/// Forward lookup modifiers.
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// ENSIP-9 coin type; `None` reads the plain `addr(node)` record
    pub coin_type: Option<U256>,
    /// Overrides the TLD's default endpoint
    pub rpc_url: Option<String>,
    /// Target chain of a PaymentID lookup
    pub chain_id: Option<u64>,
}

/// One reverse lookup against one candidate TLD.
#[derive(Debug, Clone, Copy)]
pub struct ReverseQuery<'a> {
    pub address: &'a str,
    pub tld: &'a str,
    /// Set when the caller restricted the search with a TLD list
    pub is_tld_name: bool,
    pub rpc_url: Option<&'a str>,
}

#[async_trait]
pub trait NameService: Send + Sync {
    /// Short name of the naming system, used in logs and errors.
    fn ecosystem(&self) -> &'static str;

    async fn get_address(
        &self,
        name: &str,
        options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>>;

    async fn get_domain_name(
        &self,
        query: &ReverseQuery<'_>,
        deadline: &Deadline,
    ) -> Result<Option<String>>;
}

/// Final dot-separated segment of a name, lowercased.
pub fn tld_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

pub fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse()
        .map_err(|_| Web3NameError::InvalidAddress(address.to_string()))
}

/// TLD → service table.
pub struct Router {
    routes: HashMap<String, Arc<dyn NameService>>,
    payment_id: Arc<dyn NameService>,
    fallback: Arc<dyn NameService>,
}

impl Router {
    pub fn new(payment_id: Arc<dyn NameService>, fallback: Arc<dyn NameService>) -> Self {
        Self {
            routes: HashMap::new(),
            payment_id,
            fallback,
        }
    }

    pub fn with_route(mut self, tld: &str, service: Arc<dyn NameService>) -> Self {
        self.routes.insert(tld.to_lowercase(), service);
        self
    }

    /// Service for a full name. `name@issuer` goes to PaymentID.
    pub fn route(&self, name: &str) -> &Arc<dyn NameService> {
        if name.contains('@') {
            return &self.payment_id;
        }
        self.route_tld(&tld_of(name))
    }

    pub fn route_tld(&self, tld: &str) -> &Arc<dyn NameService> {
        self.routes.get(&tld.to_lowercase()).unwrap_or(&self.fallback)
    }

    /// True if the TLD has a dedicated service.
    pub fn is_routed(&self, tld: &str) -> bool {
        self.routes.contains_key(&tld.to_lowercase())
    }
}
