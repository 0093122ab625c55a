//! Reverse resolution: address to name, verified by a forward lookup.

use std::collections::HashSet;

use ethers::types::Address;
use tracing::{debug, warn};

use super::{swallow, DomainEntry, DomainNameOptions, Web3Name};
use crate::adapters::{parse_address, LookupOptions, ReverseQuery};
use crate::chains::is_eth_chain;
use crate::error::Result;
use crate::hub::TldInfo;
use crate::timeout::{with_timeout, Deadline};

const ENS_TLD: &str = "eth";

/// TLDs to try, in priority order, for one reverse query.
pub(super) struct Candidates {
    pub(super) infos: Vec<TldInfo>,
    /// The caller named the TLDs, so `tldName` applies.
    pub(super) is_tld_name: bool,
    /// Requested TLDs served by a dedicated adapter instead of the hub.
    extras: Vec<String>,
}

/// Per-chain candidates: one TLD per chain. On Ethereum chains the first
/// non-ENS TLD comes first and `eth` is always last.
fn chain_candidates(chain_id: u64, hosted: Vec<String>) -> Vec<String> {
    if is_eth_chain(chain_id) {
        let mut list: Vec<String> = hosted.into_iter().find(|tld| tld != ENS_TLD).into_iter().collect();
        list.push(ENS_TLD.to_string());
        list
    } else {
        hosted.into_iter().take(1).collect()
    }
}

pub(super) fn same_address(resolved: &str, address: &Address) -> bool {
    resolved.to_lowercase() == format!("{address:?}")
}

impl Web3Name {
    pub(super) async fn candidates(
        &self,
        chain_ids: &[u64],
        tlds: &[String],
        deadline: &Deadline,
    ) -> Result<Candidates> {
        let directory = self.reader.directory();
        if !chain_ids.is_empty() && !tlds.is_empty() {
            warn!("query_chain_id_list and query_tld_list cannot be used together, query_tld_list will be ignored");
        }

        let (requested, is_tld_name) = if !chain_ids.is_empty() {
            let mut requested = Vec::new();
            for chain_id in chain_ids {
                let hosted = directory.get_chain_tlds(*chain_id, deadline).await?;
                requested.extend(chain_candidates(*chain_id, hosted));
            }
            (requested, false)
        } else if !tlds.is_empty() {
            (tlds.iter().map(|tld| tld.to_lowercase()).collect(), true)
        } else {
            (directory.get_all_tlds(deadline).await?, false)
        };

        let extras = if is_tld_name {
            requested
                .iter()
                .filter(|tld| *tld != ENS_TLD && self.router.is_routed(tld))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let infos = directory.get_tld_info(&requested, deadline).await?;
        debug!(candidates = infos.len(), is_tld_name, "reverse candidates");

        Ok(Candidates {
            infos,
            is_tld_name,
            extras,
        })
    }

    /// Primary name of an address. Only a reverse record whose name
    /// resolves back to the same address is returned.
    pub async fn get_domain_name(
        &self,
        address: &str,
        options: &DomainNameOptions,
    ) -> Result<Option<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let parsed = parse_address(address)?;
            let result: Result<Option<String>> = async {
                let candidates = self
                    .candidates(&options.query_chain_id_list, &options.query_tld_list, &deadline)
                    .await?;
                self.first_verified(&candidates, parsed, address, options.rpc_url.as_deref(), &deadline)
                    .await
            }
            .await;
            swallow(result, "reverse", address)
        })
        .await
    }

    /// Every verified name of an address, deduplicated, in candidate order.
    pub async fn get_domain_names(
        &self,
        address: &str,
        options: &DomainNameOptions,
    ) -> Result<Vec<String>> {
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let parsed = parse_address(address)?;
            let rpc_url = options.rpc_url.as_deref();
            let result: Result<Option<Vec<String>>> = async {
                let candidates = self
                    .candidates(&options.query_chain_id_list, &options.query_tld_list, &deadline)
                    .await?;

                let mut seen = HashSet::new();
                let mut names = Vec::new();
                for info in &candidates.infos {
                    let found = self
                        .verified_in(info, candidates.is_tld_name, parsed, rpc_url, &deadline)
                        .await?;
                    if let Some(name) = found {
                        if seen.insert(name.clone()) {
                            names.push(name);
                        }
                    }
                }
                for tld in &candidates.extras {
                    if let Some(name) = self.extra_reverse(tld, address, rpc_url, &deadline).await? {
                        if seen.insert(name.clone()) {
                            names.push(name);
                        }
                    }
                }
                Ok(Some(names))
            }
            .await;
            Ok(swallow(result, "reverse", address)?.unwrap_or_default())
        })
        .await
    }

    /// Reverse-resolve every address against one shared candidate list,
    /// one address at a time. `None` if the candidate list could not be
    /// built.
    pub async fn batch_get_domain_name(
        &self,
        addresses: &[String],
        options: &DomainNameOptions,
    ) -> Result<Option<Vec<DomainEntry>>> {
        if addresses.is_empty() {
            return Ok(Some(Vec::new()));
        }
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let parsed = addresses
                .iter()
                .map(|address| parse_address(address))
                .collect::<Result<Vec<_>>>()?;
            let rpc_url = options.rpc_url.as_deref();
            let result: Result<Option<Vec<DomainEntry>>> = async {
                let candidates = self
                    .candidates(&options.query_chain_id_list, &options.query_tld_list, &deadline)
                    .await?;
                let mut entries = Vec::with_capacity(addresses.len());
                for (input, address) in addresses.iter().zip(parsed) {
                    let domain = self
                        .first_verified(&candidates, address, input, rpc_url, &deadline)
                        .await?;
                    entries.push(DomainEntry {
                        address: input.clone(),
                        domain,
                    });
                }
                Ok(Some(entries))
            }
            .await;
            swallow(result, "batch reverse", &addresses.join(","))
        })
        .await
    }

    /// First verified hub match, then the dedicated adapters.
    async fn first_verified(
        &self,
        candidates: &Candidates,
        address: Address,
        input: &str,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        for info in &candidates.infos {
            let found = self
                .verified_in(info, candidates.is_tld_name, address, rpc_url, deadline)
                .await?;
            if found.is_some() {
                return Ok(found);
            }
        }
        for tld in &candidates.extras {
            if let Some(name) = self.extra_reverse(tld, input, rpc_url, deadline).await? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Reverse record under one TLD, kept only if it resolves back to
    /// `address`. Only timeouts escape.
    async fn verified_in(
        &self,
        info: &TldInfo,
        is_tld_name: bool,
        address: Address,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let found = if info.tld == ENS_TLD {
            self.ens.reverse_in(info, address, rpc_url, deadline).await
        } else {
            self.evm
                .reverse_in(info, address, is_tld_name, rpc_url, deadline)
                .await
        };
        let name = match found {
            Ok(Some(name)) => name,
            Ok(None) => return Ok(None),
            Err(err) if err.is_timeout() => return Err(err),
            Err(err) => {
                debug!(tld = %info.tld, error = %err, "no reverse record");
                return Ok(None);
            }
        };

        if self.verify(&name, &address, rpc_url, deadline).await? {
            Ok(Some(name))
        } else {
            debug!(tld = %info.tld, %name, "reverse record does not resolve back");
            Ok(None)
        }
    }

    async fn verify(
        &self,
        name: &str,
        address: &Address,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<bool> {
        let lookup = LookupOptions {
            rpc_url: rpc_url.map(str::to_string),
            ..LookupOptions::default()
        };
        match self.resolve_address(name, &lookup, deadline).await {
            Ok(resolved) => Ok(resolved.is_some_and(|resolved| same_address(&resolved, address))),
            Err(err) if err.is_timeout() => Err(err),
            Err(err) => {
                debug!(%name, error = %err, "verification failed");
                Ok(false)
            }
        }
    }

    /// Reverse lookup through a dedicated adapter. These names come from
    /// off-hub services and are taken as returned.
    async fn extra_reverse(
        &self,
        tld: &str,
        address: &str,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let service = self.router.route_tld(tld);
        let query = ReverseQuery {
            address,
            tld,
            is_tld_name: true,
            rpc_url,
        };
        match service.get_domain_name(&query, deadline).await {
            Err(err) if err.is_timeout() => Err(err),
            Err(err) => {
                debug!(ecosystem = service.ecosystem(), error = %err, "reverse lookup failed");
                Ok(None)
            }
            ok => ok,
        }
    }
}
