//! Multicall batches against a single TLD.
//!
//! A batch is a fixed number of round trips regardless of how many
//! addresses it holds: registry `resolver()` for every reverse node, the
//! name function for every resolver found, then `resolver()` and `addr()`
//! again to verify every name. Any failed round trip fails the whole batch.

use ethers::types::Address;
use tracing::warn;

use super::reverse::same_address;
use super::{AddressEntry, DomainEntry, RecordOptions, Web3Name};
use crate::adapters::parse_address;
use crate::client::ReadClient;
use crate::error::Result;
use crate::hub::TldInfo;
use crate::namehash::{namehash, reverse_node};
use crate::timeout::{with_timeout, Deadline};
use crate::validate::normalize;

/// Present entries with their positions in the full list.
fn present<T: Clone>(values: &[Option<T>]) -> (Vec<usize>, Vec<T>) {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| value.clone().map(|value| (index, value)))
        .unzip()
}

/// Place `found[i]` at `positions[i]` in a list of `len` slots.
fn scatter<T>(len: usize, positions: &[usize], found: Vec<Option<T>>) -> Vec<Option<T>> {
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    for (position, value) in positions.iter().zip(found) {
        slots[*position] = value;
    }
    slots
}

fn failed<T>(result: Result<T>, context: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            warn!(context, error = %err, "batch failed");
            Ok(None)
        }
    }
}

impl Web3Name {
    /// Batch reverse lookup under one named TLD, reading `tldName` where
    /// the TLD supports it. `None` if the TLD is unknown or a round trip
    /// failed.
    pub async fn batch_get_domain_name_by_tld(
        &self,
        addresses: &[String],
        query_tld: &str,
        options: &RecordOptions,
    ) -> Result<Option<Vec<DomainEntry>>> {
        if addresses.is_empty() {
            return Ok(Some(Vec::new()));
        }
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let parsed = parse_all(addresses)?;
            let result: Result<Option<Vec<DomainEntry>>> = async {
                let tld = query_tld.to_lowercase();
                let Some(info) = self.reader.tld_info(&tld, &deadline).await? else {
                    return Ok(None);
                };
                let entries = self
                    .batch_resolve(addresses, &parsed, &info, true, options.rpc_url.as_deref(), &deadline)
                    .await?;
                Ok(Some(entries))
            }
            .await;
            Ok(failed(result, "batch reverse by tld")?.flatten())
        })
        .await
    }

    /// Batch reverse lookup under the TLD a chain hosts. `None` if the
    /// chain hosts none or a round trip failed.
    pub async fn batch_get_domain_name_by_chain_id(
        &self,
        addresses: &[String],
        query_chain_id: u64,
        options: &RecordOptions,
    ) -> Result<Option<Vec<DomainEntry>>> {
        if addresses.is_empty() {
            return Ok(Some(Vec::new()));
        }
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let parsed = parse_all(addresses)?;
            let result: Result<Option<Vec<DomainEntry>>> = async {
                let candidates = self.candidates(&[query_chain_id], &[], &deadline).await?;
                let Some(info) = candidates
                    .infos
                    .into_iter()
                    .find(|info| info.chain_id == query_chain_id)
                else {
                    return Ok(None);
                };
                let entries = self
                    .batch_resolve(addresses, &parsed, &info, false, options.rpc_url.as_deref(), &deadline)
                    .await?;
                Ok(Some(entries))
            }
            .await;
            Ok(failed(result, "batch reverse by chain")?.flatten())
        })
        .await
    }

    /// Forward-resolve names under one TLD in two round trips.
    pub async fn batch_get_address(
        &self,
        names: &[String],
        query_tld: &str,
        options: &RecordOptions,
    ) -> Result<Option<Vec<AddressEntry>>> {
        if names.is_empty() {
            return Ok(Some(Vec::new()));
        }
        with_timeout(self.timeout(options.timeout_ms), |deadline| async move {
            let result: Result<Option<Vec<AddressEntry>>> = async {
                let tld = query_tld.to_lowercase();
                let Some(info) = self.reader.tld_info(&tld, &deadline).await? else {
                    return Ok(None);
                };
                let client = self.reader.client_for(&info, options.rpc_url.as_deref())?;
                let wanted: Vec<Option<String>> = names.iter().cloned().map(Some).collect();
                let addresses = self
                    .forward_batch(client.as_ref(), &info, &wanted, &deadline)
                    .await?;
                Ok(Some(
                    names
                        .iter()
                        .zip(addresses)
                        .map(|(domain, address)| AddressEntry {
                            domain: domain.clone(),
                            address,
                        })
                        .collect(),
                ))
            }
            .await;
            Ok(failed(result, "batch forward")?.flatten())
        })
        .await
    }

    async fn batch_resolve(
        &self,
        inputs: &[String],
        addresses: &[Address],
        info: &TldInfo,
        is_tld_name: bool,
        rpc_url: Option<&str>,
        deadline: &Deadline,
    ) -> Result<Vec<DomainEntry>> {
        let client = self.reader.client_for(info, rpc_url)?;
        let nodes = addresses
            .iter()
            .map(|address| namehash(&reverse_node(address)))
            .collect::<Result<Vec<_>>>()?;

        let resolvers = self
            .reader
            .batch_resolvers(client.as_ref(), info.registry, &nodes, deadline)
            .await?;
        let pairs: Vec<Option<(Address, [u8; 32])>> = resolvers
            .iter()
            .zip(&nodes)
            .map(|(resolver, node)| resolver.map(|resolver| (resolver, *node)))
            .collect();
        let (positions, lookups) = present(&pairs);
        let found = if lookups.is_empty() {
            Vec::new()
        } else {
            self.reader
                .batch_names(client.as_ref(), info, &lookups, is_tld_name, deadline)
                .await?
        };
        let names = scatter(addresses.len(), &positions, found);

        let resolved = self
            .forward_batch(client.as_ref(), info, &names, deadline)
            .await?;

        Ok(inputs
            .iter()
            .zip(addresses)
            .zip(names.into_iter().zip(resolved))
            .map(|((input, address), (name, resolved))| {
                let verified =
                    resolved.is_some_and(|resolved| same_address(&resolved, address));
                DomainEntry {
                    address: input.clone(),
                    domain: name.filter(|_| verified),
                }
            })
            .collect())
    }

    /// `addr()` of every present name, two round trips at most.
    async fn forward_batch(
        &self,
        client: &dyn ReadClient,
        info: &TldInfo,
        names: &[Option<String>],
        deadline: &Deadline,
    ) -> Result<Vec<Option<String>>> {
        let nodes: Vec<Option<[u8; 32]>> = names
            .iter()
            .map(|name| {
                name.as_ref()
                    .and_then(|name| self.reader.name_node(&normalize(name), info).ok())
            })
            .collect();
        let (positions, present_nodes) = present(&nodes);
        if present_nodes.is_empty() {
            return Ok(vec![None; names.len()]);
        }

        let resolvers = self
            .reader
            .batch_resolvers(client, info.registry, &present_nodes, deadline)
            .await?;
        let pairs: Vec<Option<(Address, [u8; 32])>> = resolvers
            .iter()
            .zip(&present_nodes)
            .map(|(resolver, node)| resolver.map(|resolver| (resolver, *node)))
            .collect();
        let (resolved_positions, lookups) = present(&pairs);
        let found = if lookups.is_empty() {
            Vec::new()
        } else {
            self.reader.batch_addrs(client, &lookups, deadline).await?
        };

        let by_node = scatter(present_nodes.len(), &resolved_positions, found);
        Ok(scatter(names.len(), &positions, by_node))
    }
}

fn parse_all(addresses: &[String]) -> Result<Vec<Address>> {
    addresses
        .iter()
        .map(|address| parse_address(address))
        .collect()
}
