//! TLD directory backed by the verified TLD hub contract.

use std::sync::Arc;

use ethers::abi::{AbiEncode, ParamType, Token};
use ethers::types::{Address, U256};
use serde::Serialize;

use crate::abi::{self, hub::GetChainTldsCall, hub::GetTldsCall};
use crate::client::{Connector, ReadClient};
use crate::error::{Result, Web3NameError};
use crate::timeout::Deadline;

pub const GET_TLD_INFO_SIGNATURE: &str = "getTldInfo(string[])";

/// Resolution configuration of one top-level domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TldInfo {
    pub tld: String,
    /// Non-zero for TLDs that salt the namehash with their identifier
    pub identifier: U256,
    pub chain_id: u64,
    pub registry: Address,
    pub default_rpc: String,
    /// Metadata service; zero when the TLD has none
    pub sann: Address,
}

impl TldInfo {
    pub fn has_sann(&self) -> bool {
        !self.sann.is_zero()
    }

    fn from_token(token: Token) -> Result<Self> {
        let malformed = || Web3NameError::UnexpectedResponse("malformed TLD info".into());
        let mut fields = token.into_tuple().ok_or_else(malformed)?.into_iter();

        let tld = fields.next().and_then(Token::into_string).ok_or_else(malformed)?;
        let identifier = fields.next().and_then(Token::into_uint).ok_or_else(malformed)?;
        let chain_id = fields.next().and_then(Token::into_uint).ok_or_else(malformed)?;
        let default_rpc = fields.next().and_then(Token::into_string).ok_or_else(malformed)?;
        let registry = fields.next().and_then(Token::into_address).ok_or_else(malformed)?;
        let sann = fields.next().and_then(Token::into_address).ok_or_else(malformed)?;

        if chain_id > U256::from(u64::MAX) {
            return Err(Web3NameError::UnexpectedResponse(format!(
                "chain id {chain_id} out of range for {tld}"
            )));
        }

        Ok(Self {
            tld,
            identifier,
            chain_id: chain_id.as_u64(),
            registry,
            default_rpc,
            sann,
        })
    }
}

fn tld_info_param() -> ParamType {
    ParamType::Array(Box::new(ParamType::Tuple(vec![
        ParamType::String,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::String,
        ParamType::Address,
        ParamType::Address,
    ])))
}

pub fn encode_get_tld_info(tlds: &[String]) -> ethers::types::Bytes {
    let tlds = tlds.iter().cloned().map(Token::String).collect();
    abi::encode_with_selector(abi::selector(GET_TLD_INFO_SIGNATURE), &[Token::Array(tlds)])
}

/// Decode the hub's answer, dropping entries with an empty TLD.
pub fn decode_tld_info_list(data: &[u8]) -> Result<Vec<TldInfo>> {
    let entries = ethers::abi::decode(&[tld_info_param()], data)?
        .pop()
        .and_then(Token::into_array)
        .ok_or_else(|| Web3NameError::UnexpectedResponse("malformed TLD info list".into()))?;

    let mut list = Vec::with_capacity(entries.len());
    for entry in entries {
        let info = TldInfo::from_token(entry)?;
        if !info.tld.is_empty() {
            list.push(info);
        }
    }
    Ok(list)
}

/// Where the hub contract lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub address: Address,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Directory of registered TLDs.
pub struct TldDirectory {
    hub: HubConfig,
    connector: Arc<dyn Connector>,
}

impl TldDirectory {
    pub fn new(hub: HubConfig, connector: Arc<dyn Connector>) -> Self {
        Self { hub, connector }
    }

    pub fn hub(&self) -> &HubConfig {
        &self.hub
    }

    fn client(&self) -> Result<Arc<dyn ReadClient>> {
        self.connector.connect(self.hub.chain_id, &self.hub.rpc_url)
    }

    /// Metadata for the requested TLDs; unknown TLDs are simply absent.
    pub async fn get_tld_info(&self, tlds: &[String], deadline: &Deadline) -> Result<Vec<TldInfo>> {
        if tlds.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client()?;
        let raw = deadline
            .run(client.call(self.hub.address, encode_get_tld_info(tlds), deadline.token()))
            .await?;
        decode_tld_info_list(&raw)
    }

    /// TLDs hosted on a chain, in hub order.
    pub async fn get_chain_tlds(&self, chain_id: u64, deadline: &Deadline) -> Result<Vec<String>> {
        let client = self.client()?;
        let data = GetChainTldsCall {
            chain_id: U256::from(chain_id),
        }
        .encode();
        let raw = deadline
            .run(client.call(self.hub.address, data.into(), deadline.token()))
            .await?;
        abi::decode_output(ParamType::Array(Box::new(ParamType::String)), &raw)
    }

    /// Every registered TLD.
    pub async fn get_all_tlds(&self, deadline: &Deadline) -> Result<Vec<String>> {
        let client = self.client()?;
        let raw = deadline
            .run(client.call(self.hub.address, GetTldsCall.encode().into(), deadline.token()))
            .await?;
        abi::decode_output(ParamType::Array(Box::new(ParamType::String)), &raw)
    }
}

#[cfg(test)]
impl TldInfo {
    pub(crate) fn into_token(self) -> Token {
        Token::Tuple(vec![
            Token::String(self.tld),
            Token::Uint(self.identifier),
            Token::Uint(U256::from(self.chain_id)),
            Token::String(self.default_rpc),
            Token::Address(self.registry),
            Token::Address(self.sann),
        ])
    }
}

#[cfg(test)]
pub(crate) fn encode_tld_info_list(list: Vec<TldInfo>) -> Vec<u8> {
    ethers::abi::encode(&[Token::Array(
        list.into_iter().map(TldInfo::into_token).collect(),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bnb_tld, MockChain, MockConnector};

    #[test]
    fn test_decode_drops_empty_tlds() {
        let mut empty = bnb_tld();
        empty.tld = String::new();
        let encoded = encode_tld_info_list(vec![bnb_tld(), empty]);

        let decoded = decode_tld_info_list(&encoded).unwrap();
        assert_eq!(decoded, vec![bnb_tld()]);
    }

    #[test]
    fn test_get_tld_info_selector() {
        let data = encode_get_tld_info(&["bnb".to_string()]);
        assert_eq!(&data[..4], &abi::selector(GET_TLD_INFO_SIGNATURE));
    }

    #[tokio::test]
    async fn test_directory_queries() {
        let chain = MockChain::new();
        chain.add_tld(bnb_tld(), &[56]);
        let directory = TldDirectory::new(chain.hub_config(), MockConnector::shared(chain.clone()));
        let deadline = Deadline::unbounded();

        let found = directory
            .get_tld_info(&["bnb".into(), "nope".into()], &deadline)
            .await
            .unwrap();
        assert_eq!(found, vec![bnb_tld()]);

        assert!(directory
            .get_tld_info(&["nope".into()], &deadline)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            directory.get_chain_tlds(56, &deadline).await.unwrap(),
            vec!["bnb".to_string()]
        );
        assert!(directory.get_chain_tlds(1, &deadline).await.unwrap().is_empty());
        assert_eq!(
            directory.get_all_tlds(&deadline).await.unwrap(),
            vec!["bnb".to_string()]
        );
    }
}
