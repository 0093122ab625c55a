//! PaymentID names (`<name>@<issuer>`) on Gravity.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::{AbiEncode, ParamType};
use ethers::types::{Address, Bytes, H160, U256};
use ethers::utils::keccak256;

use super::{LookupOptions, NameService, ReverseQuery};
use crate::abi::{self, payment_id::AddrCall};
use crate::chains::Chain;
use crate::error::{Result, Web3NameError};
use crate::reader::ContractReader;
use crate::timeout::Deadline;

/// 0xb15dc8a61742A3477daaB7bd9fA249A13a8eC9A2
pub const PAYMENT_ID_READER: Address = H160([
    0xb1, 0x5d, 0xc8, 0xa6, 0x17, 0x42, 0xa3, 0x47, 0x7d, 0xaa, 0xb7, 0xbd, 0x9f, 0xa2, 0x49,
    0xa1, 0x3a, 0x8e, 0xc9, 0xa2,
]);

/// Chain whose addresses are returned as raw hex instead of text
const ETHEREUM_CHAIN_ID: u64 = 1;

/// Numeric code of a PaymentID issuer.
pub fn issuer_code(issuer: &str) -> Option<u64> {
    let code = match issuer.to_lowercase().as_str() {
        // wallets
        "metamask" => 1000,
        "okxwallet" => 1001,
        "phantom" => 1002,
        "binancewallet" => 1003,
        "truestwallet" => 1004,
        "coinbasewallet" => 1005,
        "bitgetwallet" => 1006,
        "safe" => 1007,
        "rabbywallet" => 1008,
        "gatewallet" => 1009,
        // exchanges
        "binance" => 0,
        "okx" => 1,
        "htx" => 2,
        "coinbase" => 3,
        "kraken" => 4,
        "bybit" => 5,
        "bitget" => 6,
        "kucoin" => 8,
        "upbit" => 9,
        "gate" => 10,
        _ => return None,
    };
    Some(code)
}

pub struct PaymentIdService {
    reader: Arc<ContractReader>,
    chain: Chain,
}

impl PaymentIdService {
    pub fn new(reader: Arc<ContractReader>) -> Self {
        Self {
            reader,
            chain: Chain::Gravity,
        }
    }
}

fn format_address(value: &[u8], chain_id: u64) -> Result<Option<String>> {
    if value.is_empty() {
        return Ok(None);
    }
    if chain_id == ETHEREUM_CHAIN_ID {
        return Ok(Some(format!("0x{}", hex::encode(value))));
    }
    let text = std::str::from_utf8(value)
        .map_err(|e| Web3NameError::adapter("paymentid", e))?
        .trim_end_matches('\0');
    Ok((!text.is_empty()).then(|| text.to_string()))
}

#[async_trait]
impl NameService for PaymentIdService {
    fn ecosystem(&self) -> &'static str {
        "paymentid"
    }

    async fn get_address(
        &self,
        name: &str,
        options: &LookupOptions,
        deadline: &Deadline,
    ) -> Result<Option<String>> {
        let (label, issuer) = name
            .split_once('@')
            .ok_or_else(|| Web3NameError::adapter("paymentid", format!("{name} has no issuer")))?;
        let tld_code = issuer_code(issuer)
            .ok_or_else(|| Web3NameError::adapter("paymentid", format!("unknown issuer {issuer}")))?;
        let chain_id = options.chain_id.unwrap_or(ETHEREUM_CHAIN_ID);

        // the reader lives on Gravity whatever chain the caller targets
        let client = self
            .reader
            .connect(self.chain.chain_id(), self.chain.rpc_url())?;
        let data = AddrCall {
            token_id: U256::from_big_endian(&keccak256(label.as_bytes())),
            tld_code: U256::from(tld_code),
            chain_id: U256::from(chain_id),
        }
        .encode();
        let raw = self
            .reader
            .call(client.as_ref(), PAYMENT_ID_READER, data, deadline)
            .await?;
        let value: Bytes = abi::decode_output(ParamType::Bytes, &raw)?;
        format_address(&value, chain_id)
    }

    async fn get_domain_name(
        &self,
        _query: &ReverseQuery<'_>,
        _deadline: &Deadline,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}
