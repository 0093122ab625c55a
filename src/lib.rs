//! Multi-chain domain name resolution.
//!
//! [`Web3Name`] resolves names to addresses and addresses back to verified
//! names across every TLD registered with the SPACE ID TLD hub, plus ENS,
//! Lens, Unstoppable Domains, Solana, Sei, Injective and PaymentID names.

pub mod abi;
pub mod adapters;
pub mod chains;
pub mod client;
pub mod config;
pub mod error;
pub mod hub;
pub mod namehash;
pub mod reader;
pub mod timeout;
pub mod validate;
pub mod web3name;

#[cfg(test)]
mod test_utils;

pub use config::Web3NameConfig;
pub use error::{Result, Web3NameError};
pub use hub::TldInfo;
pub use namehash::{namehash, tld_namehash};
pub use validate::NameRules;
pub use web3name::{
    AddressEntry, AddressOptions, DomainEntry, DomainNameOptions, ExternalClients, RecordOptions,
    Web3Name,
};
