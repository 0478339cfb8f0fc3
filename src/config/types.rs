//! Immutable venue configuration tables
//!
//! Token and chain entries are loaded once at startup and validated before
//! the first collection cycle; a bad entry fails fast instead of producing
//! silent mid-cycle errors.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashMap;

use crate::pool::MAX_TOKEN_DECIMALS;

/// One logical asset and how each venue identifies it
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Unique asset symbol (e.g. "WETH")
    pub symbol: String,
    /// Exact on-chain decimal precision
    pub decimals: u8,
    /// External price-feed identifier (e.g. the coingecko id)
    pub feed_id: String,
    /// Centralized-exchange trading pair (e.g. "ETHUSDC")
    pub exchange_pair: String,
    /// Token contract address per chain name; a token may be absent
    /// from some chains
    #[serde(default)]
    pub addresses: HashMap<String, String>,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("token with empty symbol");
        }
        if self.decimals > MAX_TOKEN_DECIMALS {
            bail!(
                "token {}: decimals {} exceed the supported maximum {}",
                self.symbol,
                self.decimals,
                MAX_TOKEN_DECIMALS
            );
        }
        if self.exchange_pair.trim().is_empty() {
            bail!("token {}: empty exchange pair", self.symbol);
        }
        for (chain, address) in &self.addresses {
            if !is_hex_address(address) {
                bail!(
                    "token {}: malformed address {} on chain {}",
                    self.symbol,
                    address,
                    chain
                );
            }
        }
        Ok(())
    }
}

/// One blockchain network hosting AMM pools
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Unique network identifier (e.g. "ethereum")
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Quote stablecoin contract address on this chain
    pub stable_address: String,
    /// Quote stablecoin decimals
    #[serde(default = "default_stable_decimals")]
    pub stable_decimals: u8,
    /// AMM factory contract address
    pub factory_address: String,
}

fn default_stable_decimals() -> u8 {
    6
}

impl ChainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("chain with empty name");
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            bail!("chain {}: rpc_url must be an http(s) endpoint", self.name);
        }
        if !is_hex_address(&self.stable_address) {
            bail!(
                "chain {}: malformed stablecoin address {}",
                self.name,
                self.stable_address
            );
        }
        if self.stable_decimals > MAX_TOKEN_DECIMALS {
            bail!(
                "chain {}: stablecoin decimals {} exceed the supported maximum {}",
                self.name,
                self.stable_decimals,
                MAX_TOKEN_DECIMALS
            );
        }
        if !is_hex_address(&self.factory_address) {
            bail!(
                "chain {}: malformed factory address {}",
                self.name,
                self.factory_address
            );
        }
        Ok(())
    }
}

/// `0x` followed by 40 hex digits
pub fn is_hex_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
