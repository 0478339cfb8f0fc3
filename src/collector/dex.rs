//! On-chain AMM pool state collection
//!
//! Resolves Uniswap V3 pools through each chain's factory, caches the
//! resolution (pool address, fee tier, token ordering), and reads `slot0`
//! every cycle. Decoding the packed price is delegated to `pool::decoder`;
//! a decode failure drops the observation for this cycle instead of
//! reporting a bogus price.

use anyhow::{bail, Context, Result};
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{ChainConfig, TokenConfig};
use crate::pool::{decode, PoolRawState};
use crate::types::DexQuote;

abigen!(
    UniswapV3Factory,
    r#"[
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool)
    ]"#;

    UniswapV3Pool,
    r#"[
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
    ]"#;
);

/// Fee tiers probed when resolving a pool, most liquid first
const FEE_TIERS: [u32; 4] = [3000, 500, 10_000, 100];

/// Per-chain RPC handle with pre-parsed contract addresses
struct ChainHandle {
    provider: Arc<Provider<Http>>,
    stable: Address,
    stable_decimals: u8,
    factory: Address,
}

/// Resolved pool, cached across cycles
#[derive(Debug, Clone, Copy)]
struct PoolHandle {
    address: Address,
    quote_is_token0: bool,
    token0_decimals: u8,
    token1_decimals: u8,
}

/// Reads AMM pool prices across all configured chains
pub struct PoolReader {
    chains: HashMap<String, ChainHandle>,
    cache: RwLock<HashMap<(String, String), PoolHandle>>,
}

impl PoolReader {
    pub fn new(chains: &[ChainConfig]) -> Result<Self> {
        let mut handles = HashMap::new();
        for chain in chains {
            let provider = Provider::<Http>::try_from(chain.rpc_url.as_str())
                .with_context(|| format!("bad RPC url for chain {}", chain.name))?;
            let stable: Address = chain
                .stable_address
                .parse()
                .with_context(|| format!("bad stablecoin address on {}", chain.name))?;
            let factory: Address = chain
                .factory_address
                .parse()
                .with_context(|| format!("bad factory address on {}", chain.name))?;
            handles.insert(
                chain.name.clone(),
                ChainHandle {
                    provider: Arc::new(provider),
                    stable,
                    stable_decimals: chain.stable_decimals,
                    factory,
                },
            );
        }
        Ok(Self {
            chains: handles,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Read the current pool price for one (chain, token) pair.
    ///
    /// `Ok(None)` means the token is not listed on the chain, no pool exists
    /// at any probed fee tier, or the pool state failed to decode this cycle.
    /// `Err` is reserved for RPC-level failures the caller may want to log.
    pub async fn fetch_quote(&self, chain_name: &str, token: &TokenConfig) -> Result<Option<DexQuote>> {
        let Some(chain) = self.chains.get(chain_name) else {
            bail!("chain {} is not configured", chain_name);
        };
        let Some(address_str) = token.addresses.get(chain_name) else {
            return Ok(None);
        };
        let token_address: Address = address_str
            .parse()
            .with_context(|| format!("bad address for {} on {}", token.symbol, chain_name))?;

        let handle = match self
            .resolve_pool(chain_name, chain, token, token_address)
            .await?
        {
            Some(handle) => handle,
            None => return Ok(None),
        };

        let pool = UniswapV3Pool::new(handle.address, chain.provider.clone());
        let (sqrt_price_x96, ..) = pool
            .slot_0()
            .call()
            .await
            .with_context(|| format!("slot0 call failed for {} on {}", token.symbol, chain_name))?;

        let raw = PoolRawState {
            sqrt_price_x96,
            token0_decimals: handle.token0_decimals,
            token1_decimals: handle.token1_decimals,
        };
        match decode(&raw, handle.quote_is_token0) {
            Ok(price) => Ok(Some(DexQuote {
                price,
                liquidity: None,
            })),
            Err(e) => {
                warn!(
                    token = %token.symbol,
                    chain = chain_name,
                    error = %e,
                    "pool state failed to decode, skipping observation"
                );
                Ok(None)
            }
        }
    }

    /// Find the pool through the factory, trying fee tiers in liquidity
    /// order, and cache the result for subsequent cycles.
    async fn resolve_pool(
        &self,
        chain_name: &str,
        chain: &ChainHandle,
        token: &TokenConfig,
        token_address: Address,
    ) -> Result<Option<PoolHandle>> {
        let key = (chain_name.to_string(), token.symbol.clone());
        if let Some(handle) = self.cache.read().await.get(&key) {
            return Ok(Some(*handle));
        }

        let factory = UniswapV3Factory::new(chain.factory, chain.provider.clone());
        for fee in FEE_TIERS {
            let pool_address = factory
                .get_pool(token_address, chain.stable, fee)
                .call()
                .await
                .with_context(|| {
                    format!("getPool call failed for {} on {}", token.symbol, chain_name)
                })?;
            if pool_address == Address::zero() {
                continue;
            }

            let quote_is_token0 = chain.stable < token_address;
            let (token0_decimals, token1_decimals) = if quote_is_token0 {
                (chain.stable_decimals, token.decimals)
            } else {
                (token.decimals, chain.stable_decimals)
            };
            let handle = PoolHandle {
                address: pool_address,
                quote_is_token0,
                token0_decimals,
                token1_decimals,
            };
            debug!(
                token = %token.symbol,
                chain = chain_name,
                pool = %pool_address,
                fee,
                "resolved pool"
            );
            self.cache.write().await.insert(key, handle);
            return Ok(Some(handle));
        }

        debug!(token = %token.symbol, chain = chain_name, "no pool at any fee tier");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ordering_follows_address_sort() {
        let stable: Address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
            .parse()
            .unwrap();
        let weth: Address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
            .parse()
            .unwrap();
        // USDC sorts below WETH on mainnet, so the stablecoin is token0
        assert!(stable < weth);

        let low: Address = "0x0000000000000000000000000000000000000001"
            .parse()
            .unwrap();
        assert!(!(stable < low));
    }

    #[test]
    fn fee_tiers_probe_most_liquid_first() {
        assert_eq!(FEE_TIERS[0], 3000);
        assert_eq!(FEE_TIERS.len(), 4);
    }
}
