//! Wallet balance fetcher — native + catalog-token balances per chain.
//!
//! Reads are scoped to the token catalog and batched per chain; each
//! balance is valued through the price service. A token whose read fails
//! is skipped (partial result); a chain whose native read fails errors
//! the whole branch, which the aggregator isolates.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;
use futures::future::join_all;
use tracing::debug;

use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::types::{ChainId, NetworkFamily, PriceQuote, TokenBalance, TokenInfo, WalletAddress};
use vantage_common::units::{format_units, format_units_u128};

use crate::chains::ChainRegistry;
use crate::price::PriceService;
use crate::tokens::TokenCatalog;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Sentinel address for a chain's native asset.
pub const NATIVE_ADDRESS: &str = "native";

/// A raw (unpriced) balance row.
struct RawBalance {
    address: String,
    symbol: String,
    decimals: u8,
    raw: U256,
}

pub struct BalanceFetcher {
    chains: Arc<ChainRegistry>,
    catalog: Arc<TokenCatalog>,
    prices: Arc<PriceService>,
}

impl BalanceFetcher {
    pub fn new(
        chains: Arc<ChainRegistry>,
        catalog: Arc<TokenCatalog>,
        prices: Arc<PriceService>,
    ) -> Self {
        Self {
            chains,
            catalog,
            prices,
        }
    }

    /// Fetch and value all nonzero balances for an address on a chain.
    ///
    /// An address of the other network family yields an empty snapshot
    /// without any remote call.
    pub async fn fetch_chain(
        &self,
        address: &WalletAddress,
        chain: ChainId,
    ) -> VantageResult<Vec<TokenBalance>> {
        if address.family() != chain.family() {
            return Ok(Vec::new());
        }

        let raw = match chain.family() {
            NetworkFamily::Evm => self.fetch_evm_raw(address, chain).await?,
            NetworkFamily::Svm => self.fetch_svm_raw(address, chain).await?,
        };

        let mut balances = Vec::with_capacity(raw.len());
        for row in raw {
            if row.raw.is_zero() {
                continue;
            }
            let quote = self
                .prices
                .resolve(chain, &row.symbol, &row.address)
                .await;
            balances.push(build_balance(row, quote));
        }

        Ok(balances)
    }

    async fn fetch_evm_raw(
        &self,
        address: &WalletAddress,
        chain: ChainId,
    ) -> VantageResult<Vec<RawBalance>> {
        let owner = address.evm()?;
        let spec = self.chains.get_spec(chain)?.clone();
        let tokens: Vec<TokenInfo> = self.catalog.tokens_for(chain).to_vec();

        self.chains
            .with_failover(chain, |client| {
                let spec = spec.clone();
                let tokens = tokens.clone();
                async move {
                    let provider = client.evm()?;

                    let native = provider
                        .get_balance(owner)
                        .await
                        .map_err(|e| VantageError::Network(format!("native balance: {e}")))?;

                    let mut rows = vec![RawBalance {
                        address: NATIVE_ADDRESS.to_string(),
                        symbol: spec.native_symbol.clone(),
                        decimals: spec.native_decimals,
                        raw: native,
                    }];

                    let reads = tokens.iter().map(|t| {
                        let provider = provider.clone();
                        async move {
                            let contract: Address = t
                                .address
                                .parse()
                                .map_err(|_| VantageError::Decode(t.address.clone()))?;
                            let erc20 = IERC20::new(contract, provider);
                            let raw = erc20
                                .balanceOf(owner)
                                .call()
                                .await
                                .map_err(|e| VantageError::Network(e.to_string()))?;
                            Ok::<_, VantageError>(RawBalance {
                                address: t.address.clone(),
                                symbol: t.symbol.clone(),
                                decimals: t.decimals,
                                raw,
                            })
                        }
                    });

                    for (token, result) in tokens.iter().zip(join_all(reads).await) {
                        match result {
                            Ok(row) => rows.push(row),
                            Err(e) => {
                                debug!(chain = %chain, token = %token.symbol, error = %e, "token balance read skipped");
                            }
                        }
                    }

                    Ok(rows)
                }
            })
            .await
    }

    async fn fetch_svm_raw(
        &self,
        address: &WalletAddress,
        chain: ChainId,
    ) -> VantageResult<Vec<RawBalance>> {
        let owner = address.as_str().to_string();
        let spec = self.chains.get_spec(chain)?.clone();
        let tokens: Vec<TokenInfo> = self.catalog.tokens_for(chain).to_vec();

        self.chains
            .with_failover(chain, |client| {
                let owner = owner.clone();
                let spec = spec.clone();
                let tokens = tokens.clone();
                async move {
                    let svm = client.svm()?;

                    let lamports = svm.get_balance(&owner).await?;
                    let mut rows = vec![RawBalance {
                        address: NATIVE_ADDRESS.to_string(),
                        symbol: spec.native_symbol.clone(),
                        decimals: spec.native_decimals,
                        raw: U256::from(lamports),
                    }];

                    let reads = tokens.iter().map(|t| {
                        let svm = svm.clone();
                        let owner = owner.clone();
                        async move {
                            let (raw, decimals) = svm.get_token_balance(&owner, &t.address).await?;
                            let decimals = if decimals > 0 { decimals } else { t.decimals };
                            Ok::<_, VantageError>(RawBalance {
                                address: t.address.clone(),
                                symbol: t.symbol.clone(),
                                decimals,
                                raw: U256::from(raw),
                            })
                        }
                    });

                    for (token, result) in tokens.iter().zip(join_all(reads).await) {
                        match result {
                            Ok(row) => rows.push(row),
                            Err(e) => {
                                debug!(chain = %chain, token = %token.symbol, error = %e, "token account read skipped");
                            }
                        }
                    }

                    Ok(rows)
                }
            })
            .await
    }
}

fn build_balance(row: RawBalance, quote: PriceQuote) -> TokenBalance {
    let amount = if row.raw <= U256::from(u128::MAX) {
        format_units_u128(row.raw.to::<u128>(), row.decimals)
    } else {
        format_units(row.raw, row.decimals)
    };
    TokenBalance {
        address: row.address,
        symbol: row.symbol,
        decimals: row.decimals,
        raw_balance: row.raw.to_string(),
        balance: amount,
        price_usd: quote.price_usd,
        value_usd: amount * quote.price_usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use vantage_common::types::PriceSource;

    use crate::ratelimit::TokenBucket;

    fn offline_fetcher() -> BalanceFetcher {
        let mut overrides = HashMap::new();
        for &chain in ChainId::all() {
            overrides.insert(chain, vec!["http://127.0.0.1:9".to_string()]);
        }
        let chains = Arc::new(ChainRegistry::with_defaults(&overrides));
        let prices = Arc::new(PriceService::new(
            chains.clone(),
            std::time::Duration::from_secs(300),
            TokenBucket::new(100.0, 100.0),
        ));
        BalanceFetcher::new(chains, Arc::new(TokenCatalog::builtin()), prices)
    }

    #[test]
    fn test_build_balance_values() {
        let row = RawBalance {
            address: "0xusdc".into(),
            symbol: "USDC".into(),
            decimals: 6,
            raw: U256::from(10_000_000_000u64),
        };
        let quote = PriceQuote {
            price_usd: dec!(1),
            source: PriceSource::Synthetic,
        };
        let balance = build_balance(row, quote);
        assert_eq!(balance.balance, dec!(10000));
        assert_eq!(balance.value_usd, dec!(10000));
        assert_eq!(balance.raw_balance, "10000000000");
    }

    #[test]
    fn test_build_balance_unknown_price_values_zero() {
        let row = RawBalance {
            address: "0xpepe".into(),
            symbol: "PEPE".into(),
            decimals: 18,
            raw: U256::from(5_000_000_000_000_000_000u128),
        };
        let quote = PriceQuote {
            price_usd: dec!(0),
            source: PriceSource::Unknown,
        };
        let balance = build_balance(row, quote);
        assert_eq!(balance.balance, dec!(5));
        assert_eq!(balance.value_usd, dec!(0));
    }

    #[tokio::test]
    async fn test_family_mismatch_is_empty_without_remote_calls() {
        let fetcher = offline_fetcher();
        let evm = WalletAddress::parse("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        let balances = fetcher.fetch_chain(&evm, ChainId::Solana).await.unwrap();
        assert!(balances.is_empty());

        let svm = WalletAddress::parse("4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T").unwrap();
        let balances = fetcher.fetch_chain(&svm, ChainId::Ethereum).await.unwrap();
        assert!(balances.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_chain_errors_branch() {
        let fetcher = offline_fetcher();
        let evm = WalletAddress::parse("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        assert!(fetcher.fetch_chain(&evm, ChainId::Ethereum).await.is_err());
    }
}
