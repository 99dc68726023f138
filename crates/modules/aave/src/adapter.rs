//! Aave V3 lending adapter.
//!
//! One cheap `getUserAccountData` call serves as the existence probe;
//! the full read walks the known reserve list and decodes supply/borrow
//! rows per reserve, skipping rows that fail to decode.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::debug;

use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::traits::{PriceResolver, ProtocolAdapter};
use vantage_common::types::{
    ChainId, Position, PositionType, ProtocolCategory, ProtocolInfo, TokenBalance, WalletAddress,
    YieldRate,
};
use vantage_common::units::{format_units, ray_to_decimal, wad_to_decimal};

use crate::contracts::{IPool, IPoolDataProvider};

const PROTOCOL_ID: &str = "aave-v3";

/// Aave returns `U256::MAX` health factor when there are no borrows;
/// anything above this bound is "not applicable".
const MAX_SANE_HEALTH_FACTOR: u64 = 1_000_000;

struct Deployment {
    pool: &'static str,
    data_provider: &'static str,
}

struct Reserve {
    address: &'static str,
    symbol: &'static str,
    decimals: u8,
}

const SUPPORTED: [ChainId; 3] = [ChainId::Ethereum, ChainId::Arbitrum, ChainId::Base];

fn deployment(chain: ChainId) -> Option<Deployment> {
    match chain {
        ChainId::Ethereum => Some(Deployment {
            pool: "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2",
            data_provider: "0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3",
        }),
        ChainId::Arbitrum => Some(Deployment {
            pool: "0x794a61358D6845594F94dc1DB02A252b5b4814aD",
            data_provider: "0x69FA688f1Dc47d4B5d8029D5a35FB7a548310654",
        }),
        ChainId::Base => Some(Deployment {
            pool: "0xA238Dd80C259a72e81d7e4664a9801593F98d1c5",
            data_provider: "0x2d8A3C5677189723C4cB8873CfC9C8976FDF38Ac",
        }),
        _ => None,
    }
}

fn reserves(chain: ChainId) -> &'static [Reserve] {
    match chain {
        ChainId::Ethereum => &[
            Reserve { address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", symbol: "WETH", decimals: 18 },
            Reserve { address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", symbol: "USDC", decimals: 6 },
            Reserve { address: "0xdAC17F958D2ee523a2206206994597C13D831ec7", symbol: "USDT", decimals: 6 },
            Reserve { address: "0x6B175474E89094C44Da98b954EedeAC495271d0F", symbol: "DAI", decimals: 18 },
            Reserve { address: "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", symbol: "WBTC", decimals: 8 },
            Reserve { address: "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0", symbol: "wstETH", decimals: 18 },
        ],
        ChainId::Arbitrum => &[
            Reserve { address: "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", symbol: "WETH", decimals: 18 },
            Reserve { address: "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", symbol: "USDC", decimals: 6 },
            Reserve { address: "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", symbol: "USDT", decimals: 6 },
            Reserve { address: "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f", symbol: "WBTC", decimals: 8 },
            Reserve { address: "0x912CE59144191C1204E64559FE8253a0e49E6548", symbol: "ARB", decimals: 18 },
        ],
        ChainId::Base => &[
            Reserve { address: "0x4200000000000000000000000000000000000006", symbol: "WETH", decimals: 18 },
            Reserve { address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", symbol: "USDC", decimals: 6 },
            Reserve { address: "0x2Ae3F1Ec7F1F5012CFEab0185bfc7aa3cf0DEc22", symbol: "cbETH", decimals: 18 },
        ],
        _ => &[],
    }
}

/// Health factor within its meaningful range, else `None`.
fn sane_health_factor(hf: Decimal) -> Option<Decimal> {
    if hf > Decimal::ZERO && hf < Decimal::from(MAX_SANE_HEALTH_FACTOR) {
        Some(hf)
    } else {
        None
    }
}

pub struct AaveAdapter {
    prices: Arc<dyn PriceResolver>,
}

impl AaveAdapter {
    pub fn new(prices: Arc<dyn PriceResolver>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl ProtocolAdapter for AaveAdapter {
    fn protocol(&self) -> ProtocolInfo {
        ProtocolInfo {
            id: PROTOCOL_ID.to_string(),
            name: "Aave V3".to_string(),
            category: ProtocolCategory::Lending,
            earns_yield: true,
        }
    }

    fn supported_chains(&self) -> &[ChainId] {
        &SUPPORTED
    }

    async fn has_positions(
        &self,
        client: &ChainClient,
        address: &WalletAddress,
        chain: ChainId,
    ) -> bool {
        let probe = async {
            let deployment = deployment(chain)
                .ok_or_else(|| VantageError::UnsupportedChain(chain.to_string()))?;
            let provider = client.evm()?;
            let user = address.evm()?;
            let pool_addr: Address = deployment.pool.parse().expect("invalid pool address");
            let pool = IPool::new(pool_addr, provider.clone());
            let account = pool
                .getUserAccountData(user)
                .call()
                .await
                .map_err(|e| VantageError::Network(e.to_string()))?;
            Ok::<_, VantageError>(
                !account.totalCollateralBase.is_zero() || !account.totalDebtBase.is_zero(),
            )
        };

        match probe.await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(chain = %chain, error = %e, "aave probe failed, treating as no position");
                false
            }
        }
    }

    async fn get_positions(
        &self,
        client: &ChainClient,
        address: &WalletAddress,
        chain: ChainId,
    ) -> VantageResult<Vec<Position>> {
        let deployment =
            deployment(chain).ok_or_else(|| VantageError::UnsupportedChain(chain.to_string()))?;
        let provider = client.evm()?;
        let user = address.evm()?;

        let pool_addr: Address = deployment.pool.parse().expect("invalid pool address");
        let dp_addr: Address = deployment
            .data_provider
            .parse()
            .expect("invalid data provider address");

        let pool = IPool::new(pool_addr, provider.clone());
        let account = pool
            .getUserAccountData(user)
            .call()
            .await
            .map_err(|e| VantageError::Protocol {
                protocol: PROTOCOL_ID.into(),
                message: format!("getUserAccountData: {e}"),
            })?;
        let health_factor = sane_health_factor(wad_to_decimal(account.healthFactor));

        let dp = IPoolDataProvider::new(dp_addr, provider.clone());
        let reads = reserves(chain).iter().map(|reserve| {
            let dp = dp.clone();
            async move {
                let asset: Address = reserve.address.parse().expect("invalid reserve address");
                let user_data = dp
                    .getUserReserveData(asset, user)
                    .call()
                    .await
                    .map_err(|e| VantageError::Decode(format!("{}: {e}", reserve.symbol)))?;

                // Borrow rows also need the reserve-wide borrow rate.
                let debt = user_data.currentStableDebt + user_data.currentVariableDebt;
                let reserve_data = if debt.is_zero() {
                    None
                } else {
                    dp.getReserveData(asset).call().await.ok()
                };
                Ok::<_, VantageError>((reserve, user_data, reserve_data))
            }
        });

        let mut positions = Vec::new();
        for result in join_all(reads).await {
            let (reserve, user_data, reserve_data) = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!(chain = %chain, error = %e, "aave reserve row skipped");
                    continue;
                }
            };

            let quote = self
                .prices
                .resolve(chain, reserve.symbol, reserve.address)
                .await;

            if !user_data.currentATokenBalance.is_zero() {
                let amount = format_units(user_data.currentATokenBalance, reserve.decimals);
                let value = amount * quote.price_usd;
                positions.push(Position {
                    id: Position::derive_id(PROTOCOL_ID, chain, reserve.symbol, PositionType::Supply),
                    protocol: self.protocol(),
                    chain,
                    position_type: PositionType::Supply,
                    tokens: vec![TokenBalance {
                        address: reserve.address.to_string(),
                        symbol: reserve.symbol.to_string(),
                        decimals: reserve.decimals,
                        raw_balance: user_data.currentATokenBalance.to_string(),
                        balance: amount,
                        price_usd: quote.price_usd,
                        value_usd: value,
                    }],
                    value_usd: value,
                    apy: Some(ray_to_decimal(user_data.liquidityRate)),
                    apr: None,
                    health_factor,
                    metadata: Some(serde_json::json!({
                        "collateral": user_data.usageAsCollateralEnabled,
                    })),
                });
            }

            let debt = user_data.currentStableDebt + user_data.currentVariableDebt;
            if !debt.is_zero() {
                let amount = format_units(debt, reserve.decimals);
                let value = amount * quote.price_usd;
                let borrow_apy = reserve_data
                    .map(|d| ray_to_decimal(d.variableBorrowRate))
                    .unwrap_or_else(|| ray_to_decimal(user_data.stableBorrowRate));
                positions.push(Position {
                    id: Position::derive_id(PROTOCOL_ID, chain, reserve.symbol, PositionType::Borrow),
                    protocol: self.protocol(),
                    chain,
                    position_type: PositionType::Borrow,
                    tokens: vec![TokenBalance {
                        address: reserve.address.to_string(),
                        symbol: reserve.symbol.to_string(),
                        decimals: reserve.decimals,
                        raw_balance: debt.to_string(),
                        balance: amount,
                        price_usd: quote.price_usd,
                        value_usd: value,
                    }],
                    // Liabilities carry negative value.
                    value_usd: -value,
                    apy: Some(borrow_apy),
                    apr: None,
                    health_factor,
                    metadata: None,
                });
            }
        }

        Ok(positions)
    }

    async fn get_yield_rates(
        &self,
        client: &ChainClient,
        chain: ChainId,
    ) -> VantageResult<Vec<YieldRate>> {
        let deployment =
            deployment(chain).ok_or_else(|| VantageError::UnsupportedChain(chain.to_string()))?;
        let provider = client.evm()?;
        let dp_addr: Address = deployment
            .data_provider
            .parse()
            .expect("invalid data provider address");
        let dp = IPoolDataProvider::new(dp_addr, provider.clone());

        let reads = reserves(chain).iter().map(|reserve| {
            let dp = dp.clone();
            async move {
                let asset: Address = reserve.address.parse().expect("invalid reserve address");
                dp.getReserveData(asset)
                    .call()
                    .await
                    .map(|data| (reserve, data))
                    .map_err(|e| VantageError::Decode(format!("{}: {e}", reserve.symbol)))
            }
        });

        let mut rates = Vec::new();
        for result in join_all(reads).await {
            let (reserve, data) = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!(chain = %chain, error = %e, "aave rate row skipped");
                    continue;
                }
            };
            rates.push(YieldRate {
                protocol_id: PROTOCOL_ID.to_string(),
                protocol_name: "Aave V3".to_string(),
                chain,
                symbol: reserve.symbol.to_string(),
                address: Some(reserve.address.to_string()),
                position_type: PositionType::Supply,
                apy: ray_to_decimal(data.liquidityRate),
                apr: None,
            });
            rates.push(YieldRate {
                protocol_id: PROTOCOL_ID.to_string(),
                protocol_name: "Aave V3".to_string(),
                chain,
                symbol: reserve.symbol.to_string(),
                address: Some(reserve.address.to_string()),
                position_type: PositionType::Borrow,
                apy: ray_to_decimal(data.variableBorrowRate),
                apr: None,
            });
        }

        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_supported_chains_have_deployments() {
        for &chain in &SUPPORTED {
            let d = deployment(chain).expect("missing deployment");
            assert!(d.pool.parse::<Address>().is_ok());
            assert!(d.data_provider.parse::<Address>().is_ok());
            assert!(!reserves(chain).is_empty());
        }
        assert!(deployment(ChainId::Solana).is_none());
    }

    #[test]
    fn test_reserve_addresses_parse() {
        for &chain in &SUPPORTED {
            for reserve in reserves(chain) {
                assert!(
                    reserve.address.parse::<Address>().is_ok(),
                    "bad address for {} on {chain}",
                    reserve.symbol
                );
            }
        }
    }

    #[test]
    fn test_sane_health_factor_bounds() {
        assert_eq!(sane_health_factor(dec!(1.5)), Some(dec!(1.5)));
        assert_eq!(sane_health_factor(dec!(0.85)), Some(dec!(0.85)));
        assert_eq!(sane_health_factor(dec!(0)), None);
        // U256::MAX-style sentinel collapses to out-of-range.
        assert_eq!(sane_health_factor(dec!(79000000000000000000)), None);
    }

    #[test]
    fn test_position_ids_stable_per_market() {
        let supply = Position::derive_id(PROTOCOL_ID, ChainId::Ethereum, "USDC", PositionType::Supply);
        let borrow = Position::derive_id(PROTOCOL_ID, ChainId::Ethereum, "USDC", PositionType::Borrow);
        assert_ne!(supply, borrow);
        assert!(supply.starts_with("aave-v3:ethereum:USDC"));
    }
}
