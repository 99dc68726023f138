//! Uniswap V3 concentrated-liquidity adapter.
//!
//! Positions are enumerated through the position NFT, then valued from
//! liquidity + tick range against the owning pool's current price. Fee
//! income accrues continuously rather than being quoted as a rate, so
//! positions carry no APY and the adapter publishes no protocol-wide
//! rates.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::traits::{PriceResolver, ProtocolAdapter};
use vantage_common::types::{
    ChainId, Position, PositionType, ProtocolCategory, ProtocolInfo, TokenBalance, WalletAddress,
    YieldRate,
};

use crate::contracts::{IERC20Metadata, INonfungiblePositionManager, IUniswapV3Factory, IUniswapV3Pool};
use crate::math::{amounts_for_liquidity, in_range, sqrt_price_from_x96, tick_to_sqrt_price};

const PROTOCOL_ID: &str = "uniswap-v3";

/// Upper bound on enumerated position NFTs per wallet per chain.
const MAX_ENUMERATED: u64 = 50;

struct Deployment {
    position_manager: &'static str,
    factory: &'static str,
}

const SUPPORTED: [ChainId; 3] = [ChainId::Ethereum, ChainId::Arbitrum, ChainId::Base];

fn deployment(chain: ChainId) -> Option<Deployment> {
    match chain {
        ChainId::Ethereum | ChainId::Arbitrum => Some(Deployment {
            position_manager: "0xC36442b4a4522E871399CD717aBDD847Ab11FE88",
            factory: "0x1F98431c8aD98523631AE4a59f267346ea31F984",
        }),
        ChainId::Base => Some(Deployment {
            position_manager: "0x03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1",
            factory: "0x33128a8fC17869897dcE68Ed026d694621f6FDfD",
        }),
        _ => None,
    }
}

pub struct UniswapAdapter {
    prices: Arc<dyn PriceResolver>,
}

impl UniswapAdapter {
    pub fn new(prices: Arc<dyn PriceResolver>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl ProtocolAdapter for UniswapAdapter {
    fn protocol(&self) -> ProtocolInfo {
        ProtocolInfo {
            id: PROTOCOL_ID.to_string(),
            name: "Uniswap V3".to_string(),
            category: ProtocolCategory::ConcentratedLiquidity,
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
            let owner = address.evm()?;
            let npm_addr: Address = deployment
                .position_manager
                .parse()
                .expect("invalid position manager address");
            let count = INonfungiblePositionManager::new(npm_addr, provider.clone())
                .balanceOf(owner)
                .call()
                .await
                .map_err(|e| VantageError::Network(e.to_string()))?;
            Ok::<_, VantageError>(!count.is_zero())
        };

        match probe.await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(chain = %chain, error = %e, "uniswap probe failed, treating as no position");
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
        let owner = address.evm()?;

        let npm_addr: Address = deployment
            .position_manager
            .parse()
            .expect("invalid position manager address");
        let factory_addr: Address = deployment.factory.parse().expect("invalid factory address");

        let npm = INonfungiblePositionManager::new(npm_addr, provider.clone());
        let factory = IUniswapV3Factory::new(factory_addr, provider.clone());

        let count = npm
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| VantageError::Protocol {
                protocol: PROTOCOL_ID.into(),
                message: format!("balanceOf: {e}"),
            })?;
        let total = count.to::<u64>();
        let enumerated = total.min(MAX_ENUMERATED);
        if total > enumerated {
            warn!(chain = %chain, total, enumerated, "position NFT list truncated");
        }

        let mut positions = Vec::new();
        let mut failures = 0u64;

        for index in 0..enumerated {
            match self
                .read_position(&npm, &factory, provider, owner, chain, index)
                .await
            {
                Ok(Some(position)) => positions.push(position),
                Ok(None) => {}
                Err(e) => {
                    failures += 1;
                    debug!(chain = %chain, index, error = %e, "uniswap position row skipped");
                }
            }
        }

        if enumerated > 0 && positions.is_empty() && failures == enumerated {
            return Err(VantageError::Protocol {
                protocol: PROTOCOL_ID.into(),
                message: "every position row failed to decode".into(),
            });
        }

        Ok(positions)
    }

    async fn get_yield_rates(
        &self,
        _client: &ChainClient,
        _chain: ChainId,
    ) -> VantageResult<Vec<YieldRate>> {
        // Fee APR varies per pool and position; there is no protocol-wide
        // quoted rate to publish.
        Ok(Vec::new())
    }
}

impl UniswapAdapter {
    #[allow(clippy::too_many_arguments)]
    async fn read_position(
        &self,
        npm: &INonfungiblePositionManager::INonfungiblePositionManagerInstance<
            vantage_common::client::EvmProvider,
        >,
        factory: &IUniswapV3Factory::IUniswapV3FactoryInstance<vantage_common::client::EvmProvider>,
        provider: &vantage_common::client::EvmProvider,
        owner: Address,
        chain: ChainId,
        index: u64,
    ) -> VantageResult<Option<Position>> {
        let token_id = npm
            .tokenOfOwnerByIndex(owner, U256::from(index))
            .call()
            .await
            .map_err(|e| VantageError::Decode(format!("tokenOfOwnerByIndex: {e}")))?;

        let detail = npm
            .positions(token_id)
            .call()
            .await
            .map_err(|e| VantageError::Decode(format!("positions({token_id}): {e}")))?;

        let liquidity = detail.liquidity;
        if liquidity == 0 && detail.tokensOwed0 == 0 && detail.tokensOwed1 == 0 {
            return Ok(None);
        }

        let pool_addr = factory
            .getPool(detail.token0, detail.token1, detail.fee)
            .call()
            .await
            .map_err(|e| VantageError::Decode(format!("getPool: {e}")))?;
        if pool_addr == Address::ZERO {
            return Err(VantageError::Decode("pool not found".into()));
        }

        let slot0 = IUniswapV3Pool::new(pool_addr, provider.clone())
            .slot0()
            .call()
            .await
            .map_err(|e| VantageError::Decode(format!("slot0: {e}")))?;

        let (symbol0, decimals0) = token_metadata(provider, detail.token0).await?;
        let (symbol1, decimals1) = token_metadata(provider, detail.token1).await?;

        let tick_lower = i32::try_from(detail.tickLower).unwrap_or_default();
        let tick_upper = i32::try_from(detail.tickUpper).unwrap_or_default();
        let current_tick = i32::try_from(slot0.tick).unwrap_or_default();

        let sqrt_current = sqrt_price_from_x96(&slot0.sqrtPriceX96.to_string());
        let (raw0, raw1) = amounts_for_liquidity(
            liquidity,
            sqrt_current,
            tick_to_sqrt_price(tick_lower),
            tick_to_sqrt_price(tick_upper),
        );
        // Uncollected fees are part of the position's value.
        let raw0 = raw0 + detail.tokensOwed0 as f64;
        let raw1 = raw1 + detail.tokensOwed1 as f64;

        let amount0 =
            Decimal::from_f64(raw0 / 10f64.powi(i32::from(decimals0))).unwrap_or_default();
        let amount1 =
            Decimal::from_f64(raw1 / 10f64.powi(i32::from(decimals1))).unwrap_or_default();

        let token0_address = format!("{:#x}", detail.token0);
        let token1_address = format!("{:#x}", detail.token1);
        let quote0 = self.prices.resolve(chain, &symbol0, &token0_address).await;
        let quote1 = self.prices.resolve(chain, &symbol1, &token1_address).await;

        let value0 = amount0 * quote0.price_usd;
        let value1 = amount1 * quote1.price_usd;

        let fee = detail.fee.to::<u32>();
        let market = format!("{symbol0}-{symbol1}-{fee}-{token_id}");

        Ok(Some(Position {
            id: Position::derive_id(PROTOCOL_ID, chain, &market, PositionType::Liquidity),
            protocol: self.protocol(),
            chain,
            position_type: PositionType::Liquidity,
            tokens: vec![
                TokenBalance {
                    address: token0_address,
                    symbol: symbol0,
                    decimals: decimals0,
                    raw_balance: format!("{raw0:.0}"),
                    balance: amount0,
                    price_usd: quote0.price_usd,
                    value_usd: value0,
                },
                TokenBalance {
                    address: token1_address,
                    symbol: symbol1,
                    decimals: decimals1,
                    raw_balance: format!("{raw1:.0}"),
                    balance: amount1,
                    price_usd: quote1.price_usd,
                    value_usd: value1,
                },
            ],
            value_usd: value0 + value1,
            apy: None,
            apr: None,
            health_factor: None,
            metadata: Some(serde_json::json!({
                "token_id": token_id.to_string(),
                "fee": fee,
                "tick_lower": tick_lower,
                "tick_upper": tick_upper,
                "current_tick": current_tick,
                "in_range": in_range(current_tick, tick_lower, tick_upper),
            })),
        }))
    }
}

async fn token_metadata(
    provider: &vantage_common::client::EvmProvider,
    token: Address,
) -> VantageResult<(String, u8)> {
    let metadata = IERC20Metadata::new(token, provider.clone());
    let symbol = metadata
        .symbol()
        .call()
        .await
        .map_err(|e| VantageError::Decode(format!("symbol({token}): {e}")))?;
    let decimals = metadata
        .decimals()
        .call()
        .await
        .map_err(|e| VantageError::Decode(format!("decimals({token}): {e}")))?;
    Ok((symbol, decimals))
}
