//! EigenLayer restaking adapter (Ethereum).
//!
//! Positions are staker shares in known LST strategies, valued through
//! each strategy's share→underlying exchange rate. Restaking yield is
//! not quoted on-chain; per-strategy rates ship as maintained estimates.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::traits::{PriceResolver, ProtocolAdapter};
use vantage_common::types::{
    ChainId, Position, PositionType, ProtocolCategory, ProtocolInfo, TokenBalance, WalletAddress,
    YieldRate,
};
use vantage_common::units::format_units;

use crate::contracts::{IStrategy, IStrategyManager};

const PROTOCOL_ID: &str = "eigenlayer";

const STRATEGY_MANAGER: &str = "0x858646372CC42E1A627fcE94aa7A7033e7CF075A";

struct Strategy {
    address: &'static str,
    underlying_address: &'static str,
    underlying_symbol: &'static str,
    /// Maintained restaking APY estimate (fraction).
    apy: Decimal,
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        address: "0x93c4b944D05dfe6df7645A86cd2206016c51564D",
        underlying_address: "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84",
        underlying_symbol: "stETH",
        apy: dec!(0.042),
    },
    Strategy {
        address: "0x1BeE69b7dFFfA4E2d53C2a2Df135C388AD25dCD2",
        underlying_address: "0xae78736Cd615f374D3085123A210448E74Fc6393",
        underlying_symbol: "rETH",
        apy: dec!(0.039),
    },
    Strategy {
        address: "0x54945180dB7943c0ed0FEE7EdaB2Bd24620256bc",
        underlying_address: "0x2Ae3F1Ec7F1F5012CFEab0185bfc7aa3cf0DEc22",
        underlying_symbol: "cbETH",
        apy: dec!(0.037),
    },
];

const SUPPORTED: [ChainId; 1] = [ChainId::Ethereum];

pub struct EigenLayerAdapter {
    prices: Arc<dyn PriceResolver>,
}

impl EigenLayerAdapter {
    pub fn new(prices: Arc<dyn PriceResolver>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl ProtocolAdapter for EigenLayerAdapter {
    fn protocol(&self) -> ProtocolInfo {
        ProtocolInfo {
            id: PROTOCOL_ID.to_string(),
            name: "EigenLayer".to_string(),
            category: ProtocolCategory::Restaking,
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
            let provider = client.evm()?;
            let staker = address.evm()?;
            let manager_addr: Address = STRATEGY_MANAGER
                .parse()
                .expect("invalid strategy manager address");
            let manager = IStrategyManager::new(manager_addr, provider.clone());
            let count = manager
                .stakerStrategyListLength(staker)
                .call()
                .await
                .map_err(|e| VantageError::Network(e.to_string()))?;
            Ok::<_, VantageError>(!count.is_zero())
        };

        match probe.await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(chain = %chain, error = %e, "eigenlayer probe failed, treating as no position");
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
        let provider = client.evm()?;
        let staker = address.evm()?;
        let manager_addr: Address = STRATEGY_MANAGER
            .parse()
            .expect("invalid strategy manager address");
        let manager = IStrategyManager::new(manager_addr, provider.clone());

        let reads = STRATEGIES.iter().map(|strategy| {
            let manager = manager.clone();
            let provider = provider.clone();
            async move {
                let strategy_addr: Address =
                    strategy.address.parse().expect("invalid strategy address");
                let shares = manager
                    .stakerStrategyShares(staker, strategy_addr)
                    .call()
                    .await
                    .map_err(|e| {
                        VantageError::Decode(format!("{}: {e}", strategy.underlying_symbol))
                    })?;
                if shares.is_zero() {
                    return Ok::<_, VantageError>(None);
                }
                let underlying = IStrategy::new(strategy_addr, provider)
                    .sharesToUnderlyingView(shares)
                    .call()
                    .await
                    .map_err(|e| {
                        VantageError::Decode(format!("{}: {e}", strategy.underlying_symbol))
                    })?;
                Ok(Some((strategy, shares, underlying)))
            }
        });

        let results = join_all(reads).await;
        let mut failures = 0usize;
        let mut positions = Vec::new();

        for result in results {
            let (strategy, shares, underlying) = match result {
                Ok(Some(row)) => row,
                Ok(None) => continue,
                Err(e) => {
                    failures += 1;
                    debug!(chain = %chain, error = %e, "eigenlayer strategy row skipped");
                    continue;
                }
            };

            let amount = format_units(underlying, 18);
            let quote = self
                .prices
                .resolve(chain, strategy.underlying_symbol, strategy.underlying_address)
                .await;
            let value = amount * quote.price_usd;

            positions.push(Position {
                id: Position::derive_id(
                    PROTOCOL_ID,
                    chain,
                    strategy.underlying_symbol,
                    PositionType::Restake,
                ),
                protocol: self.protocol(),
                chain,
                position_type: PositionType::Restake,
                tokens: vec![TokenBalance {
                    address: strategy.underlying_address.to_string(),
                    symbol: strategy.underlying_symbol.to_string(),
                    decimals: 18,
                    raw_balance: underlying.to_string(),
                    balance: amount,
                    price_usd: quote.price_usd,
                    value_usd: value,
                }],
                value_usd: value,
                apy: Some(strategy.apy),
                apr: None,
                health_factor: None,
                metadata: Some(serde_json::json!({
                    "strategy": strategy.address,
                    "shares": shares.to_string(),
                })),
            });
        }

        if positions.is_empty() && failures == STRATEGIES.len() {
            return Err(VantageError::Protocol {
                protocol: PROTOCOL_ID.into(),
                message: "every strategy read failed".into(),
            });
        }

        Ok(positions)
    }

    async fn get_yield_rates(
        &self,
        _client: &ChainClient,
        chain: ChainId,
    ) -> VantageResult<Vec<YieldRate>> {
        Ok(STRATEGIES
            .iter()
            .map(|strategy| YieldRate {
                protocol_id: PROTOCOL_ID.to_string(),
                protocol_name: "EigenLayer".to_string(),
                chain,
                symbol: strategy.underlying_symbol.to_string(),
                address: Some(strategy.underlying_address.to_string()),
                position_type: PositionType::Restake,
                apy: strategy.apy,
                apr: None,
            })
            .collect())
    }
}
