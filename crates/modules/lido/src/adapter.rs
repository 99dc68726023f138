//! Lido liquid-staking adapter (Ethereum).
//!
//! stETH rebases in place; wstETH wraps it at an on-chain exchange rate.
//! Both balances surface as stake positions. The protocol staking APR is
//! not readable on-chain and ships as a maintained estimate.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
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
use vantage_common::units::{format_units, wad_to_decimal};

use crate::contracts::{IStEth, IWstEth};

const PROTOCOL_ID: &str = "lido";

const STETH_ADDRESS: &str = "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84";
const WSTETH_ADDRESS: &str = "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0";

/// Maintained estimate of the Lido staking APR (fraction).
const STAKING_APR: Decimal = dec!(0.031);

const SUPPORTED: [ChainId; 1] = [ChainId::Ethereum];

pub struct LidoAdapter {
    prices: Arc<dyn PriceResolver>,
}

impl LidoAdapter {
    pub fn new(prices: Arc<dyn PriceResolver>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl ProtocolAdapter for LidoAdapter {
    fn protocol(&self) -> ProtocolInfo {
        ProtocolInfo {
            id: PROTOCOL_ID.to_string(),
            name: "Lido".to_string(),
            category: ProtocolCategory::LiquidStaking,
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
            let owner = address.evm()?;
            let steth_addr: Address = STETH_ADDRESS.parse().expect("invalid stETH address");
            let wsteth_addr: Address = WSTETH_ADDRESS.parse().expect("invalid wstETH address");

            let steth = IStEth::new(steth_addr, provider.clone())
                .balanceOf(owner)
                .call()
                .await
                .map_err(|e| VantageError::Network(e.to_string()))?;
            if !steth.is_zero() {
                return Ok::<_, VantageError>(true);
            }
            let wsteth = IWstEth::new(wsteth_addr, provider.clone())
                .balanceOf(owner)
                .call()
                .await
                .map_err(|e| VantageError::Network(e.to_string()))?;
            Ok(!wsteth.is_zero())
        };

        match probe.await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(chain = %chain, error = %e, "lido probe failed, treating as no position");
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
        let owner = address.evm()?;
        let steth_addr: Address = STETH_ADDRESS.parse().expect("invalid stETH address");
        let wsteth_addr: Address = WSTETH_ADDRESS.parse().expect("invalid wstETH address");

        let steth_contract = IStEth::new(steth_addr, provider.clone());
        let wsteth_contract = IWstEth::new(wsteth_addr, provider.clone());

        let steth_raw = steth_contract.balanceOf(owner).call().await;
        let wsteth_raw = wsteth_contract.balanceOf(owner).call().await;

        // Both legs unreadable is a total failure; one bad leg is partial.
        if steth_raw.is_err() && wsteth_raw.is_err() {
            return Err(VantageError::Protocol {
                protocol: PROTOCOL_ID.into(),
                message: "balance reads failed".into(),
            });
        }

        let mut positions = Vec::new();

        match steth_raw {
            Ok(raw) if !raw.is_zero() => {
                let amount = format_units(raw, 18);
                let quote = self.prices.resolve(chain, "stETH", STETH_ADDRESS).await;
                let value = amount * quote.price_usd;
                positions.push(Position {
                    id: Position::derive_id(PROTOCOL_ID, chain, "stETH", PositionType::Stake),
                    protocol: self.protocol(),
                    chain,
                    position_type: PositionType::Stake,
                    tokens: vec![TokenBalance {
                        address: STETH_ADDRESS.to_string(),
                        symbol: "stETH".to_string(),
                        decimals: 18,
                        raw_balance: raw.to_string(),
                        balance: amount,
                        price_usd: quote.price_usd,
                        value_usd: value,
                    }],
                    value_usd: value,
                    apy: None,
                    apr: Some(STAKING_APR),
                    health_factor: None,
                    metadata: None,
                });
            }
            Ok(_) => {}
            Err(e) => debug!(chain = %chain, error = %e, "stETH balance read skipped"),
        }

        match wsteth_raw {
            Ok(raw) if !raw.is_zero() => {
                let amount = format_units(raw, 18);
                // Value through the on-chain redemption rate rather than
                // the derivative premium heuristic.
                let rate = match wsteth_contract.stEthPerToken().call().await {
                    Ok(rate) => wad_to_decimal(rate),
                    Err(e) => {
                        debug!(chain = %chain, error = %e, "stEthPerToken read failed, assuming 1:1");
                        Decimal::ONE
                    }
                };
                let quote = self.prices.resolve(chain, "stETH", STETH_ADDRESS).await;
                let effective_price = quote.price_usd * rate;
                let value = amount * effective_price;
                positions.push(Position {
                    id: Position::derive_id(PROTOCOL_ID, chain, "wstETH", PositionType::Stake),
                    protocol: self.protocol(),
                    chain,
                    position_type: PositionType::Stake,
                    tokens: vec![TokenBalance {
                        address: WSTETH_ADDRESS.to_string(),
                        symbol: "wstETH".to_string(),
                        decimals: 18,
                        raw_balance: raw.to_string(),
                        balance: amount,
                        price_usd: effective_price,
                        value_usd: value,
                    }],
                    value_usd: value,
                    apy: None,
                    apr: Some(STAKING_APR),
                    health_factor: None,
                    metadata: Some(serde_json::json!({
                        "wrapped": true,
                        "steth_per_token": rate.to_string(),
                    })),
                });
            }
            Ok(_) => {}
            Err(e) => debug!(chain = %chain, error = %e, "wstETH balance read skipped"),
        }

        Ok(positions)
    }

    async fn get_yield_rates(
        &self,
        _client: &ChainClient,
        chain: ChainId,
    ) -> VantageResult<Vec<YieldRate>> {
        Ok(vec![YieldRate {
            protocol_id: PROTOCOL_ID.to_string(),
            protocol_name: "Lido".to_string(),
            chain,
            symbol: "ETH".to_string(),
            address: Some(STETH_ADDRESS.to_string()),
            position_type: PositionType::Stake,
            apy: STAKING_APR,
            apr: Some(STAKING_APR),
        }])
    }
}
