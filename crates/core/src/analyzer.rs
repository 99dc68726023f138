//! Yield opportunity analyzer.
//!
//! Two independent scans over (portfolio positions, all adapters' rate
//! lists): better-rate alternatives for yield-bearing positions, and
//! "you could be earning" suggestions for idle holdings. Asset
//! equivalence uses the same classes as price resolution. Risk tiers are
//! a hand-curated maturity classification, not a risk model.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::warn;

use vantage_common::assets;
use vantage_common::types::{
    ChainId, IdleAsset, Portfolio, PositionType, YieldAlternative, YieldAnalysis,
    YieldOpportunity, YieldRate,
};

use crate::chains::ChainRegistry;
use crate::registry::ProtocolRegistry;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Positions/balances below this USD value are not scanned.
    pub min_position_value_usd: Decimal,
    /// An alternative must beat the current APY by more than this.
    pub min_apy_improvement: Decimal,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_position_value_usd: Decimal::from(100),
            min_apy_improvement: Decimal::new(5, 3), // 0.005
        }
    }
}

pub struct YieldAnalyzer {
    chains: Arc<ChainRegistry>,
    protocols: Arc<ProtocolRegistry>,
    config: AnalyzerConfig,
}

impl YieldAnalyzer {
    pub fn new(
        chains: Arc<ChainRegistry>,
        protocols: Arc<ProtocolRegistry>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            chains,
            protocols,
            config,
        }
    }

    /// Scrape rates fresh and analyze the portfolio against them.
    pub async fn analyze(&self, portfolio: &Portfolio) -> YieldAnalysis {
        let rates = self.collect_rates().await;
        self.analyze_with_rates(portfolio, &rates)
    }

    /// Protocol-wide rates from every registered adapter on every chain
    /// it supports, gathered concurrently. Failures degrade coverage.
    /// Rates are never cached across analyses.
    pub async fn collect_rates(&self) -> Vec<YieldRate> {
        let mut tasks = Vec::new();
        for adapter in self.protocols.all() {
            for &chain in adapter.supported_chains() {
                let client = match self.chains.get_client(chain) {
                    Ok(client) => client,
                    Err(e) => {
                        warn!(chain = %chain, error = %e, "no client for rate scan");
                        continue;
                    }
                };
                let adapter = adapter.clone();
                tasks.push(async move {
                    match adapter.get_yield_rates(&client, chain).await {
                        Ok(rates) => rates,
                        Err(e) => {
                            warn!(
                                protocol = %adapter.protocol().id,
                                chain = %chain,
                                error = %e,
                                "rate scan failed"
                            );
                            Vec::new()
                        }
                    }
                });
            }
        }

        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Pure analysis over an already-gathered rate list.
    pub fn analyze_with_rates(&self, portfolio: &Portfolio, rates: &[YieldRate]) -> YieldAnalysis {
        let floor = self.config.min_position_value_usd;
        let threshold = self.config.min_apy_improvement;

        // ── Opportunity scan ────────────────────────────────────────
        let mut total_current = Decimal::ZERO;
        let mut opportunities = Vec::new();

        for position in &portfolio.positions {
            if !position.protocol.earns_yield || position.value_usd <= Decimal::ZERO {
                continue;
            }
            let current_apy = position.apy.or(position.apr).unwrap_or_default();
            total_current += current_apy * position.value_usd;

            if position.value_usd < floor {
                continue;
            }
            let Some(symbol) = position.primary_symbol() else {
                continue;
            };

            let mut alternatives: Vec<YieldAlternative> = rates
                .iter()
                .filter(|r| is_earning_rate(r))
                .filter(|r| {
                    !(r.protocol_id == position.protocol.id && r.chain == position.chain)
                })
                .filter(|r| assets::is_equivalent_asset(&r.symbol, symbol))
                .filter(|r| r.apy > current_apy + threshold)
                .map(|r| to_alternative(r, current_apy, position.value_usd))
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            sort_by_apy(&mut alternatives);

            let potential_gain_usd = alternatives[0].annual_gain_usd;
            opportunities.push(YieldOpportunity {
                position: position.clone(),
                current_apy,
                better_alternatives: alternatives,
                potential_gain_usd,
            });
        }

        opportunities.sort_by(|a, b| b.potential_gain_usd.cmp(&a.potential_gain_usd));

        // ── Idle-asset scan ─────────────────────────────────────────
        let mut idle_assets = Vec::new();

        for (&chain, tokens) in &portfolio.wallet.by_chain {
            for token in tokens {
                if token.value_usd < floor {
                    continue;
                }
                if let Some(idle) = idle_entry(chain, &token.symbol, token.value_usd, rates) {
                    idle_assets.push(idle);
                }
            }
        }
        for position in &portfolio.positions {
            if position.protocol.earns_yield || position.value_usd < floor {
                continue;
            }
            if let Some(symbol) = position.primary_symbol() {
                if let Some(idle) = idle_entry(position.chain, symbol, position.value_usd, rates)
                {
                    idle_assets.push(idle);
                }
            }
        }

        idle_assets.sort_by(|a, b| b.value_usd.cmp(&a.value_usd));

        let total_gain: Decimal = opportunities.iter().map(|o| o.potential_gain_usd).sum();

        YieldAnalysis {
            address: portfolio.address.clone(),
            total_current_yield_usd: total_current,
            total_potential_yield_usd: total_current + total_gain,
            opportunities,
            idle_assets,
            analyzed_at: Utc::now(),
        }
    }
}

/// Borrow rates are costs, never earning alternatives.
fn is_earning_rate(rate: &YieldRate) -> bool {
    matches!(
        rate.position_type,
        PositionType::Supply | PositionType::Stake | PositionType::Restake | PositionType::Liquidity
    )
}

fn to_alternative(rate: &YieldRate, current_apy: Decimal, value_usd: Decimal) -> YieldAlternative {
    let improvement = rate.apy - current_apy;
    YieldAlternative {
        protocol_id: rate.protocol_id.clone(),
        protocol_name: rate.protocol_name.clone(),
        chain: rate.chain,
        symbol: rate.symbol.clone(),
        apy: rate.apy,
        apy_improvement: improvement,
        annual_gain_usd: improvement * value_usd,
        risk: assets::protocol_risk_tier(&rate.protocol_id),
    }
}

fn sort_by_apy(alternatives: &mut [YieldAlternative]) {
    alternatives.sort_by(|a, b| {
        b.apy
            .cmp(&a.apy)
            .then_with(|| a.protocol_id.cmp(&b.protocol_id))
    });
}

/// Top-3 (by APY) equivalent-asset rates available anywhere.
fn idle_entry(
    chain: ChainId,
    symbol: &str,
    value_usd: Decimal,
    rates: &[YieldRate],
) -> Option<IdleAsset> {
    let mut suggestions: Vec<YieldAlternative> = rates
        .iter()
        .filter(|r| is_earning_rate(r))
        .filter(|r| assets::is_equivalent_asset(&r.symbol, symbol))
        .filter(|r| r.apy > Decimal::ZERO)
        .map(|r| to_alternative(r, Decimal::ZERO, value_usd))
        .collect();
    if suggestions.is_empty() {
        return None;
    }
    sort_by_apy(&mut suggestions);
    suggestions.truncate(3);

    Some(IdleAsset {
        chain,
        symbol: symbol.to_string(),
        value_usd,
        suggestions,
    })
}
