//! Construction point — wires config, registries, adapters, and services
//! into the running application. Everything is explicitly constructed and
//! injected; there are no lazy globals.

use std::sync::Arc;

use vantage_common::traits::PriceResolver;
use vantage_core::aggregator::PortfolioAggregator;
use vantage_core::analyzer::{AnalyzerConfig, YieldAnalyzer};
use vantage_core::balances::BalanceFetcher;
use vantage_core::chains::ChainRegistry;
use vantage_core::config::AppConfig;
use vantage_core::price::PriceService;
use vantage_core::ratelimit::TokenBucket;
use vantage_core::registry::ProtocolRegistry;
use vantage_core::tokens::TokenCatalog;

use vantage_mod_aave::AaveAdapter;
use vantage_mod_eigenlayer::EigenLayerAdapter;
use vantage_mod_lido::LidoAdapter;
use vantage_mod_uniswap::UniswapAdapter;

pub struct App {
    pub chains: Arc<ChainRegistry>,
    pub protocols: Arc<ProtocolRegistry>,
    pub aggregator: PortfolioAggregator,
    pub analyzer: YieldAnalyzer,
}

pub fn build() -> anyhow::Result<App> {
    let config = AppConfig::load()?;

    let chains = Arc::new(ChainRegistry::with_defaults(&config.rpc_overrides));

    let bucket = TokenBucket::new(
        config.price.bucket_capacity,
        config.price.bucket_refill_per_sec,
    );
    let prices = Arc::new(PriceService::new(
        chains.clone(),
        config.price.cache_ttl(),
        bucket,
    ));
    let resolver: Arc<dyn PriceResolver> = prices.clone();

    let mut registry = ProtocolRegistry::new();
    registry.register(Arc::new(AaveAdapter::new(resolver.clone())));
    registry.register(Arc::new(LidoAdapter::new(resolver.clone())));
    registry.register(Arc::new(EigenLayerAdapter::new(resolver.clone())));
    registry.register(Arc::new(UniswapAdapter::new(resolver)));
    let protocols = Arc::new(registry);

    let balances = Arc::new(BalanceFetcher::new(
        chains.clone(),
        Arc::new(TokenCatalog::builtin()),
        prices,
    ));

    let aggregator = PortfolioAggregator::new(
        chains.clone(),
        protocols.clone(),
        balances,
        config.portfolio.snapshot_ttl(),
        config.portfolio.request_timeout(),
    );

    let analyzer = YieldAnalyzer::new(
        chains.clone(),
        protocols.clone(),
        AnalyzerConfig {
            min_position_value_usd: config.analyzer.min_position_value_usd,
            min_apy_improvement: config.analyzer.min_apy_improvement,
        },
    );

    Ok(App {
        chains,
        protocols,
        aggregator,
        analyzer,
    })
}
