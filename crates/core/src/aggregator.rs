//! Portfolio aggregator — the top-level fan-out orchestrator.
//!
//! Per requested address and chain set: every chain runs as an
//! independent branch (wallet balances alongside the adapter
//! existence-probe phase, then full reads for adapters that probed
//! positive). A branch reports its outcome explicitly; one failing chain
//! or adapter never discards what sibling branches produced. Failures
//! degrade coverage, not correctness: when every branch fails the caller
//! still gets a well-formed, empty-valued portfolio.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::warn;

use vantage_common::error::{VantageError, VantageResult};
use vantage_common::types::{
    ChainId, Portfolio, Position, PositionGroup, TokenBalance, WalletAddress, WalletBalances,
};

use crate::balances::BalanceFetcher;
use crate::cache::TtlCache;
use crate::chains::ChainRegistry;
use crate::registry::ProtocolRegistry;

/// How a single chain branch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    /// Every sub-fetch succeeded.
    Complete,
    /// Some sub-fetches failed; the rest were kept.
    Partial,
    /// Nothing was obtained.
    Failed,
}

/// Per-branch result surfaced to the aggregator (and to tests), rather
/// than swallowed inside adapters.
#[derive(Debug, Clone)]
pub struct ChainFetch {
    pub chain: ChainId,
    pub balances: Vec<TokenBalance>,
    pub positions: Vec<Position>,
    pub errors: Vec<String>,
    pub outcome: BranchOutcome,
}

pub struct PortfolioAggregator {
    chains: Arc<ChainRegistry>,
    protocols: Arc<ProtocolRegistry>,
    balances: Arc<BalanceFetcher>,
    snapshots: TtlCache<String, Portfolio>,
    request_timeout: Duration,
}

impl PortfolioAggregator {
    pub fn new(
        chains: Arc<ChainRegistry>,
        protocols: Arc<ProtocolRegistry>,
        balances: Arc<BalanceFetcher>,
        snapshot_ttl: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            chains,
            protocols,
            balances,
            snapshots: TtlCache::new(snapshot_ttl),
            request_timeout,
        }
    }

    /// Assemble the portfolio for `address` over the requested chains
    /// (default: all supported).
    pub async fn get_portfolio(
        &self,
        address: &str,
        chain_filter: Option<Vec<ChainId>>,
    ) -> VantageResult<Portfolio> {
        self.get_portfolio_with_report(address, chain_filter)
            .await
            .map(|(portfolio, _)| portfolio)
    }

    /// Same as [`get_portfolio`], also returning the per-branch reports.
    /// A snapshot-cache hit returns an empty report list.
    ///
    /// [`get_portfolio`]: PortfolioAggregator::get_portfolio
    pub async fn get_portfolio_with_report(
        &self,
        address: &str,
        chain_filter: Option<Vec<ChainId>>,
    ) -> VantageResult<(Portfolio, Vec<ChainFetch>)> {
        // Input validation happens before any remote call.
        let wallet = WalletAddress::parse(address)?;

        let mut requested = chain_filter.unwrap_or_else(|| self.chains.chains());
        dedup_in_order(&mut requested);
        if requested.is_empty() {
            return Err(VantageError::UnsupportedChain("empty chain set".into()));
        }

        let cache_key = snapshot_key(&wallet, &requested);
        if let Some(snapshot) = self.snapshots.get(&cache_key) {
            return Ok((snapshot, Vec::new()));
        }

        let branches = requested.iter().map(|&chain| self.fetch_chain(&wallet, chain));
        let fetches = tokio::time::timeout(self.request_timeout, join_all(branches))
            .await
            // Partial results are discarded on timeout rather than
            // returned half-built.
            .map_err(|_| VantageError::Network("portfolio request timed out".into()))?;

        for fetch in &fetches {
            if fetch.outcome != BranchOutcome::Complete {
                warn!(
                    chain = %fetch.chain,
                    outcome = ?fetch.outcome,
                    errors = fetch.errors.len(),
                    "chain branch degraded"
                );
            }
        }

        let portfolio = assemble_portfolio(wallet.as_str(), &requested, &fetches);
        self.snapshots.insert(cache_key, portfolio.clone());
        Ok((portfolio, fetches))
    }

    /// One chain branch: balances and existence probes run concurrently;
    /// the probe phase fully completes before any full read begins, so
    /// pruning can depend on probe results.
    async fn fetch_chain(&self, address: &WalletAddress, chain: ChainId) -> ChainFetch {
        let mut errors = Vec::new();

        let client = match self.chains.get_client(chain) {
            Ok(client) => client,
            Err(e) => {
                return ChainFetch {
                    chain,
                    balances: Vec::new(),
                    positions: Vec::new(),
                    errors: vec![e.to_string()],
                    outcome: BranchOutcome::Failed,
                }
            }
        };

        let adapters = self.protocols.adapters_for_chain(chain);

        let balances_fut = self.balances.fetch_chain(address, chain);
        let probes_fut = join_all(
            adapters
                .iter()
                .map(|a| a.has_positions(&client, address, chain)),
        );
        let (balances_result, probe_hits) = tokio::join!(balances_fut, probes_fut);

        let balances = match balances_result {
            Ok(balances) => balances,
            Err(e) => {
                errors.push(format!("balances: {e}"));
                Vec::new()
            }
        };

        // Cost pruning: pay the full-read price only where the probe hit.
        let active: Vec<_> = adapters
            .iter()
            .zip(probe_hits)
            .filter(|(_, hit)| *hit)
            .map(|(adapter, _)| adapter.clone())
            .collect();

        let mut positions = Vec::new();
        let reads = join_all(
            active
                .iter()
                .map(|a| a.get_positions(&client, address, chain)),
        )
        .await;
        for (adapter, result) in active.iter().zip(reads) {
            match result {
                Ok(found) => positions.extend(found),
                Err(e) => {
                    let id = adapter.protocol().id;
                    warn!(chain = %chain, protocol = %id, error = %e, "adapter read failed");
                    errors.push(format!("{id}: {e}"));
                }
            }
        }

        let outcome = if errors.is_empty() {
            BranchOutcome::Complete
        } else if balances.is_empty() && positions.is_empty() {
            BranchOutcome::Failed
        } else {
            BranchOutcome::Partial
        };

        ChainFetch {
            chain,
            balances,
            positions,
            errors,
            outcome,
        }
    }
}

fn dedup_in_order(chains: &mut Vec<ChainId>) {
    let mut seen = Vec::new();
    chains.retain(|c| {
        if seen.contains(c) {
            false
        } else {
            seen.push(*c);
            true
        }
    });
}

fn snapshot_key(address: &WalletAddress, chains: &[ChainId]) -> String {
    let chains = chains
        .iter()
        .map(ChainId::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{address}|{chains}")
}

/// Build the immutable portfolio read model from branch results.
///
/// Grouping invariant: `by_chain` contains an entry for every requested
/// chain, zero-valued when its branch produced nothing.
pub fn assemble_portfolio(
    address: &str,
    requested: &[ChainId],
    fetches: &[ChainFetch],
) -> Portfolio {
    let mut wallet = WalletBalances::default();
    let mut positions: Vec<Position> = Vec::new();

    for &chain in requested {
        wallet.by_chain.entry(chain).or_default();
    }
    for fetch in fetches {
        wallet.total_value_usd += fetch
            .balances
            .iter()
            .map(|b| b.value_usd)
            .sum::<Decimal>();
        wallet
            .by_chain
            .insert(fetch.chain, fetch.balances.clone());
        positions.extend(fetch.positions.iter().cloned());
    }

    let mut by_chain: HashMap<ChainId, PositionGroup> = requested
        .iter()
        .map(|&chain| (chain, PositionGroup::default()))
        .collect();
    let mut by_protocol: HashMap<String, PositionGroup> = HashMap::new();
    let mut by_type = HashMap::new();

    for position in &positions {
        let chain_group = by_chain.entry(position.chain).or_default();
        chain_group.total_value_usd += position.value_usd;
        chain_group.positions.push(position.clone());

        let protocol_group = by_protocol.entry(position.protocol.id.clone()).or_default();
        protocol_group.total_value_usd += position.value_usd;
        protocol_group.positions.push(position.clone());

        let type_group: &mut PositionGroup =
            by_type.entry(position.position_type).or_default();
        type_group.total_value_usd += position.value_usd;
        type_group.positions.push(position.clone());
    }

    let positions_total: Decimal = positions.iter().map(|p| p.value_usd).sum();

    Portfolio {
        address: address.to_string(),
        total_value_usd: positions_total + wallet.total_value_usd,
        positions,
        by_chain,
        by_protocol,
        by_type,
        wallet,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use vantage_common::client::ChainClient;
    use vantage_common::traits::ProtocolAdapter;
    use vantage_common::types::{PositionType, ProtocolCategory, ProtocolInfo};

    use crate::price::PriceService;
    use crate::ratelimit::TokenBucket;
    use crate::tokens::TokenCatalog;

    const EVM_ADDR: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    fn offline_chains() -> Arc<ChainRegistry> {
        let mut overrides = HashMap::new();
        for &chain in ChainId::all() {
            overrides.insert(chain, vec!["http://127.0.0.1:9".to_string()]);
        }
        Arc::new(ChainRegistry::with_defaults(&overrides))
    }

    fn protocol_info(id: &str) -> ProtocolInfo {
        ProtocolInfo {
            id: id.to_string(),
            name: id.to_string(),
            category: ProtocolCategory::Lending,
            earns_yield: true,
        }
    }

    fn make_position(protocol_id: &str, chain: ChainId, value: Decimal) -> Position {
        Position {
            id: Position::derive_id(protocol_id, chain, "USDC", PositionType::Supply),
            protocol: protocol_info(protocol_id),
            chain,
            position_type: PositionType::Supply,
            tokens: vec![],
            value_usd: value,
            apy: Some(dec!(0.03)),
            apr: None,
            health_factor: None,
            metadata: None,
        }
    }

    /// Scripted adapter for fan-out tests.
    struct MockAdapter {
        info: ProtocolInfo,
        chains: Vec<ChainId>,
        probe: bool,
        positions: VantageResult<Vec<Position>>,
        read_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockAdapter {
        fn new(id: &str, chain: ChainId, probe: bool, positions: VantageResult<Vec<Position>>) -> Self {
            Self {
                info: protocol_info(id),
                chains: vec![chain],
                probe,
                positions,
                read_calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl ProtocolAdapter for MockAdapter {
        fn protocol(&self) -> ProtocolInfo {
            self.info.clone()
        }

        fn supported_chains(&self) -> &[ChainId] {
            &self.chains
        }

        async fn has_positions(
            &self,
            _client: &ChainClient,
            _address: &WalletAddress,
            _chain: ChainId,
        ) -> bool {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.probe
        }

        async fn get_positions(
            &self,
            _client: &ChainClient,
            _address: &WalletAddress,
            _chain: ChainId,
        ) -> VantageResult<Vec<Position>> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            match &self.positions {
                Ok(positions) => Ok(positions.clone()),
                Err(e) => Err(VantageError::Other(e.to_string())),
            }
        }

        async fn get_yield_rates(
            &self,
            _client: &ChainClient,
            _chain: ChainId,
        ) -> VantageResult<Vec<vantage_common::types::YieldRate>> {
            Ok(vec![])
        }
    }

    fn aggregator_with(adapters: Vec<Arc<dyn ProtocolAdapter>>) -> PortfolioAggregator {
        let chains = offline_chains();
        let prices = Arc::new(PriceService::new(
            chains.clone(),
            Duration::from_secs(300),
            TokenBucket::new(100.0, 100.0),
        ));
        let balances = Arc::new(BalanceFetcher::new(
            chains.clone(),
            Arc::new(TokenCatalog::builtin()),
            prices,
        ));
        let mut registry = ProtocolRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        PortfolioAggregator::new(
            chains,
            Arc::new(registry),
            balances,
            Duration::from_secs(120),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_fetch() {
        let aggregator = aggregator_with(vec![]);
        let err = aggregator.get_portfolio("0x1234", None).await.unwrap_err();
        assert!(matches!(err, VantageError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_total_failure_still_yields_empty_portfolio() {
        // No adapters, every RPC endpoint closed: all branches fail, yet
        // the caller gets a well-formed empty portfolio.
        let aggregator = aggregator_with(vec![]);
        let requested = vec![ChainId::Ethereum, ChainId::Base];
        let (portfolio, fetches) = aggregator
            .get_portfolio_with_report(EVM_ADDR, Some(requested.clone()))
            .await
            .unwrap();

        assert_eq!(portfolio.total_value_usd, dec!(0));
        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.by_chain.len(), 2);
        for chain in requested {
            assert_eq!(portfolio.by_chain[&chain].total_value_usd, dec!(0));
        }
        assert!(fetches.iter().all(|f| f.outcome == BranchOutcome::Failed));
    }

    #[tokio::test]
    async fn test_positions_survive_balance_failure() {
        let position = make_position("aave-v3", ChainId::Ethereum, dec!(1000));
        let adapter = Arc::new(MockAdapter::new(
            "aave-v3",
            ChainId::Ethereum,
            true,
            Ok(vec![position]),
        ));
        let aggregator = aggregator_with(vec![adapter]);

        let (portfolio, fetches) = aggregator
            .get_portfolio_with_report(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap();

        assert_eq!(portfolio.positions.len(), 1);
        assert_eq!(portfolio.total_value_usd, dec!(1000));
        // Balance fetch failed (endpoints closed) but positions were kept.
        assert_eq!(fetches[0].outcome, BranchOutcome::Partial);
        assert!(!fetches[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_probe_false_skips_full_read() {
        let adapter = Arc::new(MockAdapter::new(
            "aave-v3",
            ChainId::Ethereum,
            false,
            Ok(vec![make_position("aave-v3", ChainId::Ethereum, dec!(1000))]),
        ));
        let aggregator = aggregator_with(vec![adapter.clone()]);

        let portfolio = aggregator
            .get_portfolio(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap();

        assert!(portfolio.positions.is_empty());
        assert_eq!(adapter.read_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_adapter_isolated_from_siblings() {
        let good = Arc::new(MockAdapter::new(
            "aave-v3",
            ChainId::Ethereum,
            true,
            Ok(vec![make_position("aave-v3", ChainId::Ethereum, dec!(1000))]),
        ));
        let bad = Arc::new(MockAdapter::new(
            "eigenlayer",
            ChainId::Ethereum,
            true,
            Err(VantageError::Network("decoder blew up".into())),
        ));
        let aggregator = aggregator_with(vec![good, bad]);

        let (portfolio, fetches) = aggregator
            .get_portfolio_with_report(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap();

        assert_eq!(portfolio.positions.len(), 1);
        assert_eq!(portfolio.positions[0].protocol.id, "aave-v3");
        assert!(fetches[0]
            .errors
            .iter()
            .any(|e| e.contains("eigenlayer")));
    }

    #[tokio::test]
    async fn test_request_timeout_discards_partials() {
        let mut slow = MockAdapter::new(
            "aave-v3",
            ChainId::Ethereum,
            true,
            Ok(vec![make_position("aave-v3", ChainId::Ethereum, dec!(1000))]),
        );
        slow.delay = Some(Duration::from_secs(30));
        let chains = offline_chains();
        let prices = Arc::new(PriceService::new(
            chains.clone(),
            Duration::from_secs(300),
            TokenBucket::new(100.0, 100.0),
        ));
        let balances = Arc::new(BalanceFetcher::new(
            chains.clone(),
            Arc::new(TokenCatalog::builtin()),
            prices,
        ));
        let mut registry = ProtocolRegistry::new();
        registry.register(Arc::new(slow));
        let aggregator = PortfolioAggregator::new(
            chains,
            Arc::new(registry),
            balances,
            Duration::from_secs(120),
            Duration::from_millis(50),
        );

        let err = aggregator
            .get_portfolio(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap_err();
        assert!(matches!(err, VantageError::Network(_)));
    }

    #[tokio::test]
    async fn test_snapshot_cache_serves_second_call() {
        let adapter = Arc::new(MockAdapter::new(
            "aave-v3",
            ChainId::Ethereum,
            true,
            Ok(vec![make_position("aave-v3", ChainId::Ethereum, dec!(1000))]),
        ));
        let aggregator = aggregator_with(vec![adapter.clone()]);

        let first = aggregator
            .get_portfolio(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap();
        let second = aggregator
            .get_portfolio(EVM_ADDR, Some(vec![ChainId::Ethereum]))
            .await
            .unwrap();

        // Identical timestamp proves the snapshot was served, not rebuilt.
        assert_eq!(first.fetched_at, second.fetched_at);
        assert_eq!(adapter.read_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_assemble_grouping_invariant() {
        let requested = vec![ChainId::Ethereum, ChainId::Arbitrum, ChainId::Base];
        let fetches = vec![
            ChainFetch {
                chain: ChainId::Ethereum,
                balances: vec![],
                positions: vec![
                    make_position("aave-v3", ChainId::Ethereum, dec!(600)),
                    make_position("lido", ChainId::Ethereum, dec!(400)),
                ],
                errors: vec![],
                outcome: BranchOutcome::Complete,
            },
            ChainFetch {
                chain: ChainId::Arbitrum,
                balances: vec![],
                positions: vec![],
                errors: vec![],
                outcome: BranchOutcome::Complete,
            },
            ChainFetch {
                chain: ChainId::Base,
                balances: vec![],
                positions: vec![],
                errors: vec!["balances: rpc down".into()],
                outcome: BranchOutcome::Failed,
            },
        ];

        let portfolio = assemble_portfolio("0xabc", &requested, &fetches);

        // Exactly the requested keys, zero-valued when empty.
        assert_eq!(portfolio.by_chain.len(), 3);
        assert_eq!(
            portfolio.by_chain[&ChainId::Ethereum].total_value_usd,
            dec!(1000)
        );
        assert_eq!(portfolio.by_chain[&ChainId::Arbitrum].total_value_usd, dec!(0));
        assert_eq!(portfolio.by_chain[&ChainId::Base].total_value_usd, dec!(0));

        assert_eq!(portfolio.total_value_usd, dec!(1000));
        assert_eq!(portfolio.by_protocol.len(), 2);
        assert_eq!(portfolio.by_protocol["aave-v3"].total_value_usd, dec!(600));
        assert_eq!(
            portfolio.by_type[&PositionType::Supply].positions.len(),
            2
        );
    }

    #[test]
    fn test_assemble_plain_wallet_no_positions() {
        // 1.0 of an oracle-priced major at $2500 plus 10,000 of a
        // 6-decimal stablecoin: $12,500 total, two balance rows, zero
        // positions.
        let fetches = vec![ChainFetch {
            chain: ChainId::Ethereum,
            balances: vec![
                TokenBalance {
                    address: "native".into(),
                    symbol: "ETH".into(),
                    decimals: 18,
                    raw_balance: "1000000000000000000".into(),
                    balance: dec!(1),
                    price_usd: dec!(2500),
                    value_usd: dec!(2500),
                },
                TokenBalance {
                    address: "0xusdc".into(),
                    symbol: "USDC".into(),
                    decimals: 6,
                    raw_balance: "10000000000".into(),
                    balance: dec!(10000),
                    price_usd: dec!(1),
                    value_usd: dec!(10000),
                },
            ],
            positions: vec![],
            errors: vec![],
            outcome: BranchOutcome::Complete,
        }];

        let portfolio = assemble_portfolio("0xabc", &[ChainId::Ethereum], &fetches);
        assert_eq!(portfolio.total_value_usd, dec!(12500));
        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.wallet.by_chain[&ChainId::Ethereum].len(), 2);
    }

    #[test]
    fn test_assemble_total_includes_wallet_values() {
        let balance = TokenBalance {
            address: "native".into(),
            symbol: "ETH".into(),
            decimals: 18,
            raw_balance: "1000000000000000000".into(),
            balance: dec!(1),
            price_usd: dec!(2500),
            value_usd: dec!(2500),
        };
        let fetches = vec![ChainFetch {
            chain: ChainId::Ethereum,
            balances: vec![balance],
            positions: vec![make_position("aave-v3", ChainId::Ethereum, dec!(500))],
            errors: vec![],
            outcome: BranchOutcome::Complete,
        }];

        let portfolio = assemble_portfolio("0xabc", &[ChainId::Ethereum], &fetches);
        assert_eq!(portfolio.total_value_usd, dec!(3000));
        assert_eq!(portfolio.wallet.total_value_usd, dec!(2500));
        // Position grouping excludes wallet values.
        assert_eq!(
            portfolio.by_chain[&ChainId::Ethereum].total_value_usd,
            dec!(500)
        );
    }
}
