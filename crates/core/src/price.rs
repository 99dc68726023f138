//! Tiered price resolution with a time-boxed cache.
//!
//! Strategy order, short-circuiting on first success:
//! cache hit → on-chain oracle feed → stablecoin peg → correlated
//! derivative premium → unknown (price 0). A single oracle never covers
//! every asset on every chain, so the fallbacks run from most
//! trustworthy/freshest to least. Every resolution — synthetic and
//! unknown included — is written to the cache, so repeated lookups inside
//! the TTL window cost zero remote calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::sol;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use async_trait::async_trait;
use vantage_common::assets;
use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::traits::PriceResolver;
use vantage_common::types::{ChainId, PriceQuote, PriceSource};
use vantage_common::units::feed_price_to_decimal;

use crate::cache::TtlCache;
use crate::chains::ChainRegistry;
use crate::ratelimit::TokenBucket;

sol! {
    /// Chainlink-compatible price feed.
    #[sol(rpc)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );

        function decimals() external view returns (uint8);
    }
}

/// A registered price feed. Keyed by the (chain, symbol) being priced;
/// `host_chain` is where the feed contract itself is deployed, so assets
/// on chains without local feeds resolve through their canonical feed.
#[derive(Debug, Clone, Copy)]
struct FeedRef {
    host_chain: ChainId,
    address: Address,
}

fn builtin_feeds() -> HashMap<(ChainId, String), FeedRef> {
    let mut feeds = HashMap::new();
    let mut add = |chain: ChainId, symbol: &str, host: ChainId, addr: &str| {
        feeds.insert(
            (chain, symbol.to_string()),
            FeedRef {
                host_chain: host,
                address: addr.parse().expect("invalid feed address"),
            },
        );
    };

    add(ChainId::Ethereum, "ETH", ChainId::Ethereum, "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419");
    add(ChainId::Ethereum, "BTC", ChainId::Ethereum, "0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c");
    add(ChainId::Ethereum, "USDC", ChainId::Ethereum, "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6");
    add(ChainId::Ethereum, "SOL", ChainId::Ethereum, "0x4ffC43a60e009B551865A93d232E33Fce9f01507");

    add(ChainId::Arbitrum, "ETH", ChainId::Arbitrum, "0x639Fe6ab55C921f74e7fac1ee960C0B6293ba612");
    add(ChainId::Arbitrum, "BTC", ChainId::Arbitrum, "0x6ce185860a4963106506C203335A2910413708e9");
    add(ChainId::Arbitrum, "ARB", ChainId::Arbitrum, "0xb2A824043730FE05F3DA2efaFa1CBbe83fa548D6");

    add(ChainId::Base, "ETH", ChainId::Base, "0x71041dddad3595F9CEd3DcCFBe3D1F4b0a16Bb70");
    add(ChainId::Base, "CBETH", ChainId::Base, "0xd7818272B9e248357d13057AAb0B417aF31E817d");

    // SOL has no feed on its own chain; price through the Ethereum feed.
    add(ChainId::Solana, "SOL", ChainId::Ethereum, "0x4ffC43a60e009B551865A93d232E33Fce9f01507");

    feeds
}

/// Resolves USD prices for (chain, symbol, address) triples.
pub struct PriceService {
    chains: Arc<ChainRegistry>,
    cache: TtlCache<(ChainId, String), PriceQuote>,
    bucket: TokenBucket,
    feeds: HashMap<(ChainId, String), FeedRef>,
}

impl PriceService {
    pub fn new(chains: Arc<ChainRegistry>, cache_ttl: Duration, bucket: TokenBucket) -> Self {
        Self {
            chains,
            cache: TtlCache::new(cache_ttl),
            bucket,
            feeds: builtin_feeds(),
        }
    }

    /// Resolve a USD price. Never errors: price 0 with source `Unknown`
    /// is a legitimate terminal outcome — callers must treat it as
    /// "value unknown", not "value is zero".
    pub async fn resolve(&self, chain: ChainId, symbol: &str, address: &str) -> PriceQuote {
        let key = (chain, address.to_ascii_lowercase());

        // 1. Cache hit.
        if let Some(cached) = self.cache.get(&key) {
            return PriceQuote {
                price_usd: cached.price_usd,
                source: PriceSource::Cache,
            };
        }

        // 2. On-chain oracle feed.
        if let Some(price) = self.oracle_price(chain, symbol).await {
            return self.finish(key, price, PriceSource::Oracle);
        }

        // 3. Stablecoin peg.
        if let Some(peg) = assets::stablecoin_peg(symbol) {
            return self.finish(key, peg, PriceSource::Synthetic);
        }

        // 4. Correlated derivative: base price × fixed premium.
        if let Some((base, premium)) = assets::derivative_premium(symbol) {
            let mut base_price = self.oracle_price(chain, base).await;
            if base_price.is_none() && chain != ChainId::Ethereum {
                base_price = self.oracle_price(ChainId::Ethereum, base).await;
            }
            if let Some(base_price) = base_price {
                return self.finish(key, base_price * premium, PriceSource::Synthetic);
            }
        }

        // 5. Unknown — still cached, so known-unpriced tokens don't keep
        // costing remote calls.
        debug!(chain = %chain, symbol = %symbol, "no price source, marking unknown");
        self.finish(key, Decimal::ZERO, PriceSource::Unknown)
    }

    fn finish(&self, key: (ChainId, String), price: Decimal, source: PriceSource) -> PriceQuote {
        let quote = PriceQuote {
            price_usd: price,
            source,
        };
        self.cache.insert(key, quote);
        quote
    }

    /// Read the registered feed for (chain, symbol), if any. Remote reads
    /// are gated by the token bucket and run with endpoint failover.
    async fn oracle_price(&self, chain: ChainId, symbol: &str) -> Option<Decimal> {
        let feed = self.feeds.get(&(chain, symbol.to_ascii_uppercase()))?;

        self.bucket.acquire().await;
        let address = feed.address;
        let result = self
            .chains
            .with_failover(feed.host_chain, |client| async move {
                read_feed(&client, address).await
            })
            .await;

        match result {
            Ok(price) if price > Decimal::ZERO => Some(price),
            Ok(price) => {
                warn!(chain = %chain, symbol = %symbol, %price, "feed returned non-positive price");
                None
            }
            Err(e) => {
                warn!(chain = %chain, symbol = %symbol, error = %e, "oracle read failed");
                None
            }
        }
    }

    /// Pre-load a price, e.g. from a warm snapshot. Mostly a test hook.
    pub fn seed(&self, chain: ChainId, address: &str, price_usd: Decimal, source: PriceSource) {
        self.cache.insert(
            (chain, address.to_ascii_lowercase()),
            PriceQuote { price_usd, source },
        );
    }
}

#[async_trait]
impl PriceResolver for PriceService {
    async fn resolve(&self, chain: ChainId, symbol: &str, address: &str) -> PriceQuote {
        PriceService::resolve(self, chain, symbol, address).await
    }
}

/// Read a feed's latest answer normalized by its declared precision.
async fn read_feed(client: &ChainClient, feed_address: Address) -> VantageResult<Decimal> {
    let provider = client.evm()?;
    let feed = IAggregatorV3::new(feed_address, provider.clone());

    let round = feed
        .latestRoundData()
        .call()
        .await
        .map_err(|e| VantageError::Network(format!("latestRoundData: {e}")))?;
    let decimals = feed
        .decimals()
        .call()
        .await
        .map_err(|e| VantageError::Network(format!("feed decimals: {e}")))?;

    let answer = i128::try_from(round.answer)
        .map_err(|_| VantageError::Decode("feed answer out of range".into()))?;
    if answer <= 0 {
        return Err(VantageError::Decode("feed answer not positive".into()));
    }

    Ok(feed_price_to_decimal(answer, decimals))
}
