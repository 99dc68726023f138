//! Chain registry — per-network RPC endpoints, memoized clients, and
//! linear failover.
//!
//! `get_client` hands out a cached reader bound to the primary endpoint.
//! `with_failover` walks the endpoint list in declared order with a fresh
//! client per URL, so a sticky broken connection never survives into the
//! retry. Failover is linear, not backoff-based: the expectation is "this
//! endpoint is down", not "this endpoint is transiently slow".

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use tracing::warn;

use vantage_common::client::ChainClient;
use vantage_common::error::{VantageError, VantageResult};
use vantage_common::types::ChainId;

/// Default RPC endpoints, primary first.
const ETHEREUM_RPC: &[&str] = &[
    "https://eth.llamarpc.com",
    "https://rpc.ankr.com/eth",
    "https://cloudflare-eth.com",
];
const ARBITRUM_RPC: &[&str] = &[
    "https://arb1.arbitrum.io/rpc",
    "https://rpc.ankr.com/arbitrum",
];
const BASE_RPC: &[&str] = &[
    "https://mainnet.base.org",
    "https://base.llamarpc.com",
];
const SOLANA_RPC: &[&str] = &[
    "https://api.mainnet-beta.solana.com",
    "https://solana-rpc.publicnode.com",
];

/// Immutable per-chain configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    pub id: ChainId,
    pub name: String,
    /// Ordered RPC URLs; index 0 is the primary.
    pub rpc_urls: Vec<String>,
    pub native_symbol: String,
    pub native_decimals: u8,
}

impl ChainSpec {
    fn builtin(id: ChainId) -> Self {
        let (name, urls, symbol, decimals) = match id {
            ChainId::Ethereum => ("Ethereum", ETHEREUM_RPC, "ETH", 18),
            ChainId::Arbitrum => ("Arbitrum", ARBITRUM_RPC, "ETH", 18),
            ChainId::Base => ("Base", BASE_RPC, "ETH", 18),
            ChainId::Solana => ("Solana", SOLANA_RPC, "SOL", 9),
        };
        Self {
            id,
            name: name.to_string(),
            rpc_urls: urls.iter().map(|s| s.to_string()).collect(),
            native_symbol: symbol.to_string(),
            native_decimals: decimals,
        }
    }
}

/// Holds every supported chain's spec plus a memoized primary client per
/// chain. Constructed once at startup and injected wherever chain access
/// is needed.
pub struct ChainRegistry {
    specs: HashMap<ChainId, ChainSpec>,
    clients: RwLock<HashMap<ChainId, ChainClient>>,
}

impl ChainRegistry {
    pub fn new(specs: Vec<ChainSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.id, s)).collect(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registry over all built-in chains, with optional per-chain RPC
    /// overrides (from config) replacing the default endpoint lists.
    pub fn with_defaults(rpc_overrides: &HashMap<ChainId, Vec<String>>) -> Self {
        let specs = ChainId::all()
            .iter()
            .map(|&id| {
                let mut spec = ChainSpec::builtin(id);
                if let Some(urls) = rpc_overrides.get(&id) {
                    if !urls.is_empty() {
                        spec.rpc_urls = urls.clone();
                    }
                }
                spec
            })
            .collect();
        Self::new(specs)
    }

    /// All registered chain ids, in declaration order.
    pub fn chains(&self) -> Vec<ChainId> {
        ChainId::all()
            .iter()
            .copied()
            .filter(|id| self.specs.contains_key(id))
            .collect()
    }

    pub fn get_spec(&self, chain: ChainId) -> VantageResult<&ChainSpec> {
        self.specs
            .get(&chain)
            .ok_or_else(|| VantageError::UnsupportedChain(chain.to_string()))
    }

    /// A cached reader bound to the chain's primary RPC URL. Construction
    /// is memoized; the client itself is cheap to clone.
    pub fn get_client(&self, chain: ChainId) -> VantageResult<ChainClient> {
        if let Some(client) = self.clients.read().expect("client cache poisoned").get(&chain) {
            return Ok(client.clone());
        }

        let spec = self.get_spec(chain)?;
        let primary = spec
            .rpc_urls
            .first()
            .ok_or_else(|| VantageError::Config(format!("no RPC URLs for {chain}")))?;
        let client = ChainClient::connect(chain.family(), primary)?;

        self.clients
            .write()
            .expect("client cache poisoned")
            .insert(chain, client.clone());
        Ok(client)
    }

    /// Run `operation` against each of the chain's RPC URLs in declared
    /// order, returning the first success. Intermediate errors are logged
    /// and swallowed; on exhaustion the last error is surfaced. Every
    /// attempt gets a freshly constructed client — no URL is tried twice.
    pub async fn with_failover<T, F, Fut>(&self, chain: ChainId, operation: F) -> VantageResult<T>
    where
        F: Fn(ChainClient) -> Fut,
        Fut: Future<Output = VantageResult<T>>,
    {
        let spec = self.get_spec(chain)?;
        let mut last_err =
            VantageError::Config(format!("no RPC URLs configured for {chain}"));

        for url in &spec.rpc_urls {
            let client = match ChainClient::connect(chain.family(), url) {
                Ok(client) => client,
                Err(e) => {
                    warn!(chain = %chain, url = %url, error = %e, "client construction failed");
                    last_err = e;
                    continue;
                }
            };
            match operation(client).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(chain = %chain, url = %url, error = %e, "RPC endpoint failed, trying next");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn two_endpoint_registry() -> ChainRegistry {
        ChainRegistry::new(vec![ChainSpec {
            id: ChainId::Ethereum,
            name: "Ethereum".into(),
            rpc_urls: vec![
                "http://127.0.0.1:9001".into(),
                "http://127.0.0.1:9002".into(),
            ],
            native_symbol: "ETH".into(),
            native_decimals: 18,
        }])
    }

    #[test]
    fn test_builtin_specs() {
        let registry = ChainRegistry::with_defaults(&HashMap::new());
        assert_eq!(registry.chains().len(), 4);
        let eth = registry.get_spec(ChainId::Ethereum).unwrap();
        assert_eq!(eth.native_symbol, "ETH");
        assert_eq!(eth.native_decimals, 18);
        assert!(!eth.rpc_urls.is_empty());
        let sol = registry.get_spec(ChainId::Solana).unwrap();
        assert_eq!(sol.native_decimals, 9);
    }

    #[test]
    fn test_rpc_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(ChainId::Base, vec!["http://127.0.0.1:8545".to_string()]);
        let registry = ChainRegistry::with_defaults(&overrides);
        let base = registry.get_spec(ChainId::Base).unwrap();
        assert_eq!(base.rpc_urls, vec!["http://127.0.0.1:8545".to_string()]);
        // other chains untouched
        let eth = registry.get_spec(ChainId::Ethereum).unwrap();
        assert!(eth.rpc_urls.len() > 1);
    }

    #[test]
    fn test_get_client_memoized() {
        let registry = two_endpoint_registry();
        assert!(registry.get_client(ChainId::Ethereum).is_ok());
        assert!(registry.get_client(ChainId::Ethereum).is_ok());
        assert_eq!(
            registry.clients.read().unwrap().len(),
            1,
            "repeated get_client must reuse the cached client"
        );
    }

    #[test]
    fn test_unknown_chain() {
        let registry = two_endpoint_registry();
        assert!(registry.get_spec(ChainId::Solana).is_err());
        assert!(registry.get_client(ChainId::Solana).is_err());
    }

    #[tokio::test]
    async fn test_failover_returns_secondary_result() {
        // Primary down, secondary healthy: the call must succeed without
        // surfacing the primary's error.
        let registry = two_endpoint_registry();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = registry
            .with_failover(ChainId::Ethereum, move |_client| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(VantageError::Network("primary unreachable".into()))
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failover_exhaustion_surfaces_last_error() {
        let registry = two_endpoint_registry();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: VantageResult<u64> = registry
            .with_failover(ChainId::Ethereum, move |_client| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Err(VantageError::Network(format!("endpoint {n} down"))) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("endpoint 1 down"), "got: {err}");
        // Linear: each URL tried exactly once.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failover_short_circuits_on_first_success() {
        let registry = two_endpoint_registry();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = registry
            .with_failover(ChainId::Ethereum, move |_client| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok("primary") }
            })
            .await;

        assert_eq!(result.unwrap(), "primary");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
