// ── Connectivity ──
pub mod chains;
pub mod tokens;

// ── Shared infrastructure ──
pub mod cache;
pub mod config;
pub mod ratelimit;

// ── Pipeline ──
pub mod aggregator;
pub mod analyzer;
pub mod balances;
pub mod price;
pub mod registry;

pub use aggregator::PortfolioAggregator;
pub use analyzer::YieldAnalyzer;
pub use chains::ChainRegistry;
pub use price::PriceService;
pub use registry::ProtocolRegistry;
