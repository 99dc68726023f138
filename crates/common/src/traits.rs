//! Protocol adapter contract — every module implements this.
//!
//! This is the contract between the aggregator and protocol modules. The
//! aggregator discovers heterogeneous on-chain positions through this one
//! polymorphic interface.

use async_trait::async_trait;

use crate::client::ChainClient;
use crate::error::VantageResult;
use crate::types::{ChainId, Position, PriceQuote, ProtocolInfo, WalletAddress, YieldRate};

/// USD price lookup, injected into adapters so positions can be valued
/// without adapters knowing how resolution is tiered or cached.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    async fn resolve(&self, chain: ChainId, symbol: &str, address: &str) -> PriceQuote;
}

/// Capability contract over lending, liquid-staking, restaking,
/// concentrated-liquidity, … protocols.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Protocol descriptor.
    fn protocol(&self) -> ProtocolInfo;

    /// Chains this adapter can read.
    fn supported_chains(&self) -> &[ChainId];

    /// Cheap existence probe, evaluated for every (address, chain, protocol)
    /// triple on every aggregation. Returns `false` (never errors) on any
    /// read failure — a failed probe means "no position", not "fatal".
    ///
    /// The default derives the probe from [`get_positions`], trading an
    /// extra full read for adapter simplicity. Adapters should override
    /// this with a one-call probe whenever one exists.
    ///
    /// [`get_positions`]: ProtocolAdapter::get_positions
    async fn has_positions(
        &self,
        client: &ChainClient,
        address: &WalletAddress,
        chain: ChainId,
    ) -> bool {
        match self.get_positions(client, address, chain).await {
            Ok(positions) => !positions.is_empty(),
            Err(e) => {
                tracing::debug!(
                    protocol = %self.protocol().id,
                    chain = %chain,
                    error = %e,
                    "existence probe failed, treating as no position"
                );
                false
            }
        }
    }

    /// Full position read. On partial internal failure, returns whatever
    /// positions decoded successfully (skipping bad rows); errors only on
    /// total failure, which the aggregator isolates to this branch.
    async fn get_positions(
        &self,
        client: &ChainClient,
        address: &WalletAddress,
        chain: ChainId,
    ) -> VantageResult<Vec<Position>>;

    /// Protocol-wide (not user-specific) rate discovery.
    async fn get_yield_rates(
        &self,
        client: &ChainClient,
        chain: ChainId,
    ) -> VantageResult<Vec<YieldRate>>;
}
