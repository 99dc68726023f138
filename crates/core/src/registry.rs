//! Protocol registry — pure chain→adapter lookup.
//!
//! Adapters are registered once at startup and held as trait objects; no
//! mutable state after construction.

use std::sync::Arc;

use tracing::info;

use vantage_common::traits::ProtocolAdapter;
use vantage_common::types::{ChainId, ProtocolInfo};

#[derive(Default)]
pub struct ProtocolRegistry {
    adapters: Vec<Arc<dyn ProtocolAdapter>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProtocolAdapter>) {
        info!(protocol = %adapter.protocol().id, "registered protocol adapter");
        self.adapters.push(adapter);
    }

    /// Adapters whose supported-chain set contains `chain`.
    pub fn adapters_for_chain(&self, chain: ChainId) -> Vec<Arc<dyn ProtocolAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.supported_chains().contains(&chain))
            .cloned()
            .collect()
    }

    /// Resolve an adapter by protocol id, for display-name lookups during
    /// analysis.
    pub fn get(&self, protocol_id: &str) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.protocol().id == protocol_id)
            .cloned()
    }

    /// All registered adapters.
    pub fn all(&self) -> &[Arc<dyn ProtocolAdapter>] {
        &self.adapters
    }

    /// Descriptors of every registered protocol.
    pub fn protocols(&self) -> Vec<ProtocolInfo> {
        self.adapters.iter().map(|a| a.protocol()).collect()
    }
}
