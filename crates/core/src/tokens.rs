//! Static per-chain token catalogs.
//!
//! Balance checks are scoped to these known tokens instead of enumerating
//! a wallet's full on-chain history. Addresses are canonical mainnet
//! deployments (mint addresses on Solana).

use std::collections::HashMap;

use vantage_common::types::{ChainId, TokenInfo};

fn token(address: &str, symbol: &str, decimals: u8, catalog_id: Option<&str>) -> TokenInfo {
    TokenInfo {
        address: address.to_string(),
        symbol: symbol.to_string(),
        decimals,
        catalog_id: catalog_id.map(str::to_string),
    }
}

/// The set of tokens checked per chain.
pub struct TokenCatalog {
    by_chain: HashMap<ChainId, Vec<TokenInfo>>,
}

impl TokenCatalog {
    /// The built-in catalog, loaded once at process start.
    pub fn builtin() -> Self {
        let mut by_chain = HashMap::new();

        by_chain.insert(
            ChainId::Ethereum,
            vec![
                token("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18, Some("weth")),
                token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6, Some("usd-coin")),
                token("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", 6, Some("tether")),
                token("0x6B175474E89094C44Da98b954EedeAC495271d0F", "DAI", 18, Some("dai")),
                token("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", "WBTC", 8, Some("wrapped-bitcoin")),
                token("0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84", "stETH", 18, Some("staked-ether")),
                token("0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0", "wstETH", 18, None),
                token("0xae78736Cd615f374D3085123A210448E74Fc6393", "rETH", 18, None),
            ],
        );

        by_chain.insert(
            ChainId::Arbitrum,
            vec![
                token("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", "WETH", 18, Some("weth")),
                token("0xaf88d065e77c8cC2239327C5EDb3A432268e5831", "USDC", 6, Some("usd-coin")),
                token("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", "USDT", 6, Some("tether")),
                token("0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f", "WBTC", 8, Some("wrapped-bitcoin")),
                token("0x912CE59144191C1204E64559FE8253a0e49E6548", "ARB", 18, Some("arbitrum")),
            ],
        );

        by_chain.insert(
            ChainId::Base,
            vec![
                token("0x4200000000000000000000000000000000000006", "WETH", 18, Some("weth")),
                token("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "USDC", 6, Some("usd-coin")),
                token("0x2Ae3F1Ec7F1F5012CFEab0185bfc7aa3cf0DEc22", "cbETH", 18, None),
            ],
        );

        by_chain.insert(
            ChainId::Solana,
            vec![
                token("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC", 6, Some("usd-coin")),
                token("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", 6, Some("tether")),
                token("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL", 9, None),
                token("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", "JitoSOL", 9, None),
            ],
        );

        Self { by_chain }
    }

    pub fn tokens_for(&self, chain: ChainId) -> &[TokenInfo] {
        self.by_chain.get(&chain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, chain: ChainId, symbol: &str) -> Option<&TokenInfo> {
        self.tokens_for(chain)
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }
}

impl Default for TokenCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chain_has_tokens() {
        let catalog = TokenCatalog::builtin();
        for &chain in ChainId::all() {
            assert!(
                !catalog.tokens_for(chain).is_empty(),
                "no catalog entries for {chain}"
            );
        }
    }

    #[test]
    fn test_find_case_insensitive() {
        let catalog = TokenCatalog::builtin();
        let usdc = catalog.find(ChainId::Ethereum, "usdc").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert!(catalog.find(ChainId::Ethereum, "PEPE").is_none());
    }

    #[test]
    fn test_evm_addresses_parse() {
        let catalog = TokenCatalog::builtin();
        for chain in [ChainId::Ethereum, ChainId::Arbitrum, ChainId::Base] {
            for t in catalog.tokens_for(chain) {
                assert!(
                    t.address.parse::<alloy::primitives::Address>().is_ok(),
                    "bad address for {} on {chain}",
                    t.symbol
                );
            }
        }
    }
}
