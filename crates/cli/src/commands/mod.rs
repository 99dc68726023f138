pub mod chains;
pub mod portfolio;
pub mod protocols;
pub mod yield_scan;

use anyhow::Result;
use vantage_common::types::ChainId;

/// Parse `--chains` values into chain ids.
pub fn parse_chain_filter(chains: Option<Vec<String>>) -> Result<Option<Vec<ChainId>>> {
    match chains {
        None => Ok(None),
        Some(names) => {
            let mut parsed = Vec::with_capacity(names.len());
            for name in names {
                parsed.push(name.parse::<ChainId>().map_err(|e| anyhow::anyhow!(e))?);
            }
            Ok(Some(parsed))
        }
    }
}
