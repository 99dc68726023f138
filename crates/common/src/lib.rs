pub mod assets;
pub mod client;
pub mod error;
pub mod traits;
pub mod types;
pub mod units;

pub use client::{ChainClient, EvmProvider, SvmClient};
pub use error::{VantageError, VantageResult};
pub use traits::{PriceResolver, ProtocolAdapter};
