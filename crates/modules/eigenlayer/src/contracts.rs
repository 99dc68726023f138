//! Compile-time ABI definitions for EigenLayer contracts via Alloy `sol!`.

use alloy::sol;

sol! {
    /// EigenLayer StrategyManager — tracks staker shares per strategy.
    #[sol(rpc)]
    interface IStrategyManager {
        /// Number of strategies the staker has shares in.
        function stakerStrategyListLength(address staker) external view returns (uint256);

        /// The staker's shares in a strategy.
        function stakerStrategyShares(address staker, address strategy) external view returns (uint256);
    }
}

sol! {
    /// An EigenLayer strategy vault holding one underlying LST.
    #[sol(rpc)]
    interface IStrategy {
        /// Convert shares to underlying token amount at the current
        /// exchange rate, without state mutation.
        function sharesToUnderlyingView(uint256 amountShares) external view returns (uint256);
    }
}
