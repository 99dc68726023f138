//! Compile-time ABI definitions for Aave V3 contracts via Alloy `sol!`.
//!
//! Read surface only — no supply/borrow/liquidation calldata.

use alloy::sol;

sol! {
    /// Aave V3 Pool — aggregate user account data.
    #[sol(rpc)]
    interface IPool {
        /// Get aggregated user position data.
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralBase,
            uint256 totalDebtBase,
            uint256 availableBorrowsBase,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );
    }
}

sol! {
    /// Aave V3 PoolDataProvider — read-only reserve/user data.
    #[sol(rpc)]
    interface IPoolDataProvider {
        /// Per-user, per-reserve balances and rates.
        function getUserReserveData(address asset, address user) external view returns (
            uint256 currentATokenBalance,
            uint256 currentStableDebt,
            uint256 currentVariableDebt,
            uint256 principalStableDebt,
            uint256 scaledVariableDebt,
            uint256 stableBorrowRate,
            uint256 liquidityRate,
            uint40 stableRateLastUpdated,
            bool usageAsCollateralEnabled
        );

        /// Reserve-wide state (12 flat values).
        function getReserveData(address asset) external view returns (
            uint256 unbacked,
            uint256 accruedToTreasuryScaled,
            uint256 totalAToken,
            uint256 totalStableDebt,
            uint256 totalVariableDebt,
            uint256 liquidityRate,
            uint256 variableBorrowRate,
            uint256 stableBorrowRate,
            uint256 averageStableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex,
            uint40 lastUpdateTimestamp
        );
    }
}
