//! Compile-time ABI definitions for Lido contracts via Alloy `sol!`.

use alloy::sol;

sol! {
    /// Lido stETH — rebasing liquid-staking token.
    #[sol(rpc)]
    interface IStEth {
        function balanceOf(address owner) external view returns (uint256);
    }
}

sol! {
    /// Lido wstETH — non-rebasing wrapper around stETH.
    #[sol(rpc)]
    interface IWstEth {
        function balanceOf(address owner) external view returns (uint256);

        /// Current stETH redemption value of one wstETH (WAD).
        function stEthPerToken() external view returns (uint256);
    }
}
