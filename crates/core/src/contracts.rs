//! ABI bindings of the contracts the farm page reads from and writes to.
use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IStakingRewards {
        function stake(uint256 amount) external;
        function withdraw(uint256 amount) external;
        function getReward() external;
        function balanceOf(address account) external view returns (uint256);
        function earned(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function rewardRate() external view returns (uint256);
        function periodFinish() external view returns (uint256);
    }
}

sol! {
    /// Staking contract paying out two reward tokens. Staking, withdrawing and
    /// claiming share the single-reward ABI.
    #[sol(rpc)]
    interface IStakingDualRewards {
        function earnedA(address account) external view returns (uint256);
        function earnedB(address account) external view returns (uint256);
        function rewardRateA() external view returns (uint256);
        function rewardRateB() external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function totalSupply() external view returns (uint256);
    }
}

sol! {
    /// dQUICK, the staked QUICK token.
    #[sol(rpc)]
    interface IDragonLair {
        function totalSupply() external view returns (uint256);
        function dQUICKForQUICK(uint256 dQuickAmount) external view returns (uint256);
    }
}
