//! Interface bindings for the protocol's admin surface. The privileged
//! writes (`manageContract`, `replaceContract`, `enableStrategy`) are
//! only ever invoked on-chain by disposable migration units running under
//! `executeAsOwner`; the reconciler itself calls the views.

use alloy::sol;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IDependencyController {
        function allManagedContracts() external view returns (address[] memory);
        function allRoles(uint256 index) external view returns (uint256);
        function manageContract(address contractAddr) external;
        function replaceContract(address oldContract, address newContract) external;
        function executeAsOwner(address executor) external;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IStrategyRegistry {
        function allEnabledStrategies() external view returns (address[] memory);
        function enableStrategy(address strategy) external;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IRoles {
        function owner() external view returns (address);
        function getRole(uint256 role, address actor) external view returns (bool);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IIsolatedLending {
        function viewILMetadata(address token) external view returns (uint256 debtCeiling, uint256 totalDebt, uint256 mintingFee, uint256 borrowablePer10k);
        function setupTrancheSlot() external;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ITrancheIdService {
        function viewSlotByTrancheContract(address trancheContract) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IStrategy {
        function checkApprovedAndEncode(address token) external view returns (bool approved, bytes memory data);
    }
}

// Each oracle kind checks a different parameter tuple, so each gets its
// own binding. All return (matches, abi-encoded params).

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IChainlinkOracle {
        function encodeAndCheckOracleParams(address token, address pegCurrency, address feed, uint256 decimals) external view returns (bool matches, bytes memory encoded);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ITwapOracle {
        function encodeAndCheckOracleParams(address token, address pegCurrency, address pair, bool inverse) external view returns (bool matches, bytes memory encoded);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IEquivalentScaledOracle {
        function encodeAndCheckOracleParams(address token, address pegCurrency, uint256 scale, uint256 oneUnit) external view returns (bool matches, bytes memory encoded);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IProxyOracle {
        function encodeAndCheckOracleParams(address token, address viaToken, address pegCurrency) external view returns (bool matches, bytes memory encoded);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}
