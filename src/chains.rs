/// Chains the resolver talks to directly, outside of what the TLD hub reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    /// Ethereum Mainnet
    EthereumMainnet,
    /// Ethereum Goerli Testnet
    EthereumGoerli,
    /// Ethereum Sepolia Testnet
    EthereumSepolia,
    /// BNB Smart Chain
    BscMainnet,
    /// BNB Smart Chain Testnet
    BscTestnet,
    /// Arbitrum One Mainnet
    ArbitrumOne,
    /// Polygon Mainnet
    PolygonMainnet,
    /// Gravity Alpha Mainnet
    Gravity,
}

impl Chain {
    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::EthereumMainnet => 1,
            Chain::EthereumGoerli => 5,
            Chain::EthereumSepolia => 11155111,
            Chain::BscMainnet => 56,
            Chain::BscTestnet => 97,
            Chain::ArbitrumOne => 42161,
            Chain::PolygonMainnet => 137,
            Chain::Gravity => 1625,
        }
    }

    /// Get RPC URL (public endpoints)
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Chain::EthereumMainnet => "https://eth.llamarpc.com",
            Chain::EthereumGoerli => "https://rpc.ankr.com/eth_goerli",
            Chain::EthereumSepolia => "https://1rpc.io/sepolia",
            Chain::BscMainnet => "https://bsc-dataseed.binance.org/",
            Chain::BscTestnet => "https://data-seed-prebsc-1-s1.binance.org:8545",
            Chain::ArbitrumOne => "https://arb1.arbitrum.io/rpc",
            Chain::PolygonMainnet => "https://polygon-rpc.com",
            Chain::Gravity => "https://rpc.gravity.xyz",
        }
    }

    /// Look up a chain by numeric ID
    pub fn from_id(chain_id: u64) -> Option<Chain> {
        match chain_id {
            1 => Some(Chain::EthereumMainnet),
            5 => Some(Chain::EthereumGoerli),
            11155111 => Some(Chain::EthereumSepolia),
            56 => Some(Chain::BscMainnet),
            97 => Some(Chain::BscTestnet),
            42161 => Some(Chain::ArbitrumOne),
            137 => Some(Chain::PolygonMainnet),
            1625 => Some(Chain::Gravity),
            _ => None,
        }
    }

    /// Chains whose native name system is ENS
    pub fn is_ethereum(&self) -> bool {
        matches!(
            self,
            Chain::EthereumMainnet | Chain::EthereumGoerli | Chain::EthereumSepolia
        )
    }
}

/// True for Ethereum mainnet and its testnets.
pub fn is_eth_chain(chain_id: u64) -> bool {
    Chain::from_id(chain_id).is_some_and(|chain| chain.is_ethereum())
}
