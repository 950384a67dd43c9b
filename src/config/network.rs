use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::ConfigError;

/// Supported networks with their protocol deployment start blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Network {
    Ethereum,
    Sepolia,
    Bsc,
    Chapel,
    OpBnbMainnet,
    Arbitrum,
    ArbitrumSepolia,
    Docker,
}

impl Network {
    /// Block of the earliest protocol deployment on this network.
    pub fn default_start_block(&self) -> u64 {
        match self {
            Network::Ethereum => 18968000,
            Network::Sepolia => 3930059,
            Network::Bsc => 29300000,
            Network::Chapel => 30870000,
            Network::OpBnbMainnet => 16232873,
            Network::Arbitrum => 216184381,
            Network::ArbitrumSepolia => 44214769,
            Network::Docker => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Sepolia => "sepolia",
            Network::Bsc => "bsc",
            Network::Chapel => "chapel",
            Network::OpBnbMainnet => "opbnbMainnet",
            Network::Arbitrum => "arbitrum",
            Network::ArbitrumSepolia => "arbitrumSepolia",
            Network::Docker => "docker",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereum" => Ok(Network::Ethereum),
            "sepolia" => Ok(Network::Sepolia),
            "bsc" => Ok(Network::Bsc),
            "chapel" => Ok(Network::Chapel),
            "opbnbMainnet" => Ok(Network::OpBnbMainnet),
            "arbitrum" => Ok(Network::Arbitrum),
            "arbitrumSepolia" => Ok(Network::ArbitrumSepolia),
            "docker" => Ok(Network::Docker),
            other => Err(ConfigError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks_resolve() {
        assert_eq!("bsc".parse::<Network>().unwrap(), Network::Bsc);
        assert_eq!(Network::Bsc.default_start_block(), 29300000);
        assert_eq!(
            "arbitrumSepolia".parse::<Network>().unwrap(),
            Network::ArbitrumSepolia
        );
        assert_eq!(Network::Docker.default_start_block(), 0);
    }

    #[test]
    fn test_unknown_network_rejected() {
        let err = "goerli".parse::<Network>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedNetwork(name) if name == "goerli"));
    }
}
