use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::controller::FeedSettings;

/// Public networks with well-known hosted endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    /// Default indexer GraphQL endpoint for this network
    pub fn indexer_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.aptoslabs.com/v1/graphql",
            Self::Testnet => "https://api.testnet.aptoslabs.com/v1/graphql",
            Self::Devnet => "https://api.devnet.aptoslabs.com/v1/graphql",
            Self::Local => "http://127.0.0.1:8090/v1/graphql",
        }
    }

    /// Default node REST endpoint for this network
    pub fn node_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.aptoslabs.com/v1",
            Self::Testnet => "https://api.testnet.aptoslabs.com/v1",
            Self::Devnet => "https://api.devnet.aptoslabs.com/v1",
            Self::Local => "http://127.0.0.1:8080/v1",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "local" | "localnet" => Ok(Self::Local),
            other => Err(format!(
                "NETWORK must be one of mainnet, testnet, devnet, local; got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Local => "local",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Network whose hosted endpoints are used unless overridden
    #[serde(default = "default_network")]
    pub network: String,

    /// Explicit indexer GraphQL endpoint (overrides the network default)
    #[serde(default)]
    pub indexer_url: Option<String>,

    /// Explicit node REST endpoint (overrides the network default)
    #[serde(default)]
    pub node_url: Option<String>,

    /// Optional bearer token sent to hosted endpoints
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Records requested per indexed page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Records requested per node REST page
    #[serde(default = "default_rest_page_size")]
    pub rest_page_size: u32,

    /// A REST page at least this long is taken to mean more data exists
    #[serde(default = "default_rest_high_volume_threshold")]
    pub rest_high_volume_threshold: u32,

    /// Maximum coin balances and owned tokens returned in an account overview
    #[serde(default = "default_holdings_limit")]
    pub holdings_limit: u32,

    /// Timeout for upstream requests in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Maximum number of feeds held open at once; the oldest is evicted beyond this
    #[serde(default = "default_max_open_feeds")]
    pub max_open_feeds: usize,
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_page_size() -> u32 {
    100
}

fn default_rest_page_size() -> u32 {
    1000
}

fn default_rest_high_volume_threshold() -> u32 {
    1000
}

fn default_holdings_limit() -> u32 {
    100
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_max_open_feeds() -> usize {
    1024
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            // Double-underscore nesting keeps single underscores inside keys,
            // so NODE_URL / PAGE_SIZE map straight to snake_case fields.
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .map_err(|e| format!("Invalid server address: {}", e))
    }

    pub fn network(&self) -> Result<Network, String> {
        self.network.parse()
    }

    /// Indexer endpoint: explicit override, else the network default
    pub fn indexer_endpoint(&self) -> Result<String, String> {
        match &self.indexer_url {
            Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => Ok(self.network()?.indexer_url().to_string()),
        }
    }

    /// Node REST endpoint: explicit override, else the network default
    pub fn node_endpoint(&self) -> Result<String, String> {
        match &self.node_url {
            Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => Ok(self.network()?.node_url().to_string()),
        }
    }

    /// Get upstream timeout as Duration
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Pagination thresholds handed to every feed controller
    pub fn feed_settings(&self) -> Result<FeedSettings, String> {
        if self.page_size == 0 {
            return Err("PAGE_SIZE must be greater than 0".to_string());
        }
        if self.rest_page_size == 0 {
            return Err("REST_PAGE_SIZE must be greater than 0".to_string());
        }
        if self.rest_high_volume_threshold > self.rest_page_size {
            return Err(format!(
                "REST_HIGH_VOLUME_THRESHOLD ({}) cannot exceed REST_PAGE_SIZE ({})",
                self.rest_high_volume_threshold, self.rest_page_size
            ));
        }

        Ok(FeedSettings {
            page_size: self.page_size,
            rest_page_size: self.rest_page_size,
            rest_high_volume_threshold: self.rest_high_volume_threshold,
        })
    }
}
