//! Client configuration for the Tezoro backend API and EVM JSON-RPC endpoints.
//!
//! This module provides presets for the supported chains and a builder-style
//! configuration consumed by the API client, the RPC client and the monitor.

use crate::error::{Result, TezoroError};
use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default backend API base URL
pub const DEFAULT_API_URL: &str = "https://tezoro.io/api";

/// Default address of the Tezoro service (factory) contract
pub const DEFAULT_SERVICE_CONTRACT: Address = address!("d9bE6af8Cc9553Ffa6402939bEFAa63108366A06");

/// Chain enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chain {
    /// Ethereum mainnet
    Mainnet,
    /// Sepolia testnet
    Sepolia,
    /// Custom chain with user-defined endpoint
    Custom,
}

impl Chain {
    /// Get the EIP-155 chain id, `None` for custom chains
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Chain::Mainnet => Some(1),
            Chain::Sepolia => Some(11_155_111),
            Chain::Custom => None,
        }
    }

    /// Get the default JSON-RPC URL for this chain
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Chain::Mainnet => "https://ethereum-rpc.publicnode.com",
            Chain::Sepolia => "https://ethereum-sepolia-rpc.publicnode.com",
            Chain::Custom => "",
        }
    }
}

/// Configuration for the Tezoro client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chain to connect to
    pub chain: Chain,

    /// EIP-155 chain id
    pub chain_id: u64,

    /// JSON-RPC endpoint URL
    pub rpc_url: String,

    /// Backend API base URL
    pub api_url: String,

    /// Tezoro service contract that deploys backups
    pub service_contract_address: Address,

    /// Bearer token for authenticated API calls
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Maximum number of retries for failed requests
    pub max_retries: usize,

    /// Initial retry delay (in milliseconds)
    pub retry_initial_delay_ms: u64,

    /// Maximum retry delay (in milliseconds)
    pub retry_max_delay_ms: u64,

    /// Retry backoff multiplier
    pub retry_multiplier: f64,

    /// Receipt polling interval (in milliseconds)
    pub tx_poll_interval_ms: u64,

    /// Receipt wait timeout (in seconds)
    pub tx_timeout_secs: u64,
}

impl ClientConfig {
    /// Create a new configuration for a known chain
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            chain_id: chain.chain_id().unwrap_or_default(),
            rpc_url: chain.default_rpc_url().to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            service_contract_address: DEFAULT_SERVICE_CONTRACT,
            api_token: None,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 5000,
            retry_multiplier: 2.0,
            tx_poll_interval_ms: 2000,
            tx_timeout_secs: 180,
        }
    }

    /// Create configuration for Ethereum mainnet
    pub fn mainnet() -> Self {
        Self::new(Chain::Mainnet)
    }

    /// Create configuration for Sepolia
    pub fn sepolia() -> Self {
        Self::new(Chain::Sepolia)
    }

    /// Create a custom configuration
    pub fn custom(rpc_url: String, chain_id: u64) -> Result<Self> {
        if rpc_url.is_empty() {
            return Err(TezoroError::ConfigError(
                "RPC URL cannot be empty".to_string(),
            ));
        }
        if chain_id == 0 {
            return Err(TezoroError::ConfigError(
                "Chain id must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            chain_id,
            rpc_url,
            ..Self::new(Chain::Custom)
        })
    }

    /// Set backend API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the service contract address
    pub fn with_service_contract(mut self, address: Address) -> Self {
        self.service_contract_address = address;
        self
    }

    /// Set the bearer token used for authenticated API calls
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set retry delays
    pub fn with_retry_config(
        mut self,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    ) -> Self {
        self.retry_initial_delay_ms = initial_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self.retry_multiplier = multiplier;
        self
    }

    /// Set receipt polling configuration
    pub fn with_tx_config(mut self, poll_interval_ms: u64, timeout_secs: u64) -> Self {
        self.tx_poll_interval_ms = poll_interval_ms;
        self.tx_timeout_secs = timeout_secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(TezoroError::ConfigError(
                "RPC URL cannot be empty".to_string(),
            ));
        }
        if self.chain_id == 0 {
            return Err(TezoroError::ConfigError(
                "Chain id must be greater than 0".to_string(),
            ));
        }

        let api_url = Url::parse(&self.api_url)?;
        if !api_url.scheme().starts_with("http") {
            return Err(TezoroError::ConfigError(
                "API URL must start with http or https".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(TezoroError::ConfigError(
                "Max retries must be greater than 0".to_string(),
            ));
        }
        if self.retry_initial_delay_ms == 0 {
            return Err(TezoroError::ConfigError(
                "Retry initial delay must be greater than 0".to_string(),
            ));
        }
        if self.retry_multiplier <= 1.0 {
            return Err(TezoroError::ConfigError(
                "Retry multiplier must be greater than 1.0".to_string(),
            ));
        }
        if self.tx_poll_interval_ms == 0 {
            return Err(TezoroError::ConfigError(
                "Transaction poll interval must be greater than 0".to_string(),
            ));
        }
        if self.tx_timeout_secs == 0 {
            return Err(TezoroError::ConfigError(
                "Transaction timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
