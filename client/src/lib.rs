//! Tezoro Client Library
//!
//! This library provides client-side access to the Tezoro asset backup service:
//! an owner registers beneficiaries and a trigger (inactivity period or fixed
//! date), and if the trigger fires control of the backed-up tokens passes to the
//! beneficiaries unless the owner intervenes.
//!
//! # Features
//!
//! - **Deployment parameters**: fee discounts, beneficiary share encoding and the
//!   fixed four-slot argument tuple of `deployBackupContract`
//! - **Lifecycle interpretation**: derive timestamps and flags from backup contract state
//! - **Backend API**: accounts, backup metadata and owner actions
//! - **Chain access**: contract reads, deployment submission, receipt and event decoding
//! - **Retry Logic**: Exponential backoff for transient network errors
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tezoro_client::{ClientConfig, TezoroClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tezoro_client::init_tracing();
//!
//!     let client = TezoroClient::new(Arc::new(ClientConfig::sepolia()))?;
//!     client.health_check().await?;
//!
//!     let backup = "0x1111111111111111111111111111111111111111".parse()?;
//!     let view = client.get_backup_info_by_address(backup).await?;
//!     println!("state: {}, active: {}", view.state, view.is_active);
//!     Ok(())
//! }
//! ```
//!
//! # Examples
//!
//! ## Prepare a deployment
//!
//! ```rust
//! use tezoro_client::deploy::{build_deployment_params, Beneficiary, DeployData};
//! use alloy_primitives::{Address, B256};
//!
//! let data = DeployData {
//!     executor: None,
//!     beneficiaries: vec![Beneficiary { address: Address::repeat_byte(0x11), percent: 100.0 }],
//!     token_address: Address::repeat_byte(0x22),
//!     launch_date: 1_700_000_000,
//!     discounts: Some(vec![0.1]),
//!     inactive_period: None,
//!     email_hash: B256::ZERO,
//!     meta_id_encrypted: B256::ZERO,
//! };
//!
//! let params = build_deployment_params(&data, 1_000_000).unwrap();
//! assert_eq!(params.value, alloy_primitives::U256::from(900_000u64));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod abi;
pub mod address;
pub mod api;
pub mod chain;
pub mod config;
pub mod deploy;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod retry;
pub mod rpc;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use api::ApiClient;
pub use chain::{get_backup_info_by_address, BackupStateReader};
pub use config::{Chain, ClientConfig};
pub use deploy::{build_deployment_params, Beneficiary, DeployData, DeploymentParams};
pub use error::{Result, TezoroError};
pub use lifecycle::{derive_backup_view, BackupPhase, BackupState, BackupView, RawBackupState};
pub use monitor::{MonitorOptions, MonitorResult, TransactionMonitor};
pub use retry::RetryStrategy;
pub use rpc::{CallRequest, EvmRpcClient};
pub use transaction::{SubmitOptions, TransactionManager};
pub use types::{
    ActionState, ActionStatus, Backup, BackupAction, BackupMetaResponse, CurrentFees,
    TransactionHash, UserSession,
};

use alloy_primitives::Address;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Current unix time in seconds
fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Main client combining the backend API, JSON-RPC access, transaction
/// submission and monitoring.
#[derive(Clone)]
pub struct TezoroClient {
    /// Backend API client
    api: ApiClient,
    /// JSON-RPC client
    rpc: EvmRpcClient,
    /// Transaction manager
    transaction_manager: TransactionManager,
    /// Transaction monitor
    transaction_monitor: TransactionMonitor,
    /// Configuration
    config: Arc<ClientConfig>,
}

impl TezoroClient {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tezoro_client::{ClientConfig, TezoroClient};
    /// use std::sync::Arc;
    ///
    /// let config = Arc::new(ClientConfig::mainnet().with_api_token("jwt"));
    /// let client = TezoroClient::new(config).unwrap();
    /// ```
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing Tezoro client for chain {:?} (id {})",
            config.chain, config.chain_id
        );

        let api = ApiClient::new(config.clone())?;
        let rpc = EvmRpcClient::new(config.clone())?;
        let transaction_manager = TransactionManager::with_rpc(rpc.clone(), config.clone());
        let transaction_monitor = TransactionMonitor::with_rpc(rpc.clone(), config.clone());

        Ok(Self {
            api,
            rpc,
            transaction_manager,
            transaction_monitor,
            config,
        })
    }

    /// Use `token` for authenticated API calls
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api.set_token(token);
        self
    }

    /// Get the backend API client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get the JSON-RPC client
    pub fn rpc(&self) -> &EvmRpcClient {
        &self.rpc
    }

    /// Get the transaction manager
    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transaction_manager
    }

    /// Get the transaction monitor
    pub fn transaction_monitor(&self) -> &TransactionMonitor {
        &self.transaction_monitor
    }

    /// Get configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Deployment parameters and fee for `data`
    pub fn prepare_deployment(
        &self,
        data: &DeployData,
        service_fee_base_wei: u128,
    ) -> Result<DeploymentParams> {
        build_deployment_params(data, service_fee_base_wei)
    }

    /// Deploy a backup contract through the configured service contract
    pub async fn deploy_backup(
        &self,
        from: Address,
        params: &DeploymentParams,
        options: SubmitOptions,
    ) -> Result<TransactionHash> {
        self.transaction_manager
            .deploy_backup(from, self.config.service_contract_address, params, options)
            .await
    }

    /// Raw state of a backup contract
    pub async fn read_backup_state(&self, backup: Address) -> Result<RawBackupState> {
        self.rpc.read_backup_state(backup).await
    }

    /// Interpreted state of a backup contract at the current time
    pub async fn get_backup_info_by_address(&self, backup: Address) -> Result<BackupView> {
        self.get_backup_info_at(backup, now_unix()).await
    }

    /// Interpreted state of a backup contract at `now` (unix seconds)
    pub async fn get_backup_info_at(&self, backup: Address, now: u64) -> Result<BackupView> {
        get_backup_info_by_address(&self.rpc, backup, now).await
    }

    /// Address of the backup deployed by `tx_hash`, waiting for its receipt
    pub async fn get_backup_address_by_tx_hash(&self, tx_hash: TransactionHash) -> Result<Address> {
        self.transaction_monitor
            .get_backup_address_by_tx_hash(tx_hash)
            .await
    }

    /// Status and decoded call of an owner action transaction
    pub async fn get_action_state_by_tx_hash(
        &self,
        tx_hash: TransactionHash,
    ) -> Result<ActionState> {
        self.transaction_manager
            .get_action_state_by_tx_hash(tx_hash)
            .await
    }

    /// Monitor a transaction until completion
    pub async fn monitor_transaction(
        &self,
        tx_hash: TransactionHash,
        options: MonitorOptions,
    ) -> Result<MonitorResult> {
        self.transaction_monitor.monitor(tx_hash, options).await
    }

    /// Wait for transaction confirmation (simplified interface)
    pub async fn wait_for_confirmation(&self, tx_hash: TransactionHash) -> Result<bool> {
        self.transaction_monitor
            .wait_for_confirmation(tx_hash)
            .await
    }

    /// Health check - verify connectivity to the JSON-RPC node
    pub async fn health_check(&self) -> Result<bool> {
        self.rpc.health_check().await
    }
}
