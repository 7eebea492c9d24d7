//! Transaction monitoring and receipt decoding.
//!
//! This module polls for transaction receipts, waits for confirmations and
//! extracts the deployed backup address from the service contract's event.

use crate::abi;
use crate::config::ClientConfig;
use crate::error::{Result, TezoroError};
use crate::rpc::EvmRpcClient;
use crate::types::{Log, TransactionHash, TransactionReceipt};
use alloy_primitives::Address;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Transaction monitor for tracking transaction status
#[derive(Clone)]
pub struct TransactionMonitor {
    /// JSON-RPC client
    rpc: EvmRpcClient,
    /// Configuration
    config: Arc<ClientConfig>,
}

/// Monitoring options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Poll interval (in milliseconds)
    pub poll_interval_ms: u64,
    /// Timeout (in seconds)
    pub timeout_secs: u64,
}

impl MonitorOptions {
    /// Create from client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval_ms: config.tx_poll_interval_ms,
            timeout_secs: config.tx_timeout_secs,
        }
    }

    /// Set custom poll interval
    pub fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Transaction monitoring result
#[derive(Debug, Clone)]
pub enum MonitorResult {
    /// Mined and executed successfully
    Confirmed(TransactionReceipt),
    /// Mined but reverted
    Reverted(TransactionReceipt),
    /// No receipt before the timeout
    Timeout,
}

impl TransactionMonitor {
    /// Create a new transaction monitor
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let rpc = EvmRpcClient::new(config.clone())?;
        Ok(Self::with_rpc(rpc, config))
    }

    /// Create a monitor sharing an existing RPC client
    pub fn with_rpc(rpc: EvmRpcClient, config: Arc<ClientConfig>) -> Self {
        Self { rpc, config }
    }

    /// Poll for a receipt until it arrives or the timeout elapses
    pub async fn monitor(
        &self,
        tx_hash: TransactionHash,
        options: MonitorOptions,
    ) -> Result<MonitorResult> {
        info!(
            "Monitoring transaction: {} (timeout: {}s)",
            tx_hash, options.timeout_secs
        );

        let start = Instant::now();
        let timeout = Duration::from_secs(options.timeout_secs);
        let poll_interval = Duration::from_millis(options.poll_interval_ms);

        loop {
            if start.elapsed() >= timeout {
                warn!("Transaction monitoring timed out: {}", tx_hash);
                return Ok(MonitorResult::Timeout);
            }

            match self.rpc.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.succeeded() => {
                    info!("Transaction confirmed: {}", tx_hash);
                    return Ok(MonitorResult::Confirmed(receipt));
                }
                Ok(Some(receipt)) => {
                    warn!("Transaction reverted: {}", tx_hash);
                    return Ok(MonitorResult::Reverted(receipt));
                }
                Ok(None) => {
                    debug!("Transaction still pending: {}", tx_hash);
                }
                Err(e) => {
                    debug!("Error fetching receipt: {:?}", e);
                }
            }

            sleep(poll_interval).await;
        }
    }

    /// Wait for a receipt with the configured polling, failing on timeout
    pub async fn wait_for_receipt(&self, tx_hash: TransactionHash) -> Result<TransactionReceipt> {
        let options = MonitorOptions::from_config(&self.config);
        let timeout_secs = options.timeout_secs;

        match self.monitor(tx_hash, options).await? {
            MonitorResult::Confirmed(receipt) | MonitorResult::Reverted(receipt) => Ok(receipt),
            MonitorResult::Timeout => Err(TezoroError::TransactionTimeout(timeout_secs)),
        }
    }

    /// Wait for a transaction to be confirmed (simplified interface)
    ///
    /// Returns true if the transaction succeeded, false if it reverted or timed out
    pub async fn wait_for_confirmation(&self, tx_hash: TransactionHash) -> Result<bool> {
        let options = MonitorOptions::from_config(&self.config);
        match self.monitor(tx_hash, options).await? {
            MonitorResult::Confirmed(_) => Ok(true),
            MonitorResult::Reverted(_) | MonitorResult::Timeout => Ok(false),
        }
    }

    /// Address of the backup contract deployed by `tx_hash`
    pub async fn get_backup_address_by_tx_hash(&self, tx_hash: TransactionHash) -> Result<Address> {
        let receipt = self.wait_for_receipt(tx_hash).await?;
        find_deployed_backup_address(&receipt.logs)?
            .ok_or_else(|| TezoroError::EventNotFound(format!("DeployedBackupContract in {}", tx_hash)))
    }
}

/// `backupContract` of the first log that decodes as `DeployedBackupContract`.
///
/// Logs of other events, or that fail to decode, are skipped.
pub fn find_deployed_backup_address(logs: &[Log]) -> Result<Option<Address>> {
    let event = abi::deployed_backup_event()?;
    let backup = logs
        .iter()
        .filter_map(|log| abi::parse_event_log(event, &log.topics, &log.data))
        .find_map(|params| {
            params
                .into_iter()
                .find(|(name, _)| name == "backupContract")
                .and_then(|(_, value)| abi::token_to_address(&value).ok())
        });
    Ok(backup)
}
