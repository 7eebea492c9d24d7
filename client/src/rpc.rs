//! EVM JSON-RPC client.
//!
//! This module provides a client for the Ethereum JSON-RPC API, which is used for
//! reading backup contract state, sending transactions through the connected node
//! and retrieving transactions and receipts.

use crate::config::ClientConfig;
use crate::error::{Result, TezoroError};
use crate::retry::RetryStrategy;
use crate::types::{parse_quantity, RpcTransaction, TransactionHash, TransactionReceipt};
use alloy_primitives::{Address, Bytes, U256};
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// JSON-RPC request ID type
type RequestId = u64;

/// EVM JSON-RPC client
#[derive(Clone)]
pub struct EvmRpcClient {
    /// HTTP client
    client: Client,
    /// Node endpoint
    rpc_url: String,
    /// Retry strategy
    retry_strategy: RetryStrategy,
    /// Configuration
    config: Arc<ClientConfig>,
    /// Request ID counter
    request_id: Arc<AtomicU64>,
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: RequestId,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Call or transaction object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Sender
    pub from: Option<Address>,
    /// Target contract
    pub to: Address,
    /// Call data
    pub data: Bytes,
    /// Attached value in wei
    pub value: Option<U256>,
}

impl CallRequest {
    /// Read-only call to `to`
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            from: None,
            to,
            data,
            value: None,
        }
    }

    /// Set the sender
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Attach value
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    fn to_json(&self) -> Value {
        let mut object = json!({
            "to": self.to,
            "data": self.data,
        });
        if let Some(from) = self.from {
            object["from"] = json!(from);
        }
        if let Some(value) = self.value {
            object["value"] = json!(format!("{:#x}", value));
        }
        object
    }
}

impl EvmRpcClient {
    /// Create a new JSON-RPC client
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TezoroError::NetworkError)?;

        let retry_strategy = RetryStrategy::from_config(&config);

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            retry_strategy,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn next_request_id(&self) -> RequestId {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send_once(&self, method: &str, params: &Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_request_id(),
            method,
            params: params.clone(),
        };

        debug!("RPC request: {} (id: {})", method, request.id);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(TezoroError::NetworkError)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            return Err(TezoroError::RateLimitExceeded(retry_after));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TezoroError::RpcError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TezoroError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            error!("RPC error: {} (code: {})", error.message, error.code);
            return Err(TezoroError::RpcError(format!(
                "{} (code: {})",
                error.message, error.code
            )));
        }

        // `null` is a valid result, e.g. for an unknown transaction
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    /// Make a read-only JSON-RPC call
    async fn call_rpc(&self, method: &str, params: Value) -> Result<Value> {
        self.retry_strategy
            .retry(|| self.send_once(method, &params))
            .await
    }

    /// Make a JSON-RPC call that must not be replayed on ambiguous failures
    async fn call_rpc_mutation(&self, method: &str, params: Value) -> Result<Value> {
        self.retry_strategy
            .retry_with_predicate(
                || self.send_once(method, &params),
                RetryStrategy::is_retryable_mutation,
            )
            .await
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.call_rpc("eth_chainId", json!([])).await?;
        let chain_id = result.as_str().ok_or_else(|| {
            TezoroError::InvalidResponse("Missing chain id in response".to_string())
        })?;
        parse_quantity(chain_id)
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64> {
        let result = self.call_rpc("eth_blockNumber", json!([])).await?;
        let number = result.as_str().ok_or_else(|| {
            TezoroError::InvalidResponse("Missing block number in response".to_string())
        })?;
        let number = parse_quantity(number)?;

        debug!("Latest block: {}", number);
        Ok(number)
    }

    /// `eth_call` against the latest block
    pub async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let result = self
            .call_rpc("eth_call", json!([request.to_json(), "latest"]))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Simulate a transaction, surfacing reverts as [`TezoroError::SimulationFailed`]
    pub async fn simulate(&self, request: &CallRequest) -> Result<Bytes> {
        debug!("Simulating call to {}", request.to);

        match self
            .send_once("eth_call", &json!([request.to_json(), "latest"]))
            .await
        {
            Ok(result) => Ok(serde_json::from_value(result)?),
            Err(TezoroError::RpcError(message)) if !message.starts_with("HTTP ") => {
                Err(TezoroError::SimulationFailed(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Send a transaction signed by the node's account
    pub async fn send_transaction(&self, request: &CallRequest) -> Result<TransactionHash> {
        info!("Sending transaction to {}", request.to);

        let result = self
            .call_rpc_mutation("eth_sendTransaction", json!([request.to_json()]))
            .await?;

        let hash: TransactionHash = serde_json::from_value(result)
            .map_err(|e| TezoroError::InvalidResponse(format!("Invalid transaction hash: {}", e)))?;

        info!("Transaction sent: {}", hash);
        Ok(hash)
    }

    /// Transaction by hash, `None` if the node does not know it
    pub async fn get_transaction(&self, tx_hash: TransactionHash) -> Result<Option<RpcTransaction>> {
        debug!("Fetching transaction: {}", tx_hash);

        let result = self
            .call_rpc("eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    /// Receipt by transaction hash, `None` while pending
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TransactionHash,
    ) -> Result<Option<TransactionReceipt>> {
        debug!("Fetching receipt: {}", tx_hash);

        let result = self
            .call_rpc("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    /// Health check - verify the node is reachable and on the configured chain
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Performing RPC health check");

        let chain_id = match self.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(e) => {
                error!("RPC health check failed: {:?}", e);
                return Err(e);
            }
        };

        if chain_id != self.config.chain_id {
            error!(
                "RPC node is on chain {}, expected {}",
                chain_id, self.config.chain_id
            );
            return Err(TezoroError::ConfigError(format!(
                "RPC chain id {} does not match configured chain id {}",
                chain_id, self.config.chain_id
            )));
        }

        info!("RPC health check passed (chain {})", chain_id);
        Ok(true)
    }
}
