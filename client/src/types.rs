//! Common types used across the Tezoro client.
//!
//! This module defines the backend API records and the JSON-RPC transaction
//! objects the client reads back from the chain.

use crate::abi::Selector;
use crate::address::ZERO_ADDRESS;
use crate::deploy::normalize_executor;
use crate::error::{Result, TezoroError};
use crate::lifecycle::BackupState;
use alloy_primitives::{hex, Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Transaction hash type
pub type TransactionHash = B256;

/// Accept non-negative integers, fall back to 0 for anything else.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().unwrap_or(0))
}

/// Parse a JSON-RPC hex quantity such as `0x1b4`
pub fn parse_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| TezoroError::InvalidResponse(format!("Invalid quantity: {}", value)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| TezoroError::InvalidResponse(format!("Invalid quantity: {}", value)))
}

/// Beneficiary as stored by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackupBeneficiary {
    /// Beneficiary address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Share in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

/// Nonce attached to a backup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupNonce {
    /// Nonce value
    pub value: Option<u64>,
    /// Issue date
    pub date: Option<u64>,
}

/// Backup record returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Backed-up amount, as a decimal string
    pub amount: Option<String>,
    /// Record id
    pub id: String,
    /// Record timestamp
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: u64,
    /// Deployed backup contract
    pub contract_address: Address,
    /// Owner wallet
    pub owner_address: Address,
    /// Owner commitment
    pub user_hash: String,
    /// Transaction of the action in flight, if any
    pub active_transaction_hash: Option<String>,
    /// Beneficiaries
    pub beneficiaries: Vec<BackupBeneficiary>,
    /// Fixed-date trigger (unix seconds), 0 if unset
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_trigger_timestamp: u64,
    /// Scheduled restore (unix seconds)
    pub restore_date_timestamp: u64,
    /// Metadata id
    pub meta_id: String,
    /// Backend status label
    pub status: Option<String>,
    /// Inactivity trigger, in months
    pub inactive_month_period: Option<f64>,
    /// Trigger is inactivity-based
    pub is_launch_by_inactive_period: Option<bool>,
    /// Backup was launched by inactivity
    pub is_launched_by_inactive_period: Option<bool>,
    /// Executor address
    pub executor: Option<String>,
    /// Nonce
    pub nonce: Option<BackupNonce>,
}

impl Backup {
    /// Fixed-date trigger, `None` if unset
    pub fn trigger_date(&self) -> Option<DateTime<Utc>> {
        if self.date_trigger_timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(i64::try_from(self.date_trigger_timestamp).ok()?, 0)
    }

    /// Executor, `None` unless a valid non-zero address
    pub fn executor_address(&self) -> Option<Address> {
        normalize_executor(self.executor.as_deref())
    }
}

/// Account data of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    /// Account id
    #[serde(rename = "_id")]
    pub id: String,
    /// Account email
    pub email: String,
}

/// Login/registration response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    /// Bearer token
    pub token: String,
    /// Account data
    pub data: UserData,
}

/// Current deployment cost estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFees {
    /// Gas cost of a deployment
    pub deploy_cost: f64,
    /// Gas cost in USD
    pub deploy_cost_usd: f64,
    /// Service fee
    pub service_fee: f64,
    /// Service fee in USD
    pub service_fee_usd: f64,
    /// Total
    pub total: f64,
    /// Total in USD
    pub total_usd: f64,
    /// ETH/USD rate used
    pub eth_usd_price: f64,
}

/// Backend load indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Backend is under high load
    pub is_high_load: bool,
}

/// Analytics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    /// User email
    pub email: String,
    /// Page the user saw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saw_page: Option<String>,
    /// Promo code entered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promocode: Option<String>,
}

/// Owner action reported with backup metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackupMetaAction {
    /// Restore initiated
    InitiateRestoreProcess,
    /// Revocation initiated
    InitiateRevocationProcess,
    /// Revocation aborted
    AbortRevocationProcess,
    /// Restore aborted
    AbortRestoreProcess,
}

/// Backup metadata update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetaUpdate {
    /// Metadata id
    pub meta_id: String,
    /// Scheduled restore
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_date_timestamp: Option<u64>,
    /// Revocation initiation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_initiate_date_timestamp: Option<u64>,
    /// Fixed-date trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_trigger_timestamp: Option<u64>,
    /// Action taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<BackupMetaAction>,
}

impl BackupMetaUpdate {
    /// Update carrying only the metadata id
    pub fn new(meta_id: impl Into<String>) -> Self {
        Self {
            meta_id: meta_id.into(),
            restore_date_timestamp: None,
            revocation_initiate_date_timestamp: None,
            date_trigger_timestamp: None,
            action: None,
        }
    }

    /// Attach an owner action
    pub fn with_action(mut self, action: BackupMetaAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Request for the commitments of a new backup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaIdRequest {
    /// Beneficiaries
    pub beneficiaries: Vec<BackupBeneficiary>,
    /// Fixed-date trigger
    pub date_trigger_timestamp: u64,
    /// Manual restore allowed
    pub is_manual_available: bool,
    /// Backed-up amount
    pub amount: f64,
    /// Inactivity trigger, in months
    #[serde(rename = "inactiveMonthPeriod", skip_serializing_if = "Option::is_none")]
    pub inactive_period: Option<u32>,
    /// Executor as entered, omitted when absent or the zero address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
}

impl MetaIdRequest {
    /// Build a request; an absent or zero executor is omitted, any other
    /// value is forwarded for the backend to validate
    pub fn new(
        beneficiaries: Vec<BackupBeneficiary>,
        date_trigger_timestamp: u64,
        amount: f64,
        executor: Option<&str>,
        inactive_period: Option<u32>,
    ) -> Self {
        Self {
            beneficiaries,
            date_trigger_timestamp,
            is_manual_available: true,
            amount,
            inactive_period,
            executor: executor
                .filter(|value| !is_zero_address(value))
                .map(str::to_string),
        }
    }
}

fn is_zero_address(value: &str) -> bool {
    value
        .parse::<Address>()
        .map(|address| address == ZERO_ADDRESS)
        .unwrap_or(false)
}

/// Commitments issued by the backend for a new backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetaResponse {
    /// Owner email commitment
    pub email_hash: Bytes,
    /// Encrypted metadata id
    pub meta_id_encrypted: String,
}

impl BackupMetaResponse {
    /// Both commitments as `bytes32` call arguments
    pub fn commitments(&self) -> Result<(B256, B256)> {
        let email_hash = to_bytes32("email_hash", &self.email_hash)?;
        let meta_id = hex::decode(&self.meta_id_encrypted)?;
        let meta_id = to_bytes32("meta_id_encrypted", &meta_id)?;
        Ok((email_hash, meta_id))
    }
}

fn to_bytes32(field: &str, bytes: &[u8]) -> Result<B256> {
    if bytes.len() != 32 {
        return Err(TezoroError::InvalidResponse(format!(
            "{} is {} bytes, expected 32",
            field,
            bytes.len()
        )));
    }
    Ok(B256::from_slice(bytes))
}

/// Error body of the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Error message
    pub message: Option<String>,
}

/// Transaction as returned by `eth_getTransactionByHash`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash
    pub hash: TransactionHash,
    /// Sender
    pub from: Address,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Call data
    pub input: Bytes,
    /// Block number, `None` while pending
    pub block_number: Option<String>,
}

impl RpcTransaction {
    /// Block number, `None` while pending
    pub fn block_number(&self) -> Result<Option<u64>> {
        self.block_number.as_deref().map(parse_quantity).transpose()
    }
}

/// Log entry of a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<B256>,
    /// Non-indexed data
    pub data: Bytes,
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: TransactionHash,
    /// Block number
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` on revert
    pub status: Option<String>,
    /// Emitted logs
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Execution succeeded
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// Progress of an owner action transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Not yet in a block
    Pending,
    /// Included in a block
    Completed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "pending"),
            ActionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Backup contract call decoded from transaction input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupAction {
    /// `changeState(uint8)` with its target state
    ChangeState(BackupState),
    /// Call to a function this client does not know
    Unknown(Selector),
}

/// Status and kind of an owner action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionState {
    /// Progress
    pub status: ActionStatus,
    /// Decoded call
    pub action: BackupAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn backup_json() -> Value {
        json!({
            "id": "b-1",
            "timestamp": 1700000000,
            "contractAddress": "0x1111111111111111111111111111111111111111",
            "ownerAddress": "0x2222222222222222222222222222222222222222",
            "userHash": "0xabc",
            "beneficiaries": [{"address": "0x3333333333333333333333333333333333333333", "percent": 100}],
            "dateTriggerTimestamp": 1800000000,
            "restoreDateTimestamp": 0,
            "metaId": "meta-1",
            "status": "active"
        })
    }

    #[test]
    fn test_backup_deserialization() {
        let backup: Backup = serde_json::from_value(backup_json()).unwrap();
        assert_eq!(backup.id, "b-1");
        assert_eq!(backup.contract_address, Address::repeat_byte(0x11));
        assert_eq!(backup.beneficiaries[0].percent, Some(100.0));
        assert_eq!(backup.trigger_date().unwrap().timestamp(), 1_800_000_000);
        assert!(backup.nonce.is_none());
        assert!(backup.executor_address().is_none());
    }

    #[test]
    fn test_backup_lenient_timestamps() {
        let mut value = backup_json();
        value["timestamp"] = json!(-5);
        value["dateTriggerTimestamp"] = json!("soon");

        let backup: Backup = serde_json::from_value(value).unwrap();
        assert_eq!(backup.timestamp, 0);
        assert_eq!(backup.date_trigger_timestamp, 0);
        assert!(backup.trigger_date().is_none());
    }

    #[test]
    fn test_backup_rejects_invalid_contract_address() {
        let mut value = backup_json();
        value["contractAddress"] = json!("0x123");
        assert!(serde_json::from_value::<Backup>(value).is_err());
    }

    #[test]
    fn test_user_session_id_field() {
        let session: UserSession = serde_json::from_value(json!({
            "token": "jwt",
            "data": {"_id": "u-1", "email": "owner@example.com"}
        }))
        .unwrap();
        assert_eq!(session.data.id, "u-1");
    }

    #[test]
    fn test_meta_id_request_omits_zero_executor() {
        let request = MetaIdRequest::new(
            vec![BackupBeneficiary {
                address: Some("0x3333333333333333333333333333333333333333".to_string()),
                percent: Some(100.0),
            }],
            1_800_000_000,
            2.5,
            Some("0x0000000000000000000000000000000000000000"),
            None,
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["isManualAvailable"], true);
        assert_eq!(body["dateTriggerTimestamp"], 1_800_000_000u64);
        assert!(body.get("executor").is_none());
        assert!(body.get("inactiveMonthPeriod").is_none());
    }

    #[test_case(None, None ; "absent")]
    #[test_case(Some("0x0000000000000000000000000000000000000000"), None ; "zero address")]
    #[test_case(
        Some("0xd9be6af8cc9553ffa6402939befaa63108366a06"),
        Some("0xd9be6af8cc9553ffa6402939befaa63108366a06") ; "valid address"
    )]
    #[test_case(Some("executor.eth"), Some("executor.eth") ; "not an address")]
    #[test_case(Some("0x1234"), Some("0x1234") ; "too short")]
    fn test_meta_id_request_forwards_non_zero_executor(
        executor: Option<&str>,
        expected: Option<&str>,
    ) {
        let request = MetaIdRequest::new(vec![], 0, 1.0, executor, Some(3));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body.get("executor").and_then(Value::as_str), expected);
        assert_eq!(body["inactiveMonthPeriod"], 3);
    }

    #[test]
    fn test_backup_meta_update_serialization() {
        let update = BackupMetaUpdate::new("meta-1")
            .with_action(BackupMetaAction::InitiateRevocationProcess);
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["metaId"], "meta-1");
        assert_eq!(body["action"], "initiateRevocationProcess");
        assert!(body.get("restoreDateTimestamp").is_none());
    }

    #[test]
    fn test_meta_response_commitments() {
        let response: BackupMetaResponse = serde_json::from_value(json!({
            "email_hash": format!("0x{}", "ab".repeat(32)),
            "meta_id_encrypted": format!("0x{}", "cd".repeat(32)),
        }))
        .unwrap();

        let (email_hash, meta_id) = response.commitments().unwrap();
        assert_eq!(email_hash, B256::repeat_byte(0xab));
        assert_eq!(meta_id, B256::repeat_byte(0xcd));

        let short: BackupMetaResponse = serde_json::from_value(json!({
            "email_hash": "0xabcd",
            "meta_id_encrypted": "0x00",
        }))
        .unwrap();
        assert!(short.commitments().is_err());
    }

    #[test]
    fn test_meta_response_rejects_non_hex_email_hash() {
        let result = serde_json::from_value::<BackupMetaResponse>(json!({
            "email_hash": "not hex",
            "meta_id_encrypted": "x",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_receipt_status() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x1",
            "logs": []
        }))
        .unwrap();
        assert!(receipt.succeeded());
    }

    #[test]
    fn test_action_status_display() {
        assert_eq!(ActionStatus::Pending.to_string(), "pending");
        assert_eq!(ActionStatus::Completed.to_string(), "completed");
        assert_eq!(
            serde_json::to_string(&ActionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
