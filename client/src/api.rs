//! Tezoro backend API client.
//!
//! This module provides a client for the Tezoro REST API, which is used for
//! account management, backup metadata and owner actions relayed to backup
//! contracts.

use crate::config::ClientConfig;
use crate::error::{Result, TezoroError};
use crate::lifecycle::BackupState;
use crate::retry::RetryStrategy;
use crate::types::{
    AnalyticsRecord, ApiErrorBody, Backup, BackupMetaResponse, BackupMetaUpdate, CurrentFees,
    MetaIdRequest, SystemStatus, UserSession,
};
use alloy_primitives::Address;
use reqwest::{header::RETRY_AFTER, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Tezoro API client
#[derive(Clone)]
pub struct ApiClient {
    /// HTTP client
    client: Client,
    /// Base URL of the API
    base_url: Url,
    /// Bearer token
    token: Option<String>,
    /// Retry strategy
    retry_strategy: RetryStrategy,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TezoroError::NetworkError)?;

        let base_url = Url::parse(&config.api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TezoroError::ConfigError(format!(
                "API URL cannot be a base: {}",
                config.api_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: config.api_token.clone(),
            retry_strategy: RetryStrategy::from_config(&config),
        })
    }

    /// Replace the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the bearer token in place
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Bearer token in use, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(TezoroError::MissingToken)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute_once(
        &self,
        method: &Method,
        url: &Url,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(TezoroError::NetworkError)?;
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

        let text = response.text().await.map_err(TezoroError::NetworkError)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        let parsed = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.message);
        let message = match parsed {
            Some(message) => message,
            None if text.is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            None => text,
        };

        error!("API {} {} failed with {}: {}", method, url.path(), status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TezoroError::Unauthorized(message))
            }
            _ => Err(TezoroError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        authenticated: bool,
    ) -> Result<T> {
        let token = if authenticated {
            Some(self.require_token()?)
        } else {
            None
        };
        let url = self.endpoint(segments);

        debug!("API request: {} {}", method, url.path());

        let value = if method == Method::GET {
            self.retry_strategy
                .retry(|| self.execute_once(&method, &url, token, body.as_ref()))
                .await?
        } else {
            self.retry_strategy
                .retry_with_predicate(
                    || self.execute_once(&method, &url, token, body.as_ref()),
                    RetryStrategy::is_retryable_mutation,
                )
                .await?
        };

        Ok(serde_json::from_value(value)?)
    }

    /// Backend load indicator
    pub async fn get_system_status(&self) -> Result<SystemStatus> {
        self.request(Method::GET, &["system", "status"], None, false)
            .await
    }

    /// Record an analytics event for `email`
    pub async fn save_user_analytics(
        &self,
        email: &str,
        saw_page: Option<&str>,
        promocode: Option<&str>,
    ) -> Result<AnalyticsRecord> {
        let record = AnalyticsRecord {
            email: email.to_string(),
            saw_page: saw_page.map(str::to_string),
            promocode: promocode.map(str::to_string),
        };
        self.request(
            Method::POST,
            &["analytics", "save"],
            Some(serde_json::to_value(&record)?),
            true,
        )
        .await
    }

    /// Set a new password for the session's account
    pub async fn update_password(&self, password: &str) -> Result<Value> {
        let token = self.require_token()?;
        info!("Updating account password");
        self.request(
            Method::POST,
            &["user", "reset"],
            Some(json!({ "token": token, "password": password })),
            true,
        )
        .await
    }

    /// Request a password recovery email
    pub async fn send_email_for_recovery(&self, email: &str) -> Result<Value> {
        info!("Requesting recovery email");
        self.request(
            Method::POST,
            &["user", "recover"],
            Some(json!({ "email": email })),
            false,
        )
        .await
    }

    /// Report backup metadata or an owner action
    pub async fn send_backup_meta(&self, update: &BackupMetaUpdate) -> Result<BackupMetaUpdate> {
        info!("Sending backup meta for {}", update.meta_id);
        self.request(
            Method::POST,
            &["backupMeta"],
            Some(serde_json::to_value(update)?),
            true,
        )
        .await
    }

    /// Backups of the session's account
    pub async fn get_user_backups(&self) -> Result<Vec<Backup>> {
        let backups: Vec<Backup> = self
            .request(Method::GET, &["user", "backups"], None, true)
            .await?;
        debug!("Retrieved {} backups", backups.len());
        Ok(backups)
    }

    /// Backup record by id
    pub async fn get_backup_by_id(&self, id: &str) -> Result<Backup> {
        self.request(Method::GET, &["backup", id], None, true).await
    }

    /// Profile of the session's account
    pub async fn get_user_profile(&self) -> Result<UserSession> {
        self.request(Method::GET, &["user", "profile"], None, true)
            .await
    }

    /// Create an account
    pub async fn register(&self, email: &str, password: &str) -> Result<UserSession> {
        info!("Registering account");
        self.request(
            Method::POST,
            &["user"],
            Some(json!({ "email": email, "password": password })),
            false,
        )
        .await
    }

    /// Log in, returning the session token
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession> {
        info!("Logging in");
        self.request(
            Method::POST,
            &["user", "login"],
            Some(json!({ "email": email, "password": password })),
            false,
        )
        .await
    }

    /// Current deployment cost estimate
    pub async fn get_current_fees(&self) -> Result<CurrentFees> {
        self.request(Method::GET, &["currentFees"], None, false)
            .await
    }

    /// Ask the backend to call `changeState(state)` on a backup contract
    pub async fn change_state(&self, backup: Address, state: BackupState) -> Result<Value> {
        info!("Requesting state change of {} to {}", backup, state);
        self.request(
            Method::POST,
            &["writeContract"],
            Some(json!({
                "backupAddress": backup,
                "action": "changeState",
                "params": { "_state": state.code() },
            })),
            true,
        )
        .await
    }

    /// Start the restore waiting window
    pub async fn initiate_restore_process(&self, backup: Address) -> Result<Value> {
        self.change_state(backup, BackupState::RestoreInitiated)
            .await
    }

    /// Start the revocation waiting window
    pub async fn initiate_revocation_process(&self, backup: Address) -> Result<Value> {
        self.change_state(backup, BackupState::RevocationInitiated)
            .await
    }

    /// Cancel a pending restore
    pub async fn abort_restore_process(&self, backup: Address) -> Result<Value> {
        self.change_state(backup, BackupState::Initialized).await
    }

    /// Cancel a pending revocation
    pub async fn abort_revocation_process(&self, backup: Address) -> Result<Value> {
        self.change_state(backup, BackupState::Initialized).await
    }

    /// Finalize a restore
    pub async fn restore(&self, backup: Address) -> Result<Value> {
        self.change_state(backup, BackupState::Restored).await
    }

    /// Commitments for a new backup
    pub async fn get_meta_id(&self, request: &MetaIdRequest) -> Result<BackupMetaResponse> {
        info!(
            "Requesting backup commitments ({} beneficiaries)",
            request.beneficiaries.len()
        );
        self.request(
            Method::POST,
            &["backupMeta"],
            Some(serde_json::to_value(request)?),
            true,
        )
        .await
    }

    /// Message the owner signs before deploying
    pub async fn deploy_message(&self) -> Result<Value> {
        self.request(Method::GET, &["deployMessage"], None, true)
            .await
    }
}
