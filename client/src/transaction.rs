//! Transaction management and submission.
//!
//! This module submits deployment transactions to the Tezoro service contract
//! and decodes owner actions sent to backup contracts.

use crate::abi::{self, Selector};
use crate::config::ClientConfig;
use crate::deploy::DeploymentParams;
use crate::error::{Result, TezoroError};
use crate::lifecycle::BackupState;
use crate::rpc::{CallRequest, EvmRpcClient};
use crate::types::{ActionState, ActionStatus, BackupAction, TransactionHash};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

/// Transaction builder and submitter
#[derive(Clone)]
pub struct TransactionManager {
    /// JSON-RPC client
    rpc: EvmRpcClient,
    /// Configuration
    config: Arc<ClientConfig>,
}

/// Transaction submission options
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Whether to simulate with `eth_call` before sending
    pub simulate_first: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            simulate_first: true,
        }
    }
}

impl SubmitOptions {
    /// Send without a pre-flight simulation
    pub fn without_simulation() -> Self {
        Self {
            simulate_first: false,
        }
    }
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let rpc = EvmRpcClient::new(config.clone())?;
        Ok(Self::with_rpc(rpc, config))
    }

    /// Create a transaction manager sharing an existing RPC client
    pub fn with_rpc(rpc: EvmRpcClient, config: Arc<ClientConfig>) -> Self {
        Self { rpc, config }
    }

    async fn submit(&self, request: CallRequest, options: &SubmitOptions) -> Result<TransactionHash> {
        if options.simulate_first {
            debug!("Simulating transaction before submission");
            self.rpc.simulate(&request).await?;
            debug!("Simulation successful");
        }

        self.rpc.send_transaction(&request).await
    }

    /// Deploy a backup contract through `service_contract`
    pub async fn deploy_backup(
        &self,
        from: Address,
        service_contract: Address,
        params: &DeploymentParams,
        options: SubmitOptions,
    ) -> Result<TransactionHash> {
        info!(
            "Deploying backup for {} via {} (fee: {} wei)",
            from, service_contract, params.value
        );

        let request = CallRequest::new(service_contract, params.calldata()?)
            .from(from)
            .value(params.value);

        self.submit(request, &options).await
    }

    /// Deploy a backup contract through the configured service contract
    pub async fn deploy_backup_default(
        &self,
        from: Address,
        params: &DeploymentParams,
        options: SubmitOptions,
    ) -> Result<TransactionHash> {
        self.deploy_backup(from, self.config.service_contract_address, params, options)
            .await
    }

    /// Send `changeState(target)` to a backup contract directly
    pub async fn send_change_state(
        &self,
        from: Address,
        backup: Address,
        target: BackupState,
        options: SubmitOptions,
    ) -> Result<TransactionHash> {
        info!("Changing state of {} to {}", backup, target);

        let data = abi::encode_call(
            abi::backup_function(abi::CHANGE_STATE)?,
            &[abi::uint_token(U256::from(target.code()))],
        )?;
        self.submit(CallRequest::new(backup, data).from(from), &options)
            .await
    }

    /// Status and decoded call of an owner action transaction
    pub async fn get_action_state_by_tx_hash(
        &self,
        tx_hash: TransactionHash,
    ) -> Result<ActionState> {
        debug!("Fetching action state: {}", tx_hash);

        let transaction = self
            .rpc
            .get_transaction(tx_hash)
            .await?
            .ok_or_else(|| TezoroError::TransactionNotFound(tx_hash.to_string()))?;

        let status = match transaction.block_number()? {
            Some(_) => ActionStatus::Completed,
            None => ActionStatus::Pending,
        };
        let action = decode_action(&transaction.input)?;

        debug!("Action {:?} is {}", action, status);
        Ok(ActionState { status, action })
    }
}

/// Decode a backup contract call from transaction input
pub fn decode_action(input: &[u8]) -> Result<BackupAction> {
    if input.len() < 4 {
        return Err(TezoroError::InvalidResponse(format!(
            "Transaction input of {} bytes has no selector",
            input.len()
        )));
    }

    let selector = Selector::from_slice(&input[..4]);
    let change_state = abi::backup_function(abi::CHANGE_STATE)?;
    if selector != abi::selector(change_state) {
        return Ok(BackupAction::Unknown(selector));
    }

    let target = abi::single_token(abi::decode_call(change_state, input)?)?;
    let state = BackupState::try_from(abi::token_to_state_code(&target)?)?;
    Ok(BackupAction::ChangeState(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn change_state_input(code: U256) -> Vec<u8> {
        let function = abi::backup_function(abi::CHANGE_STATE).unwrap();
        abi::encode_call(function, &[abi::uint_token(code)])
            .unwrap()
            .to_vec()
    }

    fn create_test_config() -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::sepolia()
                .with_request_timeout(Duration::from_secs(10))
                .with_max_retries(1),
        )
    }

    #[test]
    fn test_transaction_manager_creation() {
        assert!(TransactionManager::new(create_test_config()).is_ok());
    }

    #[test]
    fn test_submit_options_default() {
        assert!(SubmitOptions::default().simulate_first);
        assert!(!SubmitOptions::without_simulation().simulate_first);
    }

    #[test]
    fn test_decode_change_state() {
        let input = change_state_input(U256::from(2u8));
        assert_eq!(
            decode_action(&input).unwrap(),
            BackupAction::ChangeState(BackupState::RevocationInitiated)
        );
    }

    #[test]
    fn test_decode_unknown_selector() {
        // transfer(address,uint256)
        let input = [0xa9, 0x05, 0x9c, 0xbb];
        assert_matches!(
            decode_action(&input),
            Ok(BackupAction::Unknown(selector)) if selector.as_slice() == input
        );
    }

    #[test]
    fn test_decode_invalid_input() {
        assert_matches!(decode_action(&[0x01, 0x02]), Err(TezoroError::InvalidResponse(_)));

        let input = change_state_input(U256::from(7u8));
        assert_matches!(decode_action(&input), Err(TezoroError::UnknownBackupState(7)));

        let input = change_state_input(U256::from(256u64));
        assert_matches!(decode_action(&input), Err(TezoroError::UnknownBackupState(256)));

        let truncated = &change_state_input(U256::ZERO)[..4];
        assert_matches!(decode_action(truncated), Err(TezoroError::InvalidResponse(_)));
    }
}
