//! Backup contract state reads.

use crate::abi::{self, getters};
use crate::error::Result;
use crate::lifecycle::{derive_backup_view, BackupView, RawBackupState};
use crate::rpc::{CallRequest, EvmRpcClient};
use alloy_primitives::Address;
use async_trait::async_trait;
use ethers::abi::Token;
use tracing::debug;

/// Source of raw backup contract state
#[async_trait]
pub trait BackupStateReader: Send + Sync {
    /// Read the six state getters of a backup contract
    async fn read_backup_state(&self, backup: Address) -> Result<RawBackupState>;
}

impl EvmRpcClient {
    async fn call_getter(&self, backup: Address, name: &str) -> Result<Token> {
        let getter = abi::backup_function(name)?;
        let data = abi::encode_call(getter, &[])?;
        let output = self.call(&CallRequest::new(backup, data)).await?;
        abi::single_token(abi::decode_output(getter, &output)?)
    }
}

#[async_trait]
impl BackupStateReader for EvmRpcClient {
    async fn read_backup_state(&self, backup: Address) -> Result<RawBackupState> {
        debug!("Reading backup state of {}", backup);

        let (state, timestamp, delay, init_timestamp, owner, token_address) = futures::try_join!(
            self.call_getter(backup, getters::STATE),
            self.call_getter(backup, getters::TIMESTAMP),
            self.call_getter(backup, getters::DELAY),
            self.call_getter(backup, getters::INIT_TIMESTAMP),
            self.call_getter(backup, getters::OWNER),
            self.call_getter(backup, getters::TOKEN_ADDRESS),
        )?;

        Ok(RawBackupState {
            state: abi::token_to_state_code(&state)?,
            timestamp: abi::token_to_u64(&timestamp)?,
            delay: abi::token_to_u64(&delay)?,
            init_timestamp: abi::token_to_u64(&init_timestamp)?,
            owner: abi::token_to_address(&owner)?,
            token_address: abi::token_to_address(&token_address)?,
        })
    }
}

/// Read a backup contract and derive its view at `now` (unix seconds)
pub async fn get_backup_info_by_address<R>(
    reader: &R,
    backup: Address,
    now: u64,
) -> Result<BackupView>
where
    R: BackupStateReader + ?Sized,
{
    let raw = reader.read_backup_state(backup).await?;
    derive_backup_view(&raw, now)
}
