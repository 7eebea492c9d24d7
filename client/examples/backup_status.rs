//! Example: Inspect a backup contract
//!
//! Reads the on-chain state of a backup contract and prints the derived
//! lifecycle view. Optionally follows an owner action transaction.
//!
//! ```text
//! cargo run --example backup_status -- <backup-address> [action-tx-hash]
//! ```

use anyhow::{bail, Context};
use std::sync::Arc;
use tezoro_client::{BackupPhase, ClientConfig, TezoroClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("tezoro_client=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let Some(backup) = args.next() else {
        bail!("usage: backup_status <backup-address> [action-tx-hash]");
    };
    let backup = tezoro_client::address::parse_address(&backup)?;

    let config = match std::env::var("TEZORO_RPC_URL") {
        Ok(rpc_url) => ClientConfig::custom(rpc_url, 11_155_111)?,
        Err(_) => ClientConfig::sepolia(),
    };
    let client = TezoroClient::new(Arc::new(config))?;
    client
        .health_check()
        .await
        .context("RPC node is not reachable")?;

    let view = client.get_backup_info_by_address(backup).await?;
    println!("=== Backup {} ===\n", backup);
    println!("  - State:   {}", view.state);
    println!("  - Owner:   {}", view.from);
    println!("  - Token:   {}", view.token_address);
    println!("  - Created: {}", view.created_at);
    println!("  - Delay:   {}s", view.restore_delay_seconds);

    match view.phase() {
        BackupPhase::NeverStarted => println!("\nNo action pending"),
        BackupPhase::RestorePath => println!(
            "\nRestore initiated at {}",
            view.restore_initiated_timestamp
        ),
        BackupPhase::RevocationPath => println!(
            "\nRevocation initiated at {}, effective at {}",
            view.revocation_initiated_timestamp, view.revocation_timestamp
        ),
        BackupPhase::Terminal => println!("\nBackup is closed"),
    }
    println!("Active: {}", view.is_active);

    if let Some(tx_hash) = args.next() {
        let tx_hash = tx_hash.parse().context("invalid transaction hash")?;
        let action = client.get_action_state_by_tx_hash(tx_hash).await?;
        println!("\nAction {:?} is {}", action.action, action.status);
    }

    Ok(())
}
