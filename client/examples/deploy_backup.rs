//! Example: Deploy a backup contract
//!
//! Logs in to the backend, requests the backup commitments, builds the
//! deployment parameters and sends the deployment through a node that holds
//! the owner's account (for example a local dev node).
//!
//! Environment:
//! - `TEZORO_EMAIL`, `TEZORO_PASSWORD`: backend account
//! - `TEZORO_RPC_URL`: JSON-RPC node with an unlocked sender account
//! - `TEZORO_SENDER`: owner address
//! - `TEZORO_TOKEN_ADDRESS`: token to back up
//! - `TEZORO_BENEFICIARY`: single beneficiary receiving 100%

use anyhow::Context;
use std::sync::Arc;
use tezoro_client::address::parse_address;
use tezoro_client::deploy::{Beneficiary, DeployData};
use tezoro_client::types::{BackupBeneficiary, MetaIdRequest};
use tezoro_client::{ClientConfig, MonitorResult, MonitorOptions, SubmitOptions, TezoroClient};

/// Service fee base before discounts (0.01 ETH)
const SERVICE_FEE_BASE_WEI: u128 = 10_000_000_000_000_000;

fn env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} is not set", name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tezoro_client::init_tracing();

    println!("=== Backup Deployment Example ===\n");

    let config = ClientConfig::custom(env("TEZORO_RPC_URL")?, 11_155_111)?;
    let client = TezoroClient::new(Arc::new(config))?;
    client.health_check().await?;

    let session = client
        .api()
        .login(&env("TEZORO_EMAIL")?, &env("TEZORO_PASSWORD")?)
        .await?;
    let client = client.with_token(session.token);
    println!("✓ Logged in as {}\n", session.data.email);

    let sender = parse_address(&env("TEZORO_SENDER")?)?;
    let token_address = parse_address(&env("TEZORO_TOKEN_ADDRESS")?)?;
    let beneficiary = env("TEZORO_BENEFICIARY")?;

    let status = client.api().get_system_status().await?;
    if status.is_high_load {
        println!("! Backend reports high load, deployment may be slow\n");
    }

    let launch_date = chrono::Utc::now().timestamp() as u64 + 365 * 24 * 60 * 60;
    let request = MetaIdRequest::new(
        vec![BackupBeneficiary {
            address: Some(beneficiary.clone()),
            percent: Some(100.0),
        }],
        launch_date,
        1.0,
        None,
        None,
    );
    let meta = client.api().get_meta_id(&request).await?;
    let (email_hash, meta_id_encrypted) = meta.commitments()?;

    let data = DeployData {
        executor: None,
        beneficiaries: vec![Beneficiary::parse(&beneficiary, 100.0)?],
        token_address,
        launch_date,
        discounts: None,
        inactive_period: None,
        email_hash,
        meta_id_encrypted,
    };
    let params = client.prepare_deployment(&data, SERVICE_FEE_BASE_WEI)?;
    println!("Service fee: {} wei", params.value);

    let tx_hash = client
        .deploy_backup(sender, &params, SubmitOptions::default())
        .await?;
    println!("✓ Deployment sent: {}\n", tx_hash);

    let options = MonitorOptions::from_config(client.config()).with_timeout(300);
    match client.monitor_transaction(tx_hash, options).await? {
        MonitorResult::Confirmed(receipt) => {
            println!("✓ Confirmed in block {:?}", receipt.block_number);
            let backup = client.get_backup_address_by_tx_hash(tx_hash).await?;
            println!("  - Backup contract: {}", backup);
        }
        MonitorResult::Reverted(_) => println!("✗ Deployment reverted"),
        MonitorResult::Timeout => println!("✗ Timed out waiting for the receipt"),
    }

    Ok(())
}
