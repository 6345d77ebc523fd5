// Path: crates/node/src/main.rs
#![forbid(unsafe_code)]

//! # REVID Node
//!
//! Wires the gateway together from environment configuration: storage,
//! chain client, orchestration core, event ingestion, and the HTTP surface.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use revid_api::chain::CommitmentChainClient;
use revid_api::storage::MetadataStore;
use revid_chain::{HttpBridgeClient, InProcessChain};
use revid_contract::{CommitmentContract, MultisigAuthority, MultisigManager};
use revid_crypto::accumulator::{RsaParams, Trapdoor};
use revid_gateway::{GatewayConfig, IdentityGateway};
use revid_storage::RedbDeviceStore;
use revid_types::config::{ChainMode, NodeConfig};
use revid_types::keys;

#[derive(Parser, Debug)]
#[clap(
    name = "revid-node",
    version,
    about = "REVID device-identity gateway node"
)]
struct Opts {
    /// Override REVID_DB_PATH.
    #[clap(long)]
    db_path: Option<String>,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("REVID_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// The in-process chain used when `REVID_CHAIN_MODE=inprocess`: a dev-mode
/// contract with a placeholder authority. Nothing about it is secret.
fn dev_chain(params: &RsaParams) -> Result<InProcessChain> {
    const DEV_AUTHORITY: [u8; 20] = [0xaa; 20];
    let manager = MultisigManager::new(
        MultisigAuthority {
            address: DEV_AUTHORITY,
            owners: vec![[0x01; 20], [0x02; 20], [0x03; 20]],
            threshold: 2,
        },
        [0xad; 20],
        31_337,
        [0xcd; 20],
    )
    .map_err(|e| anyhow!("dev multisig: {e}"))?;
    let genesis = params
        .encode_element(params.generator())
        .map_err(|e| anyhow!("genesis root: {e}"))?;
    let contract = CommitmentContract::new(genesis, manager, 0)
        .map_err(|e| anyhow!("dev contract: {e}"))?;
    Ok(InProcessChain::new(contract, DEV_AUTHORITY))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let opts = Opts::parse();

    let mut config = NodeConfig::from_env().context("loading configuration")?;
    if let Some(db_path) = opts.db_path {
        config.db_path = db_path;
    }

    let params = RsaParams::from_hex(
        &config.params.modulus_hex,
        &config.params.generator_hex,
    )
    .map_err(|e| anyhow!("RSA parameters: {e}"))?;
    let trapdoor =
        Trapdoor::from_hex(&config.params.trapdoor_hex).map_err(|e| anyhow!("trapdoor: {e}"))?;

    if let Some(parent) = Path::new(&config.db_path).parent() {
        fs::create_dir_all(parent)?;
    }
    let store = Arc::new(RedbDeviceStore::open(&config.db_path).map_err(|e| anyhow!("{e}"))?);

    let chain: Arc<dyn CommitmentChainClient> = match config.chain.mode {
        ChainMode::Bridge => {
            tracing::info!(
                target: "node",
                url = %config.chain.rpc_url,
                contract = %config.chain.contract_address,
                "using chain bridge"
            );
            Arc::new(
                HttpBridgeClient::new(
                    config.chain.rpc_url.clone(),
                    Duration::from_millis(config.chain.rpc_timeout_ms),
                )
                .map_err(|e| anyhow!("bridge client: {e}"))?,
            )
        }
        ChainMode::InProcess => {
            tracing::warn!(
                target: "node",
                "running with an in-process chain; commitments are not durable"
            );
            Arc::new(dev_chain(&params)?)
        }
    };

    let gateway = Arc::new(
        IdentityGateway::new(
            params,
            trapdoor,
            store.clone(),
            store.clone(),
            chain,
            GatewayConfig {
                nonce_ttl_seconds: config.auth.nonce_ttl_seconds,
            },
        )
        .await
        .map_err(|e| anyhow!("gateway init: {e}"))?,
    );

    if config.dev_persist_trapdoor {
        tracing::warn!(target: "node", "dev mode: mirroring the trapdoor into metadata");
        store
            .put_meta(keys::META_TRAPDOOR_HEX, &config.params.trapdoor_hex)
            .await
            .map_err(|e| anyhow!("{e}"))?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingest_gateway = gateway.clone();
    let ingest_rx = shutdown_rx.clone();
    let poll = Duration::from_millis(config.chain.event_poll_interval_ms);
    let ingest_task = tokio::spawn(async move {
        ingest_gateway.run_event_ingestion(poll, ingest_rx).await;
    });

    let http_config = http_api_gateway::HttpConfig {
        listen_addr: config.server.listen_addr.clone(),
        body_limit_kb: config.server.body_limit_kb,
        ip_per_minute: config.limits.ip_per_minute,
        device_per_5_minutes: config.limits.device_per_5_minutes,
        admin_secret: config.admin_secret.clone(),
    };
    let server_task = tokio::spawn(http_api_gateway::run_server(
        http_config,
        gateway,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!(target: "node", "shutdown signal received");
    shutdown_tx.send(true).ok();

    ingest_task.await.ok();
    if let Ok(Err(e)) = server_task.await {
        tracing::error!(target: "node", error = %e, "server exited with error");
    }
    tracing::info!(target: "node", "bye");
    Ok(())
}
