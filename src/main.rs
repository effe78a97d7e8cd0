//! Arbiter oracle service entrypoint.

use arbiter::api::{ApiServer, AppState};
use arbiter::chain::{ChainGateway, EscrowContract, FallbackReader, RoomEnumerator, RpcClient};
use arbiter::config::OracleConfig;
use arbiter::game::{OutcomeSigner, SettlementExecutor, StateReconciler};
use arbiter::rewards::RewardsLedger;
use arbiter::store::{KvStore, MemoryStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "arbiter", about = "Outcome oracle and settlement service for escrowed duels")]
struct Args {
    /// Path to a TOML configuration file. Environment variables
    /// (ARBITER_*) override file values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbiter=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OracleConfig::from_file(path)?,
        None => OracleConfig::default(),
    };
    config.apply_env();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.validate()?;

    let contract_address = config.contract_address()?;
    let signer = OutcomeSigner::from_hex_key(&config.signer.signing_key)?;
    info!(oracle = %signer.address(), contract = %contract_address, "oracle identity loaded");

    let rpc = RpcClient::new(config.request_timeout());
    let reader = FallbackReader::new(
        config.chain.rpc_endpoints.clone(),
        config.chain.max_retries_per_endpoint,
        config.backoff_base(),
    );

    let escrow = Arc::new(EscrowContract::new(
        contract_address,
        config.chain.chain_id,
        rpc,
        reader,
        signer.signing_key().clone(),
        signer.address(),
        config.chain.gas_limit,
        config.chain.gas_price_fallback_wei as u128,
        config.confirm_timeout(),
        config.confirm_poll(),
    ));
    let gateway: Arc<dyn ChainGateway> = escrow;

    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());

    let executor = Arc::new(SettlementExecutor::new(
        gateway.clone(),
        store.clone(),
        signer,
        &config.signer.shared_secret,
        config.lock_ttl(),
    ));
    let enumerator = Arc::new(RoomEnumerator::new(
        gateway.clone(),
        config.enumeration.max_rooms,
        config.fetch_delay(),
    ));
    let reconciler = Arc::new(StateReconciler::new(gateway, store.clone()));
    let ledger = Arc::new(RewardsLedger::new(store));

    let state = Arc::new(AppState {
        executor,
        enumerator,
        reconciler,
        ledger,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    ApiServer::new(config.api.clone(), state).run().await
}
