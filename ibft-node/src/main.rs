use std::sync::Arc;

use clap::Parser;
use ibft_consensus::Consensus;
use ibft_node::{
    api::{self, ApiState},
    beacon,
    broadcast::HttpBroadcaster,
    cli::Args,
    logging,
    worker::Worker,
    NodeConfig,
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tracing::{error, info};

const INBOX_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Config
    let args = Args::parse();
    let config = NodeConfig::resolve(&args)?;

    // 2. Logging
    logging::install_panic_hook(&config.label());
    let _guard = logging::init(&config.label());

    info!("--- INICIANDO NÓ IBFT ---");
    info!("Peers: {:?}", config.peers);
    info!("Identidade: {:?} | porta {}", config.node_identity, config.port);

    // 3. Consensus
    let strategy = match beacon::build_strategy(&config.value_source).await {
        Ok(s) => s,
        Err(e) => {
            error!("Falha ao obter valor de {:?}: {}", config.value_source, e);
            return Err(e.into());
        }
    };
    let broadcaster = Arc::new(HttpBroadcaster::new(config.peers.clone())?);
    let consensus = Consensus::new(config.consensus_config()?, strategy, broadcaster);

    // 4. HTTP intake -> worker
    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    let (status_tx, status_rx) = watch::channel(consensus.snapshot());

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let api_state = ApiState {
        inbox: inbox_tx,
        status: status_rx,
    };
    tokio::spawn(async move {
        if let Err(e) = api::serve(listener, api_state).await {
            error!("HTTP API parou: {}", e);
        }
    });

    let worker = tokio::spawn(Worker::new(consensus, inbox_rx, status_tx).run());
    info!("[*] Aguardando mensagens. Ctrl+C para sair.");

    tokio::select! {
        res = worker => match res {
            Ok(consensus) => info!("Worker encerrado: {:?}", consensus.snapshot()),
            Err(e) => error!("Worker falhou: {}", e),
        },
        _ = tokio::signal::ctrl_c() => info!("Interrompido"),
    }
    Ok(())
}
