use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use ibft_common::Message;
use ibft_consensus::ConsensusSnapshot;
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Clone)]
pub struct ApiState {
    /// Single consumer: the worker.
    pub inbox: mpsc::Sender<Message>,
    pub status: watch::Receiver<ConsensusSnapshot>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/messages", get(hello).post(receive_message))
        .route("/status", get(status))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: ApiState) -> Result<()> {
    info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn hello() -> &'static str {
    "Hello from ibft-node!"
}

async fn receive_message(State(state): State<ApiState>, body: String) -> (StatusCode, &'static str) {
    let message = match Message::from_json(&body) {
        Ok(m) => m,
        Err(e) => {
            warn!("❌ Mensagem malformada recebida: {}", e);
            return (StatusCode::BAD_REQUEST, "invalid message");
        }
    };
    debug!("Received message: {}", message);

    if state.inbox.send(message).await.is_err() {
        warn!("Fila de mensagens fechada, descartando");
        return (StatusCode::SERVICE_UNAVAILABLE, "worker stopped");
    }
    (StatusCode::OK, "POST received")
}

async fn status(State(state): State<ApiState>) -> Json<ConsensusSnapshot> {
    Json(state.status.borrow().clone())
}
