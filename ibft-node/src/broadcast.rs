use std::time::Duration;

use ibft_common::Message;
use ibft_consensus::Broadcaster;
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::{NodeError, Result};

const PEER_TIMEOUT: Duration = Duration::from_secs(1);

/// POSTs every outbound message to `http://{peer}/messages` on all peers,
/// this node included. Each delivery is its own task; failures are logged.
pub struct HttpBroadcaster {
    client: Client,
    peers: Vec<String>,
    runtime: Handle,
}

impl HttpBroadcaster {
    /// Must be called from inside a Tokio runtime.
    pub fn new(peers: Vec<String>) -> Result<Self> {
        let client = Client::builder().timeout(PEER_TIMEOUT).build()?;
        let runtime = Handle::try_current().map_err(|e| NodeError::Config(format!("no Tokio runtime: {}", e)))?;
        Ok(Self { client, peers, runtime })
    }
}

impl Broadcaster for HttpBroadcaster {
    fn broadcast(&self, message: &Message) {
        for peer in &self.peers {
            let url = format!("http://{}/messages", peer);
            let client = self.client.clone();
            let message = message.clone();

            self.runtime.spawn(async move {
                debug!("Sending {} to {}", message, url);
                match client.post(&url).json(&message).send().await {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!("Falha no POST para {}: status {}", url, resp.status()),
                    Err(e) => warn!("Falha no POST para {}: {}", url, e),
                }
            });
        }
    }
}
