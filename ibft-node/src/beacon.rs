//! External value sources for the proposal hook.
//!
//! Each node fetches the value once at startup and then proposes/accepts
//! exactly that value through [`FixedValue`].

use std::{sync::Arc, time::Duration};

use ibft_consensus::{EvenValue, FixedValue, ValueStrategy};
use reqwest::{header::ACCEPT, Client, Response};
use serde::Deserialize;
use tracing::info;

use crate::{
    config::ValueSource,
    error::{NodeError, Result},
};

const BEACON_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct DrandBeacon {
    randomness: String,
}

#[derive(Debug, Deserialize)]
struct BeaconBlock {
    root: String,
}

/// `randomness` of drand round `round`.
pub async fn drand_value(client: &Client, api: &str, round: u64) -> Result<String> {
    let url = format!("{}/{}", api.trim_end_matches('/'), round);
    let resp = checked(client.get(&url).timeout(BEACON_TIMEOUT).send().await?, &url)?;
    let beacon: DrandBeacon = resp.json().await?;
    Ok(beacon.randomness)
}

/// `slot{N}:{root}` for the beacon block at `slot`.
pub async fn lighthouse_value(client: &Client, api: &str, slot: u64) -> Result<String> {
    let url = format!("{}/beacon/block", api.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .query(&[("slot", slot)])
        .header(ACCEPT, "application/json")
        .timeout(BEACON_TIMEOUT)
        .send()
        .await?;
    let block: BeaconBlock = checked(resp, &url)?.json().await?;
    Ok(format!("slot{}:{}", slot, block.root))
}

fn checked(resp: Response, url: &str) -> Result<Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(NodeError::Beacon {
            url: url.to_string(),
            status: resp.status().as_u16(),
        })
    }
}

pub async fn build_strategy(source: &ValueSource) -> Result<Arc<dyn ValueStrategy>> {
    let client = Client::new();
    let strategy: Arc<dyn ValueStrategy> = match source {
        ValueSource::Even => Arc::new(EvenValue),
        ValueSource::Drand { api, round } => {
            let value = drand_value(&client, api, *round).await?;
            info!("🎲 drand round {}: {}", round, value);
            Arc::new(FixedValue::new(value))
        }
        ValueSource::Lighthouse { api, slot } => {
            let value = lighthouse_value(&client, api, *slot).await?;
            info!("🔦 beacon block: {}", value);
            Arc::new(FixedValue::new(value))
        }
    };
    Ok(strategy)
}
