use std::{fs, io, path::Path, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use ibft_common::{NodeIndex, NodeInfo, NodeRegistry, Weight};
use ibft_consensus::{ConsensusConfig, LeaderPolicy, PreparedPairCheck, QuorumPolicy};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    cli::{Args, ValueSourceKind},
    error::{NodeError, Result},
};

/// Seconds between process start and protocol start when none is given.
const DEFAULT_START_DELAY_SECS: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValueSource {
    #[default]
    Even,
    Drand { api: String, round: u64 },
    Lighthouse { api: String, slot: u64 },
}

/// Settings of one node process, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// `host:port` of every node; the position is the node index.
    pub peers: Vec<String>,
    /// Per-node weights in peer order; all 1 when absent.
    #[serde(default)]
    pub weights: Option<Vec<Weight>>,
    pub node_identity: Option<NodeIndex>,
    #[serde(default)]
    pub quorum: QuorumPolicy,
    pub round_duration_secs: u64,
    /// UNIX seconds.
    pub start_time: i64,
    pub port: u16,
    #[serde(default)]
    pub value_source: ValueSource,
    #[serde(default)]
    pub leader_policy: LeaderPolicy,
    #[serde(default)]
    pub prepared_pair_check: PreparedPairCheck,
    #[serde(default = "default_true")]
    pub reconsider_buffered: bool,
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    pub fn from_args(args: &Args) -> Self {
        let value_source = match args.value_source {
            ValueSourceKind::Even => ValueSource::Even,
            ValueSourceKind::Drand => ValueSource::Drand {
                api: args.drand_api.clone(),
                round: args.drand_round,
            },
            ValueSourceKind::Lighthouse => ValueSource::Lighthouse {
                api: args.lighthouse_api.clone(),
                slot: args.eth2_slot,
            },
        };

        Self {
            peers: args.nodes.clone(),
            weights: None,
            node_identity: u64::try_from(args.node_identity).ok(),
            quorum: QuorumPolicy {
                byzantine_quorum: args.byz_quorum,
                round_change_threshold: args.rc_threshold,
            },
            round_duration_secs: args.round_duration,
            start_time: args
                .start_time
                .unwrap_or_else(|| Utc::now().timestamp() + DEFAULT_START_DELAY_SECS),
            port: args.port,
            value_source,
            leader_policy: LeaderPolicy::default(),
            prepared_pair_check: PreparedPairCheck::default(),
            reconsider_buffered: true,
        }
    }

    /// Uses `--config` when it points to an existing file; otherwise builds
    /// the config from the flags and, if a path was given, saves it there.
    pub fn resolve(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) if path.exists() => {
                info!("📄 Carregando config de {}", path.display());
                Self::load_from_file(path)?
            }
            Some(path) => {
                let config = Self::from_args(args);
                info!("⚠️ Config não encontrada. Gerando em {}...", path.display());
                config.save_to_file(path)?;
                config
            }
            None => Self::from_args(args),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(NodeError::Config("lista de peers vazia".into()));
        }
        if let Some(weights) = &self.weights {
            if weights.len() != self.peers.len() {
                return Err(NodeError::Config(format!(
                    "{} weights for {} peers",
                    weights.len(),
                    self.peers.len()
                )));
            }
        }
        if let Some(id) = self.node_identity {
            if id >= self.peers.len() as u64 {
                return Err(NodeError::Config(format!(
                    "node_identity {} fora do intervalo 0..{}",
                    id,
                    self.peers.len()
                )));
            }
        }
        if self.round_duration_secs == 0 {
            return Err(NodeError::Config("round_duration must be at least 1s".into()));
        }
        Ok(())
    }

    pub fn registry(&self) -> Result<NodeRegistry> {
        self.validate()?;
        let nodes = (0..self.peers.len()).map(|i| {
            let weight = self.weights.as_ref().map_or(1, |w| w[i]);
            NodeInfo::new(i as NodeIndex, weight, Vec::new())
        });
        Ok(NodeRegistry::new(nodes.collect::<std::result::Result<Vec<_>, _>>()?)?)
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_opt(self.start_time, 0)
            .single()
            .ok_or_else(|| NodeError::Config(format!("start_time inválido: {}", self.start_time)))
    }

    pub fn consensus_config(&self) -> Result<ConsensusConfig> {
        Ok(ConsensusConfig::new(self.registry()?, self.node_identity)
            .with_quorum(self.quorum.clone())
            .with_timing(self.start_time()?, Duration::from_secs(self.round_duration_secs))
            .with_leader_policy(self.leader_policy)
            .with_prepared_pair_check(self.prepared_pair_check)
            .with_reconsider_buffered(self.reconsider_buffered))
    }

    /// Label used in log file names.
    pub fn label(&self) -> String {
        match self.node_identity {
            Some(id) => format!("node{}", id),
            None => "observer".to_string(),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let parsed =
            serde_json::from_str::<NodeConfig>(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(parsed)
    }
}
