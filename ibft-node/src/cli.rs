use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Where the proposed value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueSourceKind {
    /// `2 * round`, any even integer is valid.
    Even,
    /// Randomness of a drand beacon round.
    Drand,
    /// Block root of an Ethereum beacon chain slot, via Lighthouse.
    Lighthouse,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Nó IBFT: recebe mensagens em /messages e executa o consenso")]
pub struct Args {
    /// Comma-separated `host:port` of every node, in node-index order
    #[arg(short = 'n', long, default_value = "localhost:9000", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Index of this node; negative runs an observer
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub node_identity: i64,

    /// Weight of a Byzantine quorum (default: floor(2W/3) + 1)
    #[arg(short = 'b', long)]
    pub byz_quorum: Option<u64>,

    /// Weight of the ROUND_CHANGE threshold (default: floor(W/3) + 1)
    #[arg(long)]
    pub rc_threshold: Option<u64>,

    /// Round duration in seconds
    #[arg(long, default_value_t = 1)]
    pub round_duration: u64,

    /// Protocol start as UNIX timestamp (default: now + 2s)
    #[arg(long)]
    pub start_time: Option<i64>,

    /// Port of the HTTP server
    #[arg(short = 'p', long, default_value_t = 9000)]
    pub port: u16,

    /// JSON config file. Loaded if it exists, written from these flags otherwise
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ValueSourceKind::Even)]
    pub value_source: ValueSourceKind,

    #[arg(long, default_value = "https://drand.cloudflare.com/public")]
    pub drand_api: String,

    #[arg(long, default_value_t = 1)]
    pub drand_round: u64,

    #[arg(long, default_value = "http://localhost:5052")]
    pub lighthouse_api: String,

    #[arg(long, default_value_t = 1)]
    pub eth2_slot: u64,
}
