pub mod api;
pub mod beacon;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod timer;
pub mod worker;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
