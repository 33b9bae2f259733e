use ibft_common::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("beacon {url} answered with status {status}")]
    Beacon { url: String, status: u16 },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
