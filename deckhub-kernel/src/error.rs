use deckhub_contracts::{codes, ContractError};
use thiserror::Error;

use crate::registry::ConnectionId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {0} already registered")]
    DuplicateConnection(ConnectionId),
}

/// Rejets levés avant que l'intent n'atteigne l'executor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid intent: {0}")]
    InvalidIntent(String),
}

impl GatewayError {
    /// Code d'erreur renvoyé au client à l'origine de la requête
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidIntent(_) => codes::INVALID_INTENT,
        }
    }
}

/// Pannes de l'executor externe, toujours normalisées en feedback d'échec
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no action executor configured")]
    NotConfigured,

    #[error("executor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("executor rejected action (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("action failed: {0}")]
    ActionFailed(String),
}
