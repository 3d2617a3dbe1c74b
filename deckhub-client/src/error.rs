use thiserror::Error;

use crate::synchronizer::ConnectionState;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid connection transition {from:?} -> {to:?}")]
    InvalidTransition { from: ConnectionState, to: ConnectionState },

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("undecodable server frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Contract(#[from] deckhub_contracts::ContractError),

    #[error("unknown command '{0}' (press R C | layout RxC | page ID | show | quit)")]
    UnknownCommand(String),

    #[error("bad {what} '{value}'")]
    BadArgument { what: &'static str, value: String },
}
