//! Contrats DeckHub - types du protocole partagés par le kernel et ses clients
//!
//! - Configuration du deck : pages, table des boutons, layouts
//! - Événements temps réel : frames broadcast, contrôle et client

pub mod deck;
pub mod error;
pub mod events;

pub use deck::{
    default_pages, validate_pages, ActionKind, ButtonConfig, ButtonId, ButtonTable, Layout,
    MetricKey, Page,
};
pub use error::ContractError;
pub use events::{
    codes, ActionIntent, BroadcastEvent, ButtonPressed, ClientMessage, ConnectedMessage,
    ControlMessage, ErrorMessage, FeedbackEvent, FeedbackStatus, PressRequest, ServerMessage,
    TelemetrySample,
};
