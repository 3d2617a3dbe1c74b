//! Client DeckHub - côté panneau du protocole de broadcast
//!
//! - `synchronizer` : machine d'état du rendu de la grille, alimentée par les événements
//! - `commands` : commandes stdin du binaire headless
//! - `transport` : connexion WebSocket avec reconnexion à délai fixe

pub mod commands;
pub mod error;
pub mod synchronizer;
pub mod transport;

pub use commands::Command;
pub use error::ClientError;
pub use synchronizer::{ClientSynchronizer, ConnectionState, RenderedButton, PULSE_DURATION};
pub use transport::{Transport, TransportConfig};
