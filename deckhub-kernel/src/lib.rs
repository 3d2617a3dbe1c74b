//! DeckHub kernel - coordinateur temps réel des panneaux de boutons
//!
//! Registry des connexions, broadcast FIFO par connexion, gateway d'actions
//! avec timeout, publication périodique de la télémétrie, API HTTP + WebSocket.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http;
pub mod registry;
pub mod telemetry;
pub mod ws;

#[cfg(test)]
mod test_support;

pub use config::{load_config, KernelConfig};
pub use coordinator::{BroadcastCoordinator, PublishReport};
pub use error::{ConfigError, ExecutorError, GatewayError, RegistryError};
pub use gateway::{ActionExecutor, ActionGateway, HttpActionExecutor};
pub use health::HealthTracker;
pub use http::{build_router, AppState};
pub use registry::{Connection, ConnectionId, ConnectionRegistry};
pub use telemetry::{MetricsSource, SysinfoSampler, TelemetryPublisher};
