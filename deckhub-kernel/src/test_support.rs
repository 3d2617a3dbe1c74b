//! Fixtures partagées des tests unitaires du kernel

use async_trait::async_trait;
use deckhub_contracts::{default_pages, ActionIntent, ButtonTable, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::coordinator::BroadcastCoordinator;
use crate::error::ExecutorError;
use crate::gateway::{ActionExecutor, ActionGateway};
use crate::health::HealthTracker;
use crate::http::AppState;

/// Réussit immédiatement avec `ran <payload>`
pub struct EchoExecutor;

#[async_trait]
impl ActionExecutor for EchoExecutor {
    async fn execute(&self, intent: &ActionIntent) -> Result<String, ExecutorError> {
        Ok(format!("ran {}", intent.action_payload))
    }
}

pub fn app_state() -> AppState {
    let coordinator = Arc::new(BroadcastCoordinator::new(32, true));
    let gateway = ActionGateway::new(Arc::new(EchoExecutor), coordinator.clone(), Duration::from_secs(1));
    AppState {
        coordinator,
        gateway: Arc::new(gateway),
        health_tracker: HealthTracker::new(),
        pages: Arc::new(default_pages()),
        buttons: Arc::new(ButtonTable::default()),
    }
}

pub fn recv_frames(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut frames = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        frames.push(msg);
    }
    frames
}
