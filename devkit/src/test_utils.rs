/*!
Test Harness pour le kernel DeckHub

Facilite l'écriture de tests avec:
- Setup automatique coordinator + gateway + executor mock
- Sondes (`Probe`) branchées directement sur le coordinator
- Serveur HTTP/WS réel sur port éphémère pour les tests bout en bout
*/

use anyhow::{bail, Context, Result};
use deckhub_contracts::{default_pages, BroadcastEvent, ButtonTable, ControlMessage, ServerMessage};
use deckhub_kernel::{
    build_router, ActionGateway, AppState, BroadcastCoordinator, ConnectionId, HealthTracker,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::info;

use crate::executor_stub::MockExecutor;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Init logging pour tests (idempotent)
pub fn init_test_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Harness de test complet : un kernel en mémoire
pub struct TestHarness {
    pub coordinator: Arc<BroadcastCoordinator>,
    pub gateway: Arc<ActionGateway>,
    pub executor: MockExecutor,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_executor(MockExecutor::new(), Duration::from_secs(2))
    }

    pub fn with_executor(executor: MockExecutor, action_timeout: Duration) -> Self {
        Self::build(executor, action_timeout, 64, true)
    }

    /// Contrôle fin : taille des outbox et rattrapage télémétrie
    pub fn build(
        executor: MockExecutor,
        action_timeout: Duration,
        outbox_capacity: usize,
        catch_up_telemetry: bool,
    ) -> Self {
        init_test_logging();
        let coordinator = Arc::new(BroadcastCoordinator::new(outbox_capacity, catch_up_telemetry));
        let gateway = Arc::new(ActionGateway::new(
            Arc::new(executor.clone()),
            coordinator.clone(),
            action_timeout,
        ));
        Self { coordinator, gateway, executor }
    }

    /// Nouvelle connexion ; la frame `connected` est consommée
    pub async fn probe(&self) -> Result<Probe> {
        let (id, rx) = self.coordinator.connect()?;
        let mut probe = Probe { id, rx };
        match probe.next().await? {
            ServerMessage::Control(ControlMessage::Connected(_)) => Ok(probe),
            other => bail!("expected connected frame, got {other:?}"),
        }
    }

    /// Connexion brute, sans consommer la frame `connected`
    pub fn raw_probe(&self) -> Result<Probe> {
        let (id, rx) = self.coordinator.connect()?;
        Ok(Probe { id, rx })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            coordinator: self.coordinator.clone(),
            gateway: self.gateway.clone(),
            health_tracker: HealthTracker::new(),
            pages: Arc::new(default_pages()),
            buttons: Arc::new(ButtonTable::default()),
        }
    }

    /// Lance le routeur complet sur 127.0.0.1:<port libre>
    pub async fn serve(&self) -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = build_router(self.app_state());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        info!("test kernel listening on {addr}");
        Ok(addr)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Vue d'une connexion : ce que le client recevrait, dans l'ordre
pub struct Probe {
    pub id: ConnectionId,
    rx: mpsc::Receiver<ServerMessage>,
}

impl Probe {
    pub async fn next(&mut self) -> Result<ServerMessage> {
        timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .context("timed out waiting for a frame")?
            .context("connection outbox closed")
    }

    pub async fn next_event(&mut self) -> Result<BroadcastEvent> {
        match self.next().await? {
            ServerMessage::Event(event) => Ok(event),
            other => bail!("expected broadcast event, got {other:?}"),
        }
    }

    /// Tout ce qui est déjà en file, sans attendre
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            frames.push(msg);
        }
        frames
    }

    /// Événements broadcast en file, contrôles ignorés
    pub fn drain_events(&mut self) -> Vec<BroadcastEvent> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::Event(event) => Some(event),
                ServerMessage::Control(_) => None,
            })
            .collect()
    }

    /// Vérifie qu'aucune frame n'arrive pendant `window`
    pub async fn assert_silent(&mut self, window: Duration) -> Result<()> {
        match timeout(window, self.rx.recv()).await {
            Err(_) => Ok(()),
            Ok(Some(msg)) => bail!("unexpected frame: {msg:?}"),
            Ok(None) => Ok(()),
        }
    }
}
