//! Transport WebSocket d'un panneau client.
//!
//! Pilote l'état de connexion du synchronizer, applique chaque frame serveur
//! décodée et relaie les frames sortantes. Sur perte de connexion, retente à
//! délai fixe jusqu'à `max_attempts` puis reste en `Disconnected`. Les frames
//! mises en file hors connexion sont jetées.

use deckhub_contracts::{ClientMessage, ControlMessage, ServerMessage};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::synchronizer::{ClientSynchronizer, ConnectionState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    pub max_attempts: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            reconnect_delay: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

impl TransportConfig {
    /// DECKHUB_URL, DECKHUB_RECONNECT_MS, DECKHUB_MAX_RECONNECTS
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("DECKHUB_URL") {
            cfg.url = url;
        }
        if let Some(ms) = std::env::var("DECKHUB_RECONNECT_MS").ok().and_then(|v| v.parse().ok()) {
            cfg.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(n) = std::env::var("DECKHUB_MAX_RECONNECTS").ok().and_then(|v| v.parse().ok()) {
            cfg.max_attempts = n;
        }
        cfg
    }

    /// Base HTTP du kernel dérivée de l'URL WebSocket
    pub fn http_base(&self) -> String {
        let base = self
            .url
            .replacen("wss://", "https://", 1)
            .replacen("ws://", "http://", 1);
        base.strip_suffix("/ws").unwrap_or(&base).to_string()
    }
}

enum SessionEnd {
    Lost,
    Shutdown,
}

pub struct Transport {
    config: TransportConfig,
    sync: Arc<Mutex<ClientSynchronizer>>,
}

impl Transport {
    pub fn new(config: TransportConfig, sync: Arc<Mutex<ClientSynchronizer>>) -> Self {
        Self { config, sync }
    }

    fn set_state(&self, next: ConnectionState) {
        if let Err(e) = self.sync.lock().set_state(next) {
            warn!("{e}");
        }
    }

    /// Tourne jusqu'à fermeture de `outgoing` ou épuisement des reconnexions
    pub async fn run(self, mut outgoing: mpsc::Receiver<ClientMessage>) {
        let mut attempt = 0u32;
        self.set_state(ConnectionState::Connecting);

        loop {
            match self.open().await {
                Ok(stream) => {
                    // ce qui a été mis en file pendant la tentative ne part pas non plus
                    if discard_offline(&mut outgoing) {
                        break;
                    }
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    info!("connected to {}", self.config.url);

                    if let SessionEnd::Shutdown = self.run_session(stream, &mut outgoing).await {
                        info!("client shutdown requested");
                        break;
                    }
                    warn!("connection to {} lost", self.config.url);
                }
                Err(e) => warn!("failed to connect to {}: {e}", self.config.url),
            }

            attempt += 1;
            if attempt > self.config.max_attempts {
                warn!(attempts = self.config.max_attempts, "giving up reconnecting");
                break;
            }
            self.set_state(ConnectionState::Reconnecting { attempt });
            info!(
                "reconnecting in {:.1}s (attempt {attempt}/{})",
                self.config.reconnect_delay.as_secs_f32(),
                self.config.max_attempts
            );

            tokio::time::sleep(self.config.reconnect_delay).await;
            if discard_offline(&mut outgoing) {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    async fn open(&self) -> Result<WsStream, ClientError> {
        let (stream, _) = connect_async(self.config.url.as_str()).await?;
        Ok(stream)
    }

    async fn run_session(&self, stream: WsStream, outgoing: &mut mpsc::Receiver<ClientMessage>) -> SessionEnd {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                msg = outgoing.recv() => {
                    let Some(msg) = msg else {
                        write.close().await.ok();
                        return SessionEnd::Shutdown;
                    };
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("cannot encode client frame: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!("send failed: {e}");
                        return SessionEnd::Lost;
                    }
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let applied = handle_frame(&mut self.sync.lock(), &text, Instant::now());
                            if let Err(e) = applied {
                                warn!("{e}");
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                return SessionEnd::Lost;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("websocket closed by server");
                            return SessionEnd::Lost;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("websocket error: {e}");
                            return SessionEnd::Lost;
                        }
                    }
                }
            }
        }
    }
}

/// Vide la file sortante (pas de file d'attente hors connexion) ; true si elle est fermée
fn discard_offline(outgoing: &mut mpsc::Receiver<ClientMessage>) -> bool {
    loop {
        match outgoing.try_recv() {
            Ok(dropped) => debug!("discarding frame queued while offline: {dropped:?}"),
            Err(mpsc::error::TryRecvError::Empty) => return false,
            Err(mpsc::error::TryRecvError::Disconnected) => return true,
        }
    }
}

/// Décode une frame texte serveur et l'applique ; indique si la grille a changé
pub fn handle_frame(sync: &mut ClientSynchronizer, text: &str, now: Instant) -> Result<bool, ClientError> {
    let message: ServerMessage = serde_json::from_str(text)?;
    if let ServerMessage::Control(ControlMessage::Connected(hello)) = &message {
        info!(connection_id = %hello.connection_id, "registered by kernel");
    }
    Ok(sync.apply(message, now))
}
