/**
 * BROADCAST COORDINATOR - Fan-out des événements vers toutes les connexions
 *
 * RÔLE : Acteur logique unique partagé par tous les clients et par le
 * publisher de télémétrie. publish() est fire-and-forget.
 *
 * GARANTIES :
 * - livraison best-effort, au plus une fois par destinataire, pas de replay
 * - FIFO par connexion = ordre des appels à publish() (publications sérialisées)
 * - jamais bloquant : un outbox plein ou fermé fait échouer cette seule livraison
 *
 * CATCH-UP : le dernier échantillon de télémétrie est gardé en cache et livré
 * aux nouvelles connexions (désactivable). Aucun feedback n'est rejoué.
 */

use deckhub_contracts::{
    BroadcastEvent, ConnectedMessage, ControlMessage, ServerMessage, TelemetrySample,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::BroadcastConf;
use crate::error::RegistryError;
use crate::registry::{Connection, ConnectionId, ConnectionRegistry, DeliveryError};

/// Bilan d'un publish, pour diagnostic uniquement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct FanoutState {
    last_telemetry: Option<TelemetrySample>,
}

#[derive(Debug)]
pub struct BroadcastCoordinator {
    registry: ConnectionRegistry,
    // verrou de sérialisation des publish/connect + cache télémétrie
    fanout: Mutex<FanoutState>,
    outbox_capacity: usize,
    catch_up_telemetry: bool,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl BroadcastCoordinator {
    pub fn new(outbox_capacity: usize, catch_up_telemetry: bool) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            fanout: Mutex::new(FanoutState::default()),
            outbox_capacity,
            catch_up_telemetry,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &BroadcastConf) -> Self {
        Self::new(cfg.outbox_capacity, cfg.catch_up_telemetry)
    }

    /// Enregistre une connexion et retourne le côté réception de son outbox.
    ///
    /// L'outbox commence par une frame `connected`, puis le dernier échantillon
    /// de télémétrie si le rattrapage est activé.
    pub fn connect(&self) -> Result<(ConnectionId, mpsc::Receiver<ServerMessage>), RegistryError> {
        let (conn, rx) = Connection::open(self.outbox_capacity);
        let id = conn.id();

        let fanout = self.fanout.lock();
        let connected = ControlMessage::Connected(ConnectedMessage {
            connection_id: id.to_string(),
            connected_at: conn.connected_at().format(&Rfc3339).unwrap_or_default(),
        });
        // outbox neuf, capacité >= 1 : le premier envoi ne peut pas échouer
        let _ = conn.deliver(connected.into());
        if self.catch_up_telemetry {
            if let Some(sample) = &fanout.last_telemetry {
                if let Err(e) = conn.deliver(BroadcastEvent::TelemetryUpdate(sample.clone()).into()) {
                    warn!(connection_id = %id, "telemetry catch-up dropped: {e:?}");
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.registry.register(conn)?;
        drop(fanout);

        info!(connection_id = %id, connections = self.registry.len(), "client connected");
        Ok((id, rx))
    }

    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        let removed = self.registry.unregister(id).is_some();
        if removed {
            info!(connection_id = %id, connections = self.registry.len(), "client disconnected");
        }
        removed
    }

    /// Fan-out fire-and-forget vers toutes les connexions enregistrées à cet instant
    pub fn publish(&self, event: BroadcastEvent) -> PublishReport {
        let mut fanout = self.fanout.lock();
        if let BroadcastEvent::TelemetryUpdate(sample) = &event {
            fanout.last_telemetry = Some(sample.clone());
        }

        let mut report = PublishReport::default();
        for conn in self.registry.broadcast_targets() {
            match conn.deliver(ServerMessage::Event(event.clone())) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Full) => {
                    warn!(connection_id = %conn.id(), event = event.name(), "outbox full, delivery dropped");
                    report.dropped += 1;
                }
                Err(DeliveryError::Closed) => {
                    debug!(connection_id = %conn.id(), event = event.name(), "connection closing, delivery dropped");
                    report.dropped += 1;
                }
            }
        }
        drop(fanout);

        self.published.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        debug!(event = event.name(), delivered = report.delivered, dropped = report.dropped, "event published");
        report
    }

    /// Frame directe vers une connexion (erreurs, pong) ; false si partie ou pleine
    pub fn send_to(&self, id: &ConnectionId, msg: ControlMessage) -> bool {
        match self.registry.get(id) {
            Some(conn) => conn.deliver(msg.into()).is_ok(),
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Identifiants des connexions vivantes (diagnostic, ordre non garanti)
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.registry.broadcast_targets().iter().map(Connection::id).collect()
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.registry.contains(id)
    }

    pub fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn deliveries_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn last_telemetry(&self) -> Option<TelemetrySample> {
        self.fanout.lock().last_telemetry.clone()
    }
}
