/**
 * CONNECTION REGISTRY - Ensemble des clients connectés
 *
 * RÔLE : Seul état mutable partagé du kernel. Une entrée par handshake réussi,
 * retirée à la fermeture / erreur transport. Aucune logique métier.
 *
 * CONCURRENCE : mutations sérialisées par un Mutex ; broadcast_targets() rend
 * un snapshot, une connexion en cours de teardown peut y figurer (livraison
 * best-effort, jamais de panic).
 */

use deckhub_contracts::ServerMessage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// outbox plein (client lent)
    Full,
    /// récepteur fermé (connexion en teardown)
    Closed,
}

/// Cible du fan-out : identité, date de connexion et outbox qui alimente sa socket
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    connected_at: OffsetDateTime,
    outbox: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn open(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            connected_at: OffsetDateTime::now_utc(),
            outbox,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> OffsetDateTime {
        self.connected_at
    }

    /// N'attend jamais : un outbox plein ou fermé fait échouer cette seule livraison
    pub fn deliver(&self, msg: ServerMessage) -> Result<(), DeliveryError> {
        self.outbox.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn: Connection) -> Result<(), RegistryError> {
        let mut map = self.connections.lock();
        if map.contains_key(&conn.id) {
            return Err(RegistryError::DuplicateConnection(conn.id));
        }
        map.insert(conn.id, conn);
        Ok(())
    }

    pub fn unregister(&self, id: &ConnectionId) -> Option<Connection> {
        self.connections.lock().remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Connection> {
        self.connections.lock().get(id).cloned()
    }

    /// Instantané des connexions vivantes au moment de l'appel
    pub fn broadcast_targets(&self) -> Vec<Connection> {
        self.connections.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.lock().contains_key(id)
    }

    // diagnostic uniquement, jamais utilisé pour décider du protocole
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_unregister() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::open(4);
        let id = conn.id();

        registry.register(conn.clone()).unwrap();
        assert!(registry.contains(&id));
        assert_eq!(
            registry.register(conn),
            Err(RegistryError::DuplicateConnection(id))
        );
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(&id).is_some());
        assert!(registry.unregister(&id).is_none());
        assert!(registry.is_empty());
        assert!(registry.broadcast_targets().is_empty());
    }

    #[test]
    fn test_deliver_reports_full_and_closed() {
        let (conn, rx) = Connection::open(1);
        assert_eq!(conn.deliver(ServerMessage::Control(deckhub_contracts::ControlMessage::Pong)), Ok(()));
        assert_eq!(
            conn.deliver(ServerMessage::Control(deckhub_contracts::ControlMessage::Pong)),
            Err(DeliveryError::Full)
        );
        drop(rx);
        assert_eq!(
            conn.deliver(ServerMessage::Control(deckhub_contracts::ControlMessage::Pong)),
            Err(DeliveryError::Closed)
        );
    }

    #[test]
    fn test_concurrent_connect_disconnect_burst() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..200 {
                        let (conn, rx) = Connection::open(1);
                        let id = conn.id();
                        registry.register(conn).unwrap();
                        if i % 2 == 0 {
                            registry.unregister(&id);
                        } else {
                            kept.push((id, rx));
                        }
                        let _ = registry.broadcast_targets();
                    }
                    kept
                })
            })
            .collect();

        let kept: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), kept.len());
        assert!(kept.iter().all(|(id, _)| registry.contains(id)));
    }
}
