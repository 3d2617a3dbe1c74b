//! Transport WebSocket des clients temps réel.
//!
//! Cycle de vie d'une connexion :
//! 1. Upgrade, enregistrement auprès du coordinator (hook on-connect)
//! 2. Relais de l'outbox de la connexion vers la socket
//! 3. Traitement des frames client ; chaque appui tourne dans sa propre tâche
//! 4. Désenregistrement à la fermeture ou sur erreur transport (hook on-disconnect)

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use deckhub_contracts::{codes, BroadcastEvent, ClientMessage, ControlMessage, ServerMessage};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tracing::{debug, error, warn};

use crate::http::AppState;
use crate::registry::ConnectionId;

/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: AppState) {
    let (id, mut outbox) = match app.coordinator.connect() {
        Ok(registered) => registered,
        Err(e) => {
            error!("failed to register connection: {e}");
            return;
        }
    };
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if let Err(e) = send_message(&mut sender, &msg).await {
                debug!(connection_id = %id, "send error, closing connection: {e}");
                return;
            }
        }
        // outbox fermé côté kernel (connexion retirée du registry)
        sender.send(Message::Close(None)).await.ok();
    });

    let recv_app = app.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => handle_client_frame(&recv_app, id, text.as_str()),
                Ok(Message::Binary(_)) => {
                    warn!(connection_id = %id, "unsupported binary frame");
                    recv_app.coordinator.send_to(
                        &id,
                        ControlMessage::error(codes::MALFORMED_MESSAGE, "binary frames are not supported"),
                    );
                }
                // ping/pong protocole gérés par axum
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %id, "client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(connection_id = %id, "receive error: {e}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    app.coordinator.disconnect(&id);
}

/// Route une frame client. Les appuis partent dans leur propre tâche : un
/// executor lent ne bloque jamais les autres frames de la connexion.
pub(crate) fn handle_client_frame(app: &AppState, id: ConnectionId, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::ButtonPressed(press)) => {
            let app = app.clone();
            tokio::spawn(async move {
                if let Err(e) = app.gateway.handle_press(press).await {
                    app.coordinator.send_to(&id, ControlMessage::error(e.code(), e.to_string()));
                }
            });
        }
        Ok(ClientMessage::ButtonFeedback(feedback)) => {
            app.coordinator.publish(BroadcastEvent::ButtonFeedback(feedback));
        }
        Ok(ClientMessage::Ping) => {
            app.coordinator.send_to(&id, ControlMessage::Pong);
        }
        Err(e) => {
            warn!(connection_id = %id, "malformed client frame: {e}");
            app.coordinator.send_to(
                &id,
                ControlMessage::error(codes::MALFORMED_MESSAGE, e.to_string()),
            );
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
