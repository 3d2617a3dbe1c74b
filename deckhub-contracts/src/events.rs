//! Contrats des événements temps réel
//!
//! Chaque frame est un JSON taggé `{"event": "<nom>", "data": {...}}` :
//! - `BroadcastEvent` : diffusé à toutes les connexions par le coordinator
//! - `ControlMessage` : adressé à une seule connexion (connected, error, pong)
//! - `ClientMessage` : envoyé par un client au coordinator

use serde::{Deserialize, Serialize};

use crate::deck::{ActionKind, ButtonId};

pub const BUTTON_PRESSED: &str = "button-pressed";
pub const BUTTON_FEEDBACK: &str = "button-feedback";
pub const TELEMETRY_UPDATE: &str = "telemetry-update";

/// Codes d'erreur portés par `ControlMessage::Error`
pub mod codes {
    pub const INVALID_INTENT: &str = "invalid-intent";
    pub const MALFORMED_MESSAGE: &str = "malformed-message";
}

/// Demande d'exécution de l'action liée au bouton appuyé
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionIntent {
    pub button_id: ButtonId,
    pub action_kind: ActionKind,
    pub action_payload: String,
}

/// Écho informatif d'un appui, envoyé avant que le résultat soit connu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonPressed {
    pub button_id: ButtonId,
    pub page_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Success,
    Failure,
}

/// Résultat d'un intent exécuté, diffusé à tous les clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub button_id: ButtonId,
    pub status: FeedbackStatus,
    #[serde(default)]
    pub message: String,
}

impl FeedbackEvent {
    pub fn success(button_id: ButtonId, message: impl Into<String>) -> Self {
        Self { button_id, status: FeedbackStatus::Success, message: message.into() }
    }

    pub fn failure(button_id: ButtonId, message: impl Into<String>) -> Self {
        Self { button_id, status: FeedbackStatus::Failure, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status == FeedbackStatus::Success
    }
}

/// Relevé ponctuel des métriques (pourcentages).
///
/// Chaque échantillon remplace le précédent ; un champ absent signifie que
/// la source n'a pas pu le mesurer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_usage: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_usage: Option<f32>,
}

/// Événements diffusés à toutes les connexions vivantes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    ButtonPressed(ButtonPressed),
    ButtonFeedback(FeedbackEvent),
    TelemetryUpdate(TelemetrySample),
}

impl BroadcastEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::ButtonPressed(_) => BUTTON_PRESSED,
            BroadcastEvent::ButtonFeedback(_) => BUTTON_FEEDBACK,
            BroadcastEvent::TelemetryUpdate(_) => TELEMETRY_UPDATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: String,
    pub connected_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

/// Frames adressées à une seule connexion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ControlMessage {
    Connected(ConnectedMessage),
    Error(ErrorMessage),
    Pong,
}

impl ControlMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ControlMessage::Error(ErrorMessage { code: code.to_string(), message: message.into() })
    }
}

/// Tout ce que le coordinator écrit sur une connexion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(BroadcastEvent),
    Control(ControlMessage),
}

impl From<BroadcastEvent> for ServerMessage {
    fn from(event: BroadcastEvent) -> Self {
        ServerMessage::Event(event)
    }
}

impl From<ControlMessage> for ServerMessage {
    fn from(control: ControlMessage) -> Self {
        ServerMessage::Control(control)
    }
}

/// Appui envoyé par un client : l'intent et la page où il a eu lieu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressRequest {
    pub page_id: String,
    #[serde(flatten)]
    pub intent: ActionIntent,
}

impl PressRequest {
    pub fn echo(&self) -> ButtonPressed {
        ButtonPressed {
            button_id: self.intent.button_id.clone(),
            page_id: self.page_id.clone(),
        }
    }
}

/// Frames qu'un client peut envoyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    ButtonPressed(PressRequest),
    ButtonFeedback(FeedbackEvent),
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_broadcast_event_wire_shape() {
        let event = BroadcastEvent::ButtonFeedback(FeedbackEvent::failure(
            ButtonId::for_cell("page1", 0, 1),
            "executor timed out",
        ));
        let value = serde_json::to_value(ServerMessage::from(event)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "button-feedback",
                "data": {"buttonId": "page1/btn-0-1", "status": "failure", "message": "executor timed out"}
            })
        );
    }

    #[test]
    fn test_partial_telemetry_sample() {
        let frame = r#"{"event":"telemetry-update","data":{"cpuUsage":42,"memoryUsage":70,"gpuUsage":10}}"#;
        let msg: ServerMessage = serde_json::from_str(frame).unwrap();
        let ServerMessage::Event(BroadcastEvent::TelemetryUpdate(sample)) = msg else {
            panic!("expected telemetry update, got {msg:?}");
        };
        assert_eq!(sample.cpu_usage, Some(42.0));
        assert_eq!(sample.network_usage, None);
    }

    #[test]
    fn test_control_frames_decode_as_server_messages() {
        let pong: ServerMessage = serde_json::from_str(r#"{"event":"pong"}"#).unwrap();
        assert_eq!(pong, ServerMessage::Control(ControlMessage::Pong));

        let err = ServerMessage::from(ControlMessage::error(codes::INVALID_INTENT, "widget"));
        let text = serde_json::to_string(&err).unwrap();
        assert!(text.contains(r#""event":"error""#));
        assert_eq!(serde_json::from_str::<ServerMessage>(&text).unwrap(), err);
    }

    #[test]
    fn test_client_press_frame() {
        let frame = json!({
            "event": "button-pressed",
            "data": {
                "buttonId": "page1/btn-0-0",
                "pageId": "page1",
                "actionKind": "keyboard",
                "actionPayload": "CTRL+SHIFT+S"
            }
        });
        let msg: ClientMessage = serde_json::from_value(frame).unwrap();
        let ClientMessage::ButtonPressed(press) = msg else { panic!("expected press") };
        assert_eq!(press.intent.action_kind, ActionKind::Keystroke);
        assert_eq!(press.echo().page_id, "page1");

        let ping: ClientMessage = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);
    }
}
