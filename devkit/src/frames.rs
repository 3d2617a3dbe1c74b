/*!
Construction de frames client conformes au protocole

Évite de répéter le JSON `{"event": ..., "data": ...}` à la main dans les tests.
*/

use deckhub_contracts::{
    ActionIntent, ActionKind, ButtonId, ClientMessage, FeedbackEvent, PressRequest,
    TelemetrySample,
};

pub struct FrameBuilder;

impl FrameBuilder {
    pub fn press(page_id: &str, row: u16, col: u16, kind: ActionKind, payload: &str) -> ClientMessage {
        ClientMessage::ButtonPressed(PressRequest {
            page_id: page_id.to_string(),
            intent: ActionIntent {
                button_id: ButtonId::for_cell(page_id, row, col),
                action_kind: kind,
                action_payload: payload.to_string(),
            },
        })
    }

    /// Appui clavier, le cas le plus courant
    pub fn keystroke(page_id: &str, row: u16, col: u16, keys: &str) -> ClientMessage {
        Self::press(page_id, row, col, ActionKind::Keystroke, keys)
    }

    pub fn feedback(feedback: FeedbackEvent) -> ClientMessage {
        ClientMessage::ButtonFeedback(feedback)
    }

    pub fn ping() -> ClientMessage {
        ClientMessage::Ping
    }

    /// Sérialise une frame client (ne peut pas échouer : types sans map non-string)
    pub fn to_text(message: &ClientMessage) -> String {
        serde_json::to_string(message).unwrap_or_default()
    }

    pub fn sample(cpu: f32, memory: f32) -> TelemetrySample {
        TelemetrySample {
            cpu_usage: Some(cpu),
            memory_usage: Some(memory),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keystroke_frame() {
        let text = FrameBuilder::to_text(&FrameBuilder::keystroke("page2", 0, 3, "ctrl+c"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "button-pressed");
        assert_eq!(value["data"]["buttonId"], "page2/btn-0-3");
        assert_eq!(value["data"]["pageId"], "page2");
        assert_eq!(value["data"]["actionPayload"], "ctrl+c");
    }

    #[test]
    fn test_ping_and_feedback_frames() {
        assert_eq!(FrameBuilder::to_text(&FrameBuilder::ping()), r#"{"event":"ping"}"#);

        let feedback = FeedbackEvent::failure(ButtonId::for_cell("page1", 1, 0), "not found");
        let value: serde_json::Value =
            serde_json::from_str(&FrameBuilder::to_text(&FrameBuilder::feedback(feedback))).unwrap();
        assert_eq!(value["event"], "button-feedback");
        assert_eq!(value["data"]["buttonId"], "page1/btn-1-0");
        assert_eq!(value["data"]["status"], "failure");
    }
}
