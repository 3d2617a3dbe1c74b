/**
 * ACTION DISPATCH GATEWAY - Pont press → executor externe → feedback diffusé
 *
 * RÔLE :
 * - rejette les intents de widgets (invalid-intent), jamais transmis
 * - appelle l'executor avec un timeout dur
 * - normalise succès / erreur / timeout en FeedbackEvent
 * - publie le feedback à tous les clients (émetteur compris)
 *
 * Pas de retry automatique, pas d'annulation d'un intent en vol.
 */

use async_trait::async_trait;
use deckhub_contracts::{
    ActionIntent, BroadcastEvent, ButtonId, FeedbackEvent, PressRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::coordinator::BroadcastCoordinator;
use crate::error::{ExecutorError, GatewayError};

/// Collaborateur externe qui exécute l'action concrète côté OS
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Retourne un message de succès lisible
    async fn execute(&self, intent: &ActionIntent) -> Result<String, ExecutorError>;
}

/// `POST execute-action {id, actionType, actionValue} -> {result}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteActionRequest<'a> {
    id: &'a ButtonId,
    action_type: &'a str,
    action_value: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteActionResponse {
    #[serde(default)]
    result: Value,
}

/// Executor joint en HTTP
pub struct HttpActionExecutor {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpActionExecutor {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ActionExecutor for HttpActionExecutor {
    async fn execute(&self, intent: &ActionIntent) -> Result<String, ExecutorError> {
        let url = self.url.as_deref().ok_or(ExecutorError::NotConfigured)?;
        let body = ExecuteActionRequest {
            id: &intent.button_id,
            action_type: intent.action_kind.as_str(),
            action_value: &intent.action_payload,
        };

        let resp = self.client.post(url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExecutorError::Rejected { status: status.as_u16(), body });
        }
        let parsed: ExecuteActionResponse = resp.json().await?;
        interpret_result(parsed.result)
    }
}

/// `{result}` peut être absent, un bool, une string ou `{success, message}`
fn interpret_result(result: Value) -> Result<String, ExecutorError> {
    match result {
        Value::Null | Value::Bool(true) => Ok("ok".to_string()),
        Value::Bool(false) => Err(ExecutorError::ActionFailed("executor reported failure".into())),
        Value::String(msg) => Ok(msg),
        Value::Object(map) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match map.get("success").and_then(Value::as_bool) {
                Some(false) if message.is_empty() => {
                    Err(ExecutorError::ActionFailed("executor reported failure".into()))
                }
                Some(false) => Err(ExecutorError::ActionFailed(message)),
                _ if message.is_empty() => Ok("ok".to_string()),
                _ => Ok(message),
            }
        }
        other => Ok(other.to_string()),
    }
}

pub struct ActionGateway {
    executor: Arc<dyn ActionExecutor>,
    coordinator: Arc<BroadcastCoordinator>,
    timeout: Duration,
}

impl ActionGateway {
    pub fn new(
        executor: Arc<dyn ActionExecutor>,
        coordinator: Arc<BroadcastCoordinator>,
        timeout: Duration,
    ) -> Self {
        Self { executor, coordinator, timeout }
    }

    pub fn validate(intent: &ActionIntent) -> Result<(), GatewayError> {
        if !intent.action_kind.is_pressable() {
            return Err(GatewayError::InvalidIntent(format!(
                "button {} is a telemetry widget",
                intent.button_id
            )));
        }
        Ok(())
    }

    /// Exécute l'intent ; aucune panne de l'executor ne remonte à l'appelant
    pub async fn dispatch(&self, intent: ActionIntent) -> Result<FeedbackEvent, GatewayError> {
        if let Err(e) = Self::validate(&intent) {
            warn!(button = %intent.button_id, "intent rejected: {e}");
            return Err(e);
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.executor.execute(&intent)).await;
        let button_id = intent.button_id;
        let feedback = match outcome {
            Ok(Ok(message)) => FeedbackEvent::success(button_id, message),
            Ok(Err(e)) => FeedbackEvent::failure(button_id, e.to_string()),
            Err(_) => FeedbackEvent::failure(
                button_id,
                format!("action timed out after {} ms", self.timeout.as_millis()),
            ),
        };

        info!(
            button = %feedback.button_id,
            kind = %intent.action_kind,
            status = ?feedback.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "action dispatched"
        );
        Ok(feedback)
    }

    /// dispatch() puis fan-out du feedback
    pub async fn dispatch_and_publish(&self, intent: ActionIntent) -> Result<FeedbackEvent, GatewayError> {
        let feedback = self.dispatch(intent).await?;
        self.coordinator.publish(BroadcastEvent::ButtonFeedback(feedback.clone()));
        Ok(feedback)
    }

    /// Flux complet d'un appui : validation, écho `button-pressed`, dispatch, feedback
    pub async fn handle_press(&self, press: PressRequest) -> Result<FeedbackEvent, GatewayError> {
        Self::validate(&press.intent)?;
        debug!(button = %press.intent.button_id, page = %press.page_id, "button pressed");
        self.coordinator.publish(BroadcastEvent::ButtonPressed(press.echo()));
        self.dispatch_and_publish(press.intent).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhub_contracts::{ActionKind, FeedbackStatus, ServerMessage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor local aux tests unitaires (le devkit sert aux tests d'intégration)
    struct StubExecutor {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl StubExecutor {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), delay, fail })
        }
    }

    #[async_trait]
    impl ActionExecutor for StubExecutor {
        async fn execute(&self, intent: &ActionIntent) -> Result<String, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(ExecutorError::ActionFailed(format!("cannot run {}", intent.action_payload)))
            } else {
                Ok(format!("ran {}", intent.action_payload))
            }
        }
    }

    fn intent(kind: ActionKind) -> ActionIntent {
        ActionIntent {
            button_id: ButtonId::for_cell("page1", 0, 0),
            action_kind: kind,
            action_payload: "CTRL+SHIFT+S".into(),
        }
    }

    fn gateway(executor: Arc<StubExecutor>, timeout: Duration) -> (ActionGateway, Arc<BroadcastCoordinator>) {
        let coordinator = Arc::new(BroadcastCoordinator::new(16, false));
        (ActionGateway::new(executor, coordinator.clone(), timeout), coordinator)
    }

    #[tokio::test]
    async fn test_widget_intent_never_reaches_executor() {
        let executor = StubExecutor::new(Duration::ZERO, false);
        let (gateway, coordinator) = gateway(executor.clone(), Duration::from_secs(1));

        let err = gateway.dispatch_and_publish(intent(ActionKind::TelemetryWidget)).await.unwrap_err();
        assert_eq!(err.code(), "invalid-intent");
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.events_published(), 0);
    }

    #[tokio::test]
    async fn test_success_and_failure_normalized() {
        let (ok_gateway, _) = gateway(StubExecutor::new(Duration::ZERO, false), Duration::from_secs(1));
        let feedback = ok_gateway.dispatch(intent(ActionKind::Keystroke)).await.unwrap();
        assert_eq!(feedback.status, FeedbackStatus::Success);
        assert_eq!(feedback.message, "ran CTRL+SHIFT+S");

        let (ko_gateway, _) = gateway(StubExecutor::new(Duration::ZERO, true), Duration::from_secs(1));
        let feedback = ko_gateway.dispatch(intent(ActionKind::ApplicationLaunch)).await.unwrap();
        assert_eq!(feedback.status, FeedbackStatus::Failure);
        assert!(feedback.message.contains("cannot run"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let executor = StubExecutor::new(Duration::from_secs(30), false);
        let (gateway, _) = gateway(executor.clone(), Duration::from_millis(250));

        let feedback = gateway.dispatch(intent(ActionKind::Keystroke)).await.unwrap();
        assert_eq!(feedback.status, FeedbackStatus::Failure);
        assert_eq!(feedback.message, "action timed out after 250 ms");
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_press_echoes_then_publishes_feedback() {
        let (gateway, coordinator) = gateway(StubExecutor::new(Duration::ZERO, false), Duration::from_secs(1));
        let (_, mut rx) = coordinator.connect().unwrap();

        let press = PressRequest { page_id: "page1".into(), intent: intent(ActionKind::Keystroke) };
        let feedback = gateway.handle_press(press.clone()).await.unwrap();

        let mut events = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Event(e) = msg {
                events.push(e);
            }
        }
        assert_eq!(
            events,
            vec![BroadcastEvent::ButtonPressed(press.echo()), BroadcastEvent::ButtonFeedback(feedback)]
        );
    }

    #[tokio::test]
    async fn test_unconfigured_http_executor_fails() {
        let executor = HttpActionExecutor::new(None, Duration::from_secs(1)).unwrap();
        let err = executor.execute(&intent(ActionKind::Keystroke)).await.unwrap_err();
        assert!(matches!(err, ExecutorError::NotConfigured));
    }

    #[test]
    fn test_interpret_result_shapes() {
        assert_eq!(interpret_result(Value::Null).unwrap(), "ok");
        assert_eq!(interpret_result(json!("launched")).unwrap(), "launched");
        assert_eq!(interpret_result(json!({"success": true, "message": "done"})).unwrap(), "done");
        assert!(matches!(
            interpret_result(json!({"success": false, "message": "not found"})),
            Err(ExecutorError::ActionFailed(m)) if m == "not found"
        ));
        assert!(interpret_result(json!(false)).is_err());
    }
}
