/*!
Executor mock pour développer sans service d'exécution réel

Enregistre toutes les intentions reçues et rejoue des résultats scriptés.
Sans script, chaque action réussit avec `ok <payload>`.
*/

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deckhub_contracts::{ActionIntent, TelemetrySample};
use deckhub_kernel::{ActionExecutor, ExecutorError, MetricsSource};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Résultat scripté d'un appel
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed(String),
    Fail(String),
    /// Ne répond jamais (test du timeout gateway)
    Hang,
}

#[derive(Clone, Default)]
pub struct MockExecutor {
    calls: Arc<Mutex<Vec<ActionIntent>>>,
    script: Arc<Mutex<VecDeque<Outcome>>>,
    delay: Option<Duration>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latence appliquée avant chaque réponse
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, outcome: Outcome) -> &Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn succeed(&self, message: impl Into<String>) -> &Self {
        self.push(Outcome::Succeed(message.into()))
    }

    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.push(Outcome::Fail(message.into()))
    }

    pub fn hang(&self) -> &Self {
        self.push(Outcome::Hang)
    }

    pub fn calls(&self) -> Vec<ActionIntent> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ActionExecutor for MockExecutor {
    async fn execute(&self, intent: &ActionIntent) -> Result<String, ExecutorError> {
        self.calls.lock().push(intent.clone());
        let outcome = self.script.lock().pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            None => Ok(format!("ok {}", intent.action_payload)),
            Some(Outcome::Succeed(message)) => Ok(message),
            Some(Outcome::Fail(message)) => Err(ExecutorError::ActionFailed(message)),
            Some(Outcome::Hang) => std::future::pending().await,
        }
    }
}

/// Source de métriques rejouant une liste d'échantillons puis échouant
pub struct ScriptedMetricsSource {
    samples: VecDeque<Result<TelemetrySample>>,
}

impl ScriptedMetricsSource {
    pub fn new(samples: impl IntoIterator<Item = TelemetrySample>) -> Self {
        Self { samples: samples.into_iter().map(Ok).collect() }
    }

    /// Insère une panne de capteur à la suite du script
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.samples.push_back(Err(anyhow!(reason.to_string())));
        self
    }

    pub fn then(mut self, sample: TelemetrySample) -> Self {
        self.samples.push_back(Ok(sample));
        self
    }
}

#[async_trait]
impl MetricsSource for ScriptedMetricsSource {
    async fn sample(&mut self) -> Result<TelemetrySample> {
        self.samples
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("metrics script exhausted")))
    }
}
