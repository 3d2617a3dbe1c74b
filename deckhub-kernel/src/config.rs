/**
 * CONFIG KERNEL - Chargement de deckhub.yaml
 *
 * RÔLE : Paramètres serveur, executor d'actions, télémétrie, broadcast,
 * plus la liste des pages et la table de boutons (chargées une fois, immuables).
 *
 * FONCTIONNEMENT : fichier absent → config par défaut ; fichier invalide →
 * log + config par défaut. Overrides via DECKHUB_BIND / DECKHUB_EXECUTOR_URL.
 */

use deckhub_contracts::{default_pages, validate_pages, ButtonTable, Page};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::error::ConfigError;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub server: ServerConf,
    pub executor: ExecutorConf,
    pub telemetry: TelemetryConf,
    pub broadcast: BroadcastConf,
    pub health: HealthConf,
    pub pages: Vec<Page>,
    pub buttons: ButtonTable,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConf {
    pub bind: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutorConf {
    pub url: Option<String>, // ex: "http://127.0.0.1:5000/api/execute-action"
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConf {
    pub interval_ms: u64,
    pub network_capacity_mbps: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BroadcastConf {
    pub outbox_capacity: usize,
    pub catch_up_telemetry: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthConf {
    pub report_interval_secs: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            server: ServerConf::default(),
            executor: ExecutorConf::default(),
            telemetry: TelemetryConf::default(),
            broadcast: BroadcastConf::default(),
            health: HealthConf::default(),
            pages: default_pages(),
            buttons: ButtonTable::default(),
        }
    }
}

impl Default for ServerConf {
    fn default() -> Self {
        Self { bind: SocketAddr::from(([0, 0, 0, 0], 8080)) }
    }
}

impl Default for ExecutorConf {
    fn default() -> Self {
        Self { url: None, timeout_ms: 5_000 }
    }
}

impl Default for TelemetryConf {
    fn default() -> Self {
        Self { interval_ms: 2_000, network_capacity_mbps: 1_000 }
    }
}

impl Default for BroadcastConf {
    fn default() -> Self {
        Self { outbox_capacity: 64, catch_up_telemetry: true }
    }
}

impl Default for HealthConf {
    fn default() -> Self {
        Self { report_interval_secs: 60 }
    }
}

impl ExecutorConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl TelemetryConf {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl HealthConf {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pages(&self.pages)?;
        if self.executor.timeout_ms == 0 {
            return Err(invalid("executor.timeout_ms", "must be greater than 0"));
        }
        if self.telemetry.interval_ms == 0 {
            return Err(invalid("telemetry.interval_ms", "must be greater than 0"));
        }
        // frame connected + échantillon de rattrapage
        if self.broadcast.outbox_capacity < 2 {
            return Err(invalid("broadcast.outbox_capacity", "must be at least 2"));
        }
        if self.health.report_interval_secs == 0 {
            return Err(invalid("health.report_interval_secs", "must be greater than 0"));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("DECKHUB_BIND") {
            match bind.parse() {
                Ok(addr) => self.server.bind = addr,
                Err(e) => warn!("DECKHUB_BIND ignoré ({bind}): {e}"),
            }
        }
        if let Ok(url) = std::env::var("DECKHUB_EXECUTOR_URL") {
            if !url.trim().is_empty() {
                self.executor.url = Some(url);
            }
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.to_string() }
}

/// Parse + validation d'un document YAML (vide = défauts)
pub fn parse_config(txt: &str) -> Result<KernelConfig, ConfigError> {
    if txt.trim().is_empty() {
        return Ok(KernelConfig::default());
    }
    let cfg: KernelConfig = serde_yaml::from_str(txt)?;
    cfg.validate()?;
    Ok(cfg)
}

pub async fn load_config_from(path: impl AsRef<Path>) -> Result<KernelConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        info!("pas de {}, usage config par défaut", path.display());
        return Ok(KernelConfig::default());
    }
    let txt = fs::read_to_string(path).await?;
    parse_config(&txt)
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("DECKHUB_CONFIG").unwrap_or_else(|_| "deckhub.yaml".into());
    let mut cfg = load_config_from(&path).await.unwrap_or_else(|e| {
        warn!("config invalide ({path}): {e}");
        KernelConfig::default()
    });
    cfg.apply_env_overrides();
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhub_contracts::{ActionKind, MetricKey};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.server.bind.port(), 8080);
        assert_eq!(cfg.executor.timeout(), Duration::from_secs(5));
        assert!(cfg.broadcast.catch_up_telemetry);
        assert_eq!(cfg.buttons.len(), 12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = parse_config(
            "executor:\n  url: http://localhost:5000/api/execute-action\ntelemetry:\n  interval_ms: 500\n",
        )
        .unwrap();
        assert_eq!(cfg.executor.url.as_deref(), Some("http://localhost:5000/api/execute-action"));
        assert_eq!(cfg.executor.timeout_ms, 5_000);
        assert_eq!(cfg.telemetry.interval(), Duration::from_millis(500));
        assert_eq!(cfg.pages, default_pages());
    }

    #[test]
    fn test_custom_button_table() {
        let yaml = r##"
pages:
  - { id: obs, name: OBS }
buttons:
  - { row: 0, col: 0, label: REC, actionKind: keyboard, actionPayload: "CTRL+R", color: "#f00" }
  - { row: 0, col: 1, label: CPU, actionKind: telemetry-widget, color: "#0f0", metric: cpu }
"##;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.pages.len(), 1);
        let rec = cfg.buttons.lookup("obs", 0, 0).unwrap();
        assert_eq!(rec.action_kind, ActionKind::Keystroke);
        assert_eq!(cfg.buttons.lookup("obs", 0, 1).unwrap().metric, Some(MetricKey::Cpu));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(parse_config("pages: []"), Err(ConfigError::Contract(_))));
        assert!(matches!(
            parse_config("broadcast:\n  outbox_capacity: 0\n"),
            Err(ConfigError::Invalid { field: "broadcast.outbox_capacity", .. })
        ));
        assert!(matches!(
            parse_config("broadcast:\n  outbox_capacity: 1\n"),
            Err(ConfigError::Invalid { field: "broadcast.outbox_capacity", .. })
        ));
        assert!(parse_config("broadcast:\n  outbox_capacity: 2\n").is_ok());
        // widget sans métrique → rejeté au parse de la table
        let yaml = "buttons:\n  - { row: 0, col: 0, label: CPU, actionKind: widget, color: red }\n";
        assert!(matches!(parse_config(yaml), Err(ConfigError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  bind: 127.0.0.1:9090").unwrap();
        let cfg = load_config_from(file.path()).await.unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());

        let missing = load_config_from("/nonexistent/deckhub.yaml").await.unwrap();
        assert_eq!(missing.server.bind.port(), 8080);
    }
}
