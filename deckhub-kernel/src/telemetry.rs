//! Publication de la télémétrie
//!
//! - `MetricsSource` : point d'extension de l'échantillonneur
//! - `SysinfoSampler` : CPU, mémoire et réseau via sysinfo
//! - `TelemetryPublisher` : boucle à intervalle fixe, pousse chaque échantillon même inchangé

use anyhow::{bail, Result};
use async_trait::async_trait;
use deckhub_contracts::{BroadcastEvent, TelemetrySample};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Networks, System};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::coordinator::BroadcastCoordinator;

#[async_trait]
pub trait MetricsSource: Send {
    async fn sample(&mut self) -> Result<TelemetrySample>;
}

/// Échantillonneur des métriques de l'hôte.
///
/// sysinfo n'expose pas la charge GPU : le champ reste absent de l'échantillon.
pub struct SysinfoSampler {
    sys: System,
    networks: Networks,
    // None tant qu'aucune base de comparaison n'a été prise
    last_network_refresh: Option<Instant>,
    link_capacity_bits: f64,
}

impl SysinfoSampler {
    pub fn new(network_capacity_mbps: u32) -> Self {
        let mut sys = System::new();
        // première mesure CPU : la suivante donnera un delta exploitable
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            last_network_refresh: None,
            link_capacity_bits: f64::from(network_capacity_mbps) * 1_000_000.0,
        }
    }

    fn network_usage(&mut self) -> Option<f32> {
        self.networks.refresh();
        let previous = self.last_network_refresh.replace(Instant::now())?;
        let elapsed = previous.elapsed().as_secs_f64();
        if elapsed <= 0.0 || self.link_capacity_bits <= 0.0 {
            return None;
        }

        let bytes: u64 = self
            .networks
            .iter()
            .map(|(_, data)| data.received() + data.transmitted())
            .sum();
        let bits_per_sec = bytes as f64 * 8.0 / elapsed;
        Some(((bits_per_sec / self.link_capacity_bits) * 100.0).min(100.0) as f32)
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl MetricsSource for SysinfoSampler {
    async fn sample(&mut self) -> Result<TelemetrySample> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            bail!("memory information unavailable");
        }
        let used = total.saturating_sub(self.sys.available_memory());
        let memory = (used as f32 / total as f32) * 100.0;
        let cpu = self.sys.global_cpu_info().cpu_usage();

        Ok(TelemetrySample {
            cpu_usage: Some(round1(cpu)),
            memory_usage: Some(round1(memory)),
            gpu_usage: None,
            network_usage: self.network_usage().map(round1),
        })
    }
}

pub struct TelemetryPublisher {
    coordinator: Arc<BroadcastCoordinator>,
    interval: Duration,
}

impl TelemetryPublisher {
    pub fn new(coordinator: Arc<BroadcastCoordinator>, interval: Duration) -> Self {
        Self { coordinator, interval }
    }

    pub fn spawn<S: MetricsSource + 'static>(self, source: S) -> JoinHandle<()> {
        tokio::spawn(self.run(source))
    }

    /// Boucle sans fin ; un échantillon en échec ne saute que son propre tick
    pub async fn run<S: MetricsSource>(self, mut source: S) {
        info!(interval_ms = self.interval.as_millis() as u64, "telemetry publisher started");
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick(&mut source).await;
        }
    }

    pub async fn tick<S: MetricsSource>(&self, source: &mut S) -> bool {
        match source.sample().await {
            Ok(sample) => {
                let report = self.coordinator.publish(BroadcastEvent::TelemetryUpdate(sample));
                debug!(delivered = report.delivered, "telemetry published");
                true
            }
            Err(e) => {
                warn!("telemetry sample failed, tick skipped: {e:#}");
                false
            }
        }
    }
}
