use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::task::{self, JoinHandle};
use tracing::info;

use crate::coordinator::BroadcastCoordinator;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub connections: usize,
    pub events_published: u64,
    pub deliveries_dropped: u64,
    pub telemetry_cached: bool,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self, coordinator: &BroadcastCoordinator) -> KernelHealth {
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            connections: coordinator.connection_count(),
            events_published: coordinator.events_published(),
            deliveries_dropped: coordinator.deliveries_dropped(),
            telemetry_cached: coordinator.last_telemetry().is_some(),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }

    /// Log périodique de l'état du kernel
    pub fn spawn_health_reporter(
        &self,
        coordinator: Arc<BroadcastCoordinator>,
        every: Duration,
    ) -> JoinHandle<()> {
        let health_tracker = self.clone();

        task::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // premier tick immédiat, rien à dire au boot
            loop {
                interval.tick().await;
                let health = health_tracker.get_health(&coordinator);
                info!(
                    uptime_s = health.uptime_seconds,
                    connections = health.connections,
                    published = health.events_published,
                    dropped = health.deliveries_dropped,
                    memory_mb = health.memory_usage_mb,
                    "kernel health"
                );
            }
        })
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn get_memory_usage_mb() -> f32 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0.0;
    };
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid)
        .map(|p| p.memory() as f32 / (1024.0 * 1024.0)) // bytes -> MB
        .unwrap_or(0.0)
}
