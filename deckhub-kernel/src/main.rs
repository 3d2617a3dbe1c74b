/**
 * DECKHUB KERNEL - Point d'entrée du coordinateur
 *
 * RÔLE : Bootstrap config → coordinator → gateway → télémétrie → HTTP/WS.
 * Aucune persistance : tout l'état vit en mémoire le temps du process.
 */

use anyhow::{Context, Result};
use deckhub_kernel::{
    build_router, load_config, ActionGateway, AppState, BroadcastCoordinator, HealthTracker,
    HttpActionExecutor, SysinfoSampler, TelemetryPublisher,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;
    info!(
        pages = cfg.pages.len(),
        buttons = cfg.buttons.len(),
        "configuration loaded"
    );

    let coordinator = Arc::new(BroadcastCoordinator::from_config(&cfg.broadcast));

    if cfg.executor.url.is_none() {
        warn!("no executor.url configured: every action will report a failure");
    }
    let executor = HttpActionExecutor::new(cfg.executor.url.clone(), cfg.executor.timeout())
        .context("Failed to build action executor client")?;
    let gateway = Arc::new(ActionGateway::new(
        Arc::new(executor),
        coordinator.clone(),
        cfg.executor.timeout(),
    ));

    // télémétrie poussée en continu, indépendamment des clients
    TelemetryPublisher::new(coordinator.clone(), cfg.telemetry.interval())
        .spawn(SysinfoSampler::new(cfg.telemetry.network_capacity_mbps));

    let health_tracker = HealthTracker::new();
    health_tracker.spawn_health_reporter(coordinator.clone(), cfg.health.report_interval());

    let app_state = AppState {
        coordinator,
        gateway,
        health_tracker,
        pages: Arc::new(cfg.pages.clone()),
        buttons: Arc::new(cfg.buttons.clone()),
    };
    let app = build_router(app_state);

    let listener = TcpListener::bind(cfg.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.bind))?;
    info!("listening on http://{}", cfg.server.bind);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
