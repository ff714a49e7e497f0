pub mod error;
pub mod extraction;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod renderer;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

use extraction::StatisticsResolver;
use monitor::{
    commands::{router, AppState},
    MonitorController,
};
use notifier::TelegramNotifier;
use renderer::WebDriverLauncher;
use settings::Settings;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Bac Bo monitor starting up...");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve()) {
        error!("fatal: {err:#}");
        std::process::exit(1);
    }
}

async fn serve() -> Result<()> {
    let settings = Arc::new(Settings::load()?);
    info!(
        "game={} webdriver={} headless={} interval={:?} threshold={}",
        settings.renderer.game_url,
        settings.renderer.webdriver_url,
        settings.renderer.headless,
        settings.monitor.scrape_interval,
        settings.monitor.alert_threshold
    );

    let launcher = WebDriverLauncher::new(settings.renderer.clone())?;
    let notifier = TelegramNotifier::new(&settings.notifier)?;
    let resolver = StatisticsResolver::from_settings(&settings);
    let controller = Arc::new(MonitorController::new(
        settings.clone(),
        Arc::new(launcher),
        Arc::new(notifier),
        Arc::new(resolver),
    ));

    let app = router(AppState {
        controller: controller.clone(),
    });
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("control surface listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if controller.stop().await {
        info!("stopped active monitoring run on shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
