use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{MonitorError, MonitorResult};
use crate::extraction::StatisticsResolver;
use crate::models::Credentials;
use crate::notifier::{messages, Notifier};
use crate::renderer::RendererLauncher;
use crate::settings::Settings;

use super::loop_worker::{alert_loop, LoopContext};
use super::{AlertState, MonitorStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

struct ActiveRun {
    credentials: Credentials,
    state: Arc<Mutex<AlertState>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the Stopped/Running state machine. `start` and `stop` are serialised
/// through the `active` slot.
pub struct MonitorController {
    settings: Arc<Settings>,
    launcher: Arc<dyn RendererLauncher>,
    notifier: Arc<dyn Notifier>,
    resolver: Arc<StatisticsResolver>,
    active: Mutex<Option<ActiveRun>>,
}

impl MonitorController {
    pub fn new(
        settings: Arc<Settings>,
        launcher: Arc<dyn RendererLauncher>,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<StatisticsResolver>,
    ) -> Self {
        Self {
            settings,
            launcher,
            notifier,
            resolver,
            active: Mutex::new(None),
        }
    }

    /// Validate credentials, open the game page and spawn the alert loop.
    /// Blank or missing values fall back to the configured defaults.
    pub async fn start(&self, token: Option<String>, chat_id: Option<String>) -> MonitorResult<Uuid> {
        let mut active = self.active.lock().await;
        if let Some(run) = active.as_ref() {
            if !run.handle.is_finished() {
                return Err(MonitorError::AlreadyRunning);
            }
            log_warn!("previous alert loop exited on its own; starting a new run");
            *active = None;
        }

        let token = pick(token, self.settings.default_token.as_deref());
        let chat_id = pick(chat_id, self.settings.default_chat_id.as_deref());
        let credentials = Credentials::new(&token, &chat_id)?;

        let renderer = self
            .launcher
            .launch()
            .await
            .map_err(MonitorError::renderer)?;

        let state = AlertState::new();
        let run_id = state.run_id;
        let state = Arc::new(Mutex::new(state));
        let cancel_token = CancellationToken::new();
        let monitor = self.settings.monitor.clone();

        if monitor.announce_start {
            let text = messages::monitoring_started(
                monitor.scrape_interval,
                monitor.alert_threshold,
                monitor.language,
            );
            if let Err(err) = self.notifier.send(&credentials, &text).await {
                log_warn!("failed to send startup message: {err}");
            }
        }

        let ctx = LoopContext {
            credentials: credentials.clone(),
            settings: monitor,
            resolver: self.resolver.clone(),
            notifier: self.notifier.clone(),
            state: state.clone(),
            cancel_token: cancel_token.clone(),
        };
        let handle = tokio::spawn(alert_loop(ctx, renderer));

        *active = Some(ActiveRun {
            credentials,
            state,
            cancel_token,
            handle,
        });
        log_info!("monitoring started (run {})", run_id);
        Ok(run_id)
    }

    /// Send the stopped message, cancel the loop and wait for it to close the
    /// renderer. Returns `false` when nothing was running.
    pub async fn stop(&self) -> bool {
        let mut active = self.active.lock().await;
        let Some(run) = active.take() else {
            return false;
        };

        {
            // No alert can be delivered after the stopped message.
            let _state = run.state.lock().await;
            let text = messages::monitoring_stopped(self.settings.monitor.language);
            if let Err(err) = self.notifier.send(&run.credentials, &text).await {
                log_warn!("failed to send stopped message: {err}");
            }
            run.cancel_token.cancel();
        }

        if let Err(err) = run.handle.await {
            log_error!("alert loop task failed to join: {err}");
        }
        log_info!("monitoring stopped");
        true
    }

    pub async fn status(&self) -> MonitorStatus {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(run) => {
                let running = !run.handle.is_finished();
                run.state.lock().await.snapshot(running, &self.settings.monitor)
            }
            None => MonitorStatus::idle(&self.settings.monitor),
        }
    }
}

fn pick(value: Option<String>, fallback: Option<&str>) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_default()
}
