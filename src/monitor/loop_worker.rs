use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::extraction::StatisticsResolver;
use crate::models::Credentials;
use crate::notifier::{messages, Notifier};
use crate::renderer::PageRenderer;
use crate::settings::MonitorSettings;

use super::AlertState;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Upper bound on one poll cycle, screenshot and OCR included.
const CYCLE_TIMEOUT_SECS: u64 = 120;

/// Everything one run of the alert loop needs besides the renderer.
#[derive(Clone)]
pub struct LoopContext {
    pub credentials: Credentials,
    pub settings: MonitorSettings,
    pub resolver: Arc<StatisticsResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub state: Arc<Mutex<AlertState>>,
    pub cancel_token: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Neither extractor found a percentage.
    Failed,
    Observed { alerted: bool },
    /// Stop was requested while the cycle was in flight.
    Cancelled,
}

pub async fn alert_loop(ctx: LoopContext, mut renderer: Box<dyn PageRenderer>) {
    let mut ticker = tokio::time::interval(ctx.settings.scrape_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = run_cycle(&ctx, renderer.as_mut());
                if tokio::time::timeout(Duration::from_secs(CYCLE_TIMEOUT_SECS), fut).await.is_err() {
                    log_warn!("poll cycle timed out (> {}s)", CYCLE_TIMEOUT_SECS);
                }
            }
            _ = ctx.cancel_token.cancelled() => {
                log_info!("alert loop shutting down");
                break;
            }
        }
    }

    if let Err(err) = renderer.close().await {
        log_warn!("failed to close page renderer: {err:#}");
    }
}

/// Resolve once, record the result and send whatever messages it calls for.
pub async fn run_cycle(ctx: &LoopContext, renderer: &mut dyn PageRenderer) -> CycleOutcome {
    let result = ctx.resolver.resolve(renderer).await;

    // Held through delivery so a concurrent stop cannot slip in between the
    // cancellation check and the alert.
    let mut state = ctx.state.lock().await;
    state.cycles += 1;
    let settings = &ctx.settings;

    let observation = match result {
        Ok(observation) => observation,
        Err(err) => {
            state.failed_cycles += 1;
            log_warn!("cycle {}: {err}", state.cycles);
            if settings.failure_status && !ctx.cancel_token.is_cancelled() {
                let text = messages::statistics_unavailable(settings.language);
                send_status(ctx, &mut state, &text).await;
            }
            return CycleOutcome::Failed;
        }
    };
    log_info!(
        "cycle {}: player={:?} banker={:?} tie={:?} via {:?}",
        state.cycles,
        observation.player_pct,
        observation.banker_pct,
        observation.tie_pct,
        observation.source
    );
    state.last_observation = Some(observation.clone());

    if ctx.cancel_token.is_cancelled() {
        return CycleOutcome::Cancelled;
    }

    let mut alerted = false;
    if observation.player_above(settings.alert_threshold)
        && state.cooldown_elapsed(settings.alert_cooldown)
    {
        let text = messages::entry_alert(&observation, settings.language);
        match ctx.notifier.send(&ctx.credentials, &text).await {
            Ok(()) => {
                state.alerts_sent += 1;
                state.last_alert_at = Some(std::time::Instant::now());
                alerted = true;
                log_info!("entry alert sent (player {:?}%)", observation.player_pct);
            }
            Err(err) => log_error!("failed to send entry alert: {err}"),
        }
    }

    let moved = match (settings.status_change_threshold, observation.player_pct) {
        (Some(threshold), Some(player)) => state.status_due(player, threshold),
        _ => false,
    };
    let periodic = settings
        .status_interval
        .is_some_and(|every| state.periodic_status_due(every));
    if moved || periodic {
        let text = messages::status_update(&observation, settings.alert_threshold, settings.language);
        if send_status(ctx, &mut state, &text).await {
            if let Some(player) = observation.player_pct {
                state.last_status_sent = Some(player);
            }
        }
    }

    CycleOutcome::Observed { alerted }
}

/// Delivers a status message and restarts the periodic clock on success.
async fn send_status(ctx: &LoopContext, state: &mut AlertState, text: &str) -> bool {
    match ctx.notifier.send(&ctx.credentials, text).await {
        Ok(()) => {
            state.last_status_at = Some(std::time::Instant::now());
            true
        }
        Err(err) => {
            log_error!("failed to send status update: {err}");
            false
        }
    }
}
