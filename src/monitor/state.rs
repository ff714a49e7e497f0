use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Observation;
use crate::settings::MonitorSettings;

/// Per-run state shared by the controller and the alert loop. Created on
/// start and dropped on stop.
#[derive(Debug, Clone)]
pub struct AlertState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub last_observation: Option<Observation>,
    pub last_alert_at: Option<Instant>,
    pub alerts_sent: u64,
    /// Player value carried by the last status update.
    pub last_status_sent: Option<f64>,
    /// When any status message (change, periodic or failure) last went out.
    pub last_status_at: Option<Instant>,
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            cycles: 0,
            failed_cycles: 0,
            last_observation: None,
            last_alert_at: None,
            alerts_sent: 0,
            last_status_sent: None,
            last_status_at: None,
        }
    }

    /// Zero cooldown alerts on every qualifying cycle.
    pub fn cooldown_elapsed(&self, cooldown: Duration) -> bool {
        match self.last_alert_at {
            Some(at) if !cooldown.is_zero() => at.elapsed() >= cooldown,
            _ => true,
        }
    }

    /// The player share moved more than `threshold` points since the last
    /// status update (or none was sent yet).
    pub fn status_due(&self, player: f64, threshold: f64) -> bool {
        self.last_status_sent
            .map_or(true, |previous| (player - previous).abs() > threshold)
    }

    /// No status message went out for `every`, or none at all yet.
    pub fn periodic_status_due(&self, every: Duration) -> bool {
        self.last_status_at.map_or(true, |at| at.elapsed() >= every)
    }

    pub fn snapshot(&self, running: bool, settings: &MonitorSettings) -> MonitorStatus {
        MonitorStatus {
            running,
            run_id: Some(self.run_id),
            started_at: Some(self.started_at),
            cycles: self.cycles,
            failed_cycles: self.failed_cycles,
            alerts_sent: self.alerts_sent,
            last_observation: self.last_observation.clone(),
            alert_threshold: settings.alert_threshold,
            scrape_interval_secs: settings.scrape_interval.as_secs_f64(),
        }
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}

/// What `GET /status` reports. Never carries credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub running: bool,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub alerts_sent: u64,
    pub last_observation: Option<Observation>,
    pub alert_threshold: f64,
    pub scrape_interval_secs: f64,
}

impl MonitorStatus {
    pub fn idle(settings: &MonitorSettings) -> Self {
        Self {
            running: false,
            run_id: None,
            started_at: None,
            cycles: 0,
            failed_cycles: 0,
            alerts_sent: 0,
            last_observation: None,
            alert_threshold: settings.alert_threshold,
            scrape_interval_secs: settings.scrape_interval.as_secs_f64(),
        }
    }
}
