use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};

use crate::extraction::{AmbiguityPolicy, ExtractionConfig};
use crate::notifier::Language;

pub const DEFAULT_GAME_URL: &str = "https://www.vemabet10.com/pt/game/bac-bo/play-for-real";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub scrape_interval: Duration,
    /// Alert when the player share is strictly above this value.
    pub alert_threshold: f64,
    /// Minimum time between two entry alerts; zero alerts on every qualifying cycle.
    pub alert_cooldown: Duration,
    /// Push a status message on the first reading and whenever the player
    /// share moved more than this many points since the last one.
    pub status_change_threshold: Option<f64>,
    /// Push a status message when none went out for this long.
    pub status_interval: Option<Duration>,
    /// Push a "could not retrieve statistics" message on failed cycles.
    pub failure_status: bool,
    pub language: Language,
    pub announce_start: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scrape_interval: Duration::from_secs(5),
            alert_threshold: 50.0,
            alert_cooldown: Duration::ZERO,
            status_change_threshold: Some(3.0),
            status_interval: Some(Duration::from_secs(30)),
            failure_status: true,
            language: Language::En,
            announce_start: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub webdriver_url: String,
    pub game_url: String,
    pub headless: bool,
    pub chrome_binary: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    /// Wait after navigation so the game's dynamic content can render.
    pub page_settle: Duration,
    pub request_timeout: Duration,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            game_url: DEFAULT_GAME_URL.into(),
            headless: false,
            chrome_binary: None,
            window_width: 1920,
            window_height: 1080,
            page_settle: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub command: String,
    pub language: String,
    /// Integer scale factor applied before recognition; 1 keeps the original size.
    pub upscale: u32,
    /// Screenshots smaller than this are treated as blank.
    pub min_screenshot_bytes: usize,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            command: "tesseract".into(),
            language: "eng".into(),
            upscale: 1,
            min_screenshot_bytes: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_host: String,
    pub port: u16,
    /// `PORT` present or `APP_ENV=production`; forces a headless browser.
    pub production: bool,
    pub default_token: Option<String>,
    pub default_chat_id: Option<String>,
    pub monitor: MonitorSettings,
    pub renderer: RendererSettings,
    pub ocr: OcrSettings,
    pub notifier: NotifierSettings,
    pub extraction: ExtractionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            production: false,
            default_token: None,
            default_chat_id: None,
            monitor: MonitorSettings::default(),
            renderer: RendererSettings::default(),
            ocr: OcrSettings::default(),
            notifier: NotifierSettings::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(anyhow!(err).context("failed to read .env file")),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Settings::default();

        settings.production = get("PORT").is_some()
            || get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        if let Some(port) = parse(&get, "PORT")? {
            settings.port = port;
        }
        if let Some(host) = get("BIND_HOST") {
            settings.bind_host = host;
        }
        settings.default_token = get("TELEGRAM_BOT_TOKEN");
        settings.default_chat_id = get("TELEGRAM_CHAT_ID");

        let monitor = &mut settings.monitor;
        if let Some(secs) = parse::<f64>(&get, "SCRAPE_INTERVAL_SECS")? {
            monitor.scrape_interval = seconds("SCRAPE_INTERVAL_SECS", secs)?;
            if monitor.scrape_interval.is_zero() {
                bail!("SCRAPE_INTERVAL_SECS must be greater than zero");
            }
        }
        if let Some(threshold) = parse::<f64>(&get, "PLAYER_WIN_THRESHOLD")? {
            if !(0.0..=100.0).contains(&threshold) {
                bail!("PLAYER_WIN_THRESHOLD must be within 0..=100, got {threshold}");
            }
            monitor.alert_threshold = threshold;
        }
        if let Some(secs) = parse::<f64>(&get, "ALERT_COOLDOWN_SECS")? {
            monitor.alert_cooldown = seconds("ALERT_COOLDOWN_SECS", secs)?;
        }
        if let Some(points) = parse::<f64>(&get, "STATUS_CHANGE_THRESHOLD")? {
            // Zero or less turns change-driven status messages off.
            monitor.status_change_threshold = (points > 0.0).then_some(points);
        }
        if let Some(secs) = parse::<f64>(&get, "STATUS_INTERVAL_SECS")? {
            let every = seconds("STATUS_INTERVAL_SECS", secs)?;
            monitor.status_interval = (!every.is_zero()).then_some(every);
        }
        if let Some(failure_status) = flag(&get, "FAILURE_STATUS")? {
            monitor.failure_status = failure_status;
        }
        if let Some(language) = parse(&get, "LANGUAGE")? {
            monitor.language = language;
        }
        if let Some(announce) = flag(&get, "ANNOUNCE_START")? {
            monitor.announce_start = announce;
        }

        let renderer = &mut settings.renderer;
        if let Some(url) = get("WEBDRIVER_URL") {
            renderer.webdriver_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("BACBO_URL") {
            renderer.game_url = url;
        }
        renderer.headless = settings.production || flag(&get, "HEADLESS")?.unwrap_or(false);
        renderer.chrome_binary = get("CHROME_BIN");
        if let Some(secs) = parse::<f64>(&get, "PAGE_SETTLE_SECS")? {
            renderer.page_settle = seconds("PAGE_SETTLE_SECS", secs)?;
        }

        let ocr = &mut settings.ocr;
        if let Some(command) = get("TESSERACT_CMD") {
            ocr.command = command;
        }
        if let Some(language) = get("TESSERACT_LANG") {
            ocr.language = language;
        }
        if let Some(upscale) = parse::<u32>(&get, "OCR_UPSCALE")? {
            ocr.upscale = upscale.clamp(1, 4);
        }

        if let Some(api_base) = get("TELEGRAM_API_URL") {
            settings.notifier.api_base = api_base.trim_end_matches('/').to_string();
        }

        let extraction = &mut settings.extraction;
        if let Some(policy) = parse::<AmbiguityPolicy>(&get, "AMBIGUITY_POLICY")? {
            extraction.ambiguity = policy;
        }
        if let Some(window) = parse(&get, "OCR_LINE_WINDOW")? {
            extraction.line_window = window;
        }
        if let Some(bare) = flag(&get, "ACCEPT_BARE_NUMBERS")? {
            extraction.accept_bare_numbers = bare;
        }
        if let Some(triplet) = flag(&get, "INFER_UNLABELED_TRIPLET")? {
            extraction.infer_unlabeled_triplet = triplet;
        }

        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| anyhow!("{err}"))
                .with_context(|| format!("invalid value '{raw}' for {key}"))
        })
        .transpose()
}

fn flag(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    get(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("invalid boolean '{raw}' for {key}")),
        })
        .transpose()
}

fn seconds(key: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("{key} must be a non-negative number"))
}
