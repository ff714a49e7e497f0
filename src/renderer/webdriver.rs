//! W3C WebDriver client for a chromedriver endpoint.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use super::{FrameRef, PageRenderer, RendererLauncher};
use crate::settings::RendererSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/snap/bin/chromium",
];

const VISIBLE_TEXT_SCRIPT: &str = "return document.body ? document.body.innerText : '';";
const PAGE_SIZE_SCRIPT: &str = "return [\
    Math.max(document.body ? document.body.scrollWidth : 0, document.documentElement.scrollWidth), \
    Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)];";

/// Starts one chromedriver session per monitoring run.
pub struct WebDriverLauncher {
    client: reqwest::Client,
    settings: RendererSettings,
}

impl WebDriverLauncher {
    pub fn new(settings: RendererSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build WebDriver HTTP client")?;
        Ok(Self { client, settings })
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!(
                "--window-size={},{}",
                self.settings.window_width, self.settings.window_height
            ),
        ];
        if self.settings.headless {
            args.insert(0, "--headless=new".to_string());
        }

        let mut options = json!({ "args": args });
        let binary = self.settings.chrome_binary.clone().or_else(|| {
            CHROME_CANDIDATES
                .iter()
                .find(|path| Path::new(path).exists())
                .map(|path| path.to_string())
        });
        if let Some(binary) = binary {
            options["binary"] = Value::String(binary);
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": options,
                }
            }
        })
    }
}

#[async_trait]
impl RendererLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn PageRenderer>> {
        let url = format!("{}/session", self.settings.webdriver_url);
        let value = send(&self.client, Method::POST, &url, Some(self.capabilities()))
            .await
            .with_context(|| {
                format!(
                    "failed to create WebDriver session at {}",
                    self.settings.webdriver_url
                )
            })?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("WebDriver reply has no sessionId"))?
            .to_string();
        log_info!("WebDriver session {} started", session_id);

        let mut renderer = WebDriverRenderer {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.settings.webdriver_url, session_id),
            window: (self.settings.window_width, self.settings.window_height),
        };

        if let Err(err) = renderer.navigate(&self.settings.game_url).await {
            if let Err(close_err) = renderer.close().await {
                log_warn!("failed to close session after navigation error: {close_err:#}");
            }
            return Err(err);
        }

        // Dynamic statistics render after load.
        tokio::time::sleep(self.settings.page_settle).await;
        Ok(Box::new(renderer))
    }
}

/// One live chromedriver session.
pub struct WebDriverRenderer {
    client: reqwest::Client,
    /// `{webdriver_url}/session/{id}`
    base: String,
    /// Configured viewport, restored after every full-page capture.
    window: (u32, u32),
}

impl WebDriverRenderer {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base, path);
        send(&self.client, method, &url, body).await
    }

    async fn execute(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn set_window_size(&self, width: u32, height: u32) -> Result<()> {
        self.command(
            Method::POST,
            "/window/rect",
            Some(json!({ "width": width, "height": height })),
        )
        .await
        .map(drop)
    }

    async fn viewport_screenshot(&self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| anyhow!("screenshot reply is not a string"))?;
        STANDARD
            .decode(encoded)
            .context("screenshot is not valid base64")
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .with_context(|| format!("failed to navigate to {url}"))?;
        Ok(())
    }

    async fn get_text(&mut self) -> Result<String> {
        let value = self.execute(VISIBLE_TEXT_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn get_screenshot(&mut self) -> Result<Vec<u8>> {
        // Start from the configured size, not the current one: an interrupted
        // capture can leave the window at full-page size.
        let (base_width, base_height) = self.window;
        self.set_window_size(base_width, base_height).await?;
        let size = self.execute(PAGE_SIZE_SCRIPT).await?;
        let (width, height) = page_size(&size).unwrap_or(self.window);

        self.set_window_size(width.max(base_width), height.max(base_height))
            .await?;
        let shot = self.viewport_screenshot().await;
        if let Err(err) = self.set_window_size(base_width, base_height).await {
            log_warn!("failed to restore window size: {err:#}");
        }
        shot
    }

    async fn find_iframes(&mut self) -> Result<Vec<FrameRef>> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": "iframe" })),
            )
            .await?;
        Ok(frame_refs(&value))
    }

    async fn switch_to_frame(&mut self, frame: Option<&FrameRef>) -> Result<()> {
        let id = match frame {
            Some(frame) => json!({ ELEMENT_KEY: frame.element_id }),
            None => Value::Null,
        };
        self.command(Method::POST, "/frame", Some(json!({ "id": id })))
            .await
            .map(drop)
    }

    async fn close(&mut self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        log_info!("WebDriver session closed");
        Ok(())
    }
}

async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    parse_response(status, &text)
}

/// Unwrap the `value` member of a WebDriver reply, turning error replies into errors.
fn parse_response(status: StatusCode, body: &str) -> Result<Value> {
    let parsed: Value = serde_json::from_str(body)
        .with_context(|| format!("WebDriver returned non-JSON reply (status={status})"))?;
    let value = parsed.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        bail!("WebDriver error '{error}' (status={status}): {message}");
    }
    if !status.is_success() {
        bail!("WebDriver request failed with status {status}");
    }
    Ok(value)
}

fn page_size(value: &Value) -> Option<(u32, u32)> {
    let dims = value.as_array()?;
    let width = u32::try_from(dims.first()?.as_u64()?).ok()?;
    let height = u32::try_from(dims.get(1)?.as_u64()?).ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn frame_refs(value: &Value) -> Vec<FrameRef> {
    value
        .as_array()
        .map(|elements| {
            elements
                .iter()
                .filter_map(|element| element.get(ELEMENT_KEY)?.as_str())
                .enumerate()
                .map(|(index, id)| FrameRef {
                    index,
                    element_id: id.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
