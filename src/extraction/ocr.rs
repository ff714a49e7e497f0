use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{screenshot::prepare_for_ocr, text_lines, Extractor, LineMatcher};
use crate::models::{Observation, Source};
use crate::renderer::PageRenderer;
use crate::settings::OcrSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Turns a PNG into text, one recognised line per output line.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, png_bytes: Vec<u8>) -> Result<String>;
}

/// Runs the `tesseract` CLI with the image on stdin and text on stdout.
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(settings: &OcrSettings) -> Self {
        Self {
            command: settings.command.clone(),
            language: settings.language.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, png_bytes: Vec<u8>) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn OCR command '{}'", self.command))?;

        let mut stdin = child
            .stdin
            .take()
            .context("OCR process has no stdin")?;
        stdin
            .write_all(&png_bytes)
            .await
            .context("failed to write screenshot to OCR process")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("OCR process did not finish")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("OCR exited with {}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Primary extractor: full-page screenshot, OCR, keyword matching.
pub struct OcrExtractor {
    engine: Arc<dyn OcrEngine>,
    matcher: Arc<LineMatcher>,
    upscale: u32,
    min_screenshot_bytes: usize,
}

impl OcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, matcher: Arc<LineMatcher>, settings: &OcrSettings) -> Self {
        Self {
            engine,
            matcher,
            upscale: settings.upscale,
            min_screenshot_bytes: settings.min_screenshot_bytes,
        }
    }
}

#[async_trait]
impl Extractor for OcrExtractor {
    fn source(&self) -> Source {
        Source::Ocr
    }

    async fn extract(&self, renderer: &mut dyn PageRenderer) -> Result<Option<Observation>> {
        // A cycle cut short may have left the session inside an iframe.
        renderer.switch_to_frame(None).await?;
        let png_bytes = renderer
            .get_screenshot()
            .await
            .context("screenshot failed")?;

        let (upscale, min_bytes) = (self.upscale, self.min_screenshot_bytes);
        let prepared = tokio::task::spawn_blocking(move || {
            prepare_for_ocr(&png_bytes, upscale, min_bytes)
        })
        .await
        .context("screenshot worker join failed")??;

        let started = std::time::Instant::now();
        let text = self.engine.recognize(prepared).await?;
        let lines = text_lines(&text);
        log_info!(
            "OCR completed: {} lines in {}ms",
            lines.len(),
            started.elapsed().as_millis()
        );
        log_debug!("OCR text: {:?}", lines);

        let found = self.matcher.extract(&lines);
        Ok(Observation::from_percentages(found, Source::Ocr))
    }
}
