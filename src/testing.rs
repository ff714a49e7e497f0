//! Fakes for the collaborator traits, shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::error::NotifierError;
use crate::extraction::{Extractor, OcrEngine};
use crate::models::{Credentials, Observation, Percentages, Source};
use crate::notifier::Notifier;
use crate::renderer::{FrameRef, PageRenderer, RendererLauncher};

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory page: top-level text, iframe texts and an optional screenshot.
#[derive(Default)]
pub struct FakePage {
    text: String,
    frames: Vec<String>,
    screenshot: Option<Vec<u8>>,
    current: Option<usize>,
    switches: usize,
    closed: Arc<AtomicBool>,
}

impl FakePage {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_frame(mut self, text: &str) -> Self {
        self.frames.push(text.into());
        self
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    pub fn current_frame(&self) -> Option<usize> {
        self.current
    }

    pub fn frame_switches(&self) -> usize {
        self.switches
    }
}

#[async_trait]
impl PageRenderer for FakePage {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn get_text(&mut self) -> Result<String> {
        match self.current {
            None => Ok(self.text.clone()),
            Some(idx) => self
                .frames
                .get(idx)
                .cloned()
                .ok_or_else(|| anyhow!("no such frame")),
        }
    }

    async fn get_screenshot(&mut self) -> Result<Vec<u8>> {
        self.screenshot
            .clone()
            .ok_or_else(|| anyhow!("screenshot unavailable"))
    }

    async fn find_iframes(&mut self) -> Result<Vec<FrameRef>> {
        Ok((0..self.frames.len())
            .map(|index| FrameRef {
                index,
                element_id: format!("frame-{index}"),
            })
            .collect())
    }

    async fn switch_to_frame(&mut self, frame: Option<&FrameRef>) -> Result<()> {
        self.switches += 1;
        self.current = frame.map(|frame| frame.index);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    pub launches: Counter,
    pub closed: Arc<AtomicBool>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            launches: Counter::default(),
            closed: Arc::new(AtomicBool::new(false)),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RendererLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageRenderer>> {
        self.launches.bump();
        if self.fail {
            bail!("connection refused");
        }
        Ok(Box::new(FakePage {
            closed: self.closed.clone(),
            ..FakePage::new("")
        }))
    }
}

pub struct StaticOcr {
    text: String,
}

impl StaticOcr {
    pub fn new(text: &str) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl OcrEngine for StaticOcr {
    async fn recognize(&self, _png_bytes: Vec<u8>) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Yields one scripted player value per call; `None` means nothing found.
/// An exhausted script keeps returning `None`.
pub struct ScriptedExtractor {
    source: Source,
    script: Mutex<VecDeque<Option<f64>>>,
    fail: bool,
    calls: Counter,
}

impl ScriptedExtractor {
    pub fn new(source: Source, script: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            source,
            script: Mutex::new(script.into_iter().collect()),
            fail: false,
            calls: Counter::default(),
        }
    }

    pub fn failing(source: Source) -> Self {
        Self {
            fail: true,
            ..Self::new(source, [])
        }
    }

    pub fn calls(&self) -> Counter {
        self.calls.clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn source(&self) -> Source {
        self.source
    }

    async fn extract(&self, _renderer: &mut dyn PageRenderer) -> Result<Option<Observation>> {
        self.calls.bump();
        if self.fail {
            bail!("extractor unavailable");
        }
        let next = self.script.lock().unwrap().pop_front().flatten();
        Ok(next.and_then(|player| {
            let values = Percentages {
                player: Some(player),
                banker: Some(100.0 - player),
                tie: None,
            };
            Observation::from_percentages(values, self.source)
        }))
    }
}

/// Records every delivered message.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, _credentials: &Credentials, text: &str) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(NotifierError::Http("network unreachable".into()));
        }
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("123456:ABC-def_ghi", "-100200300").unwrap()
}
