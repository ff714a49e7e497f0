//! Page renderer seam: the browser the monitor reads the game through.

pub mod webdriver;

use anyhow::Result;
use async_trait::async_trait;

pub use webdriver::{WebDriverLauncher, WebDriverRenderer};

/// Handle to an `<iframe>` of the current top-level document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    pub index: usize,
    pub element_id: String,
}

/// A live browser page. Owned by exactly one alert loop at a time.
#[async_trait]
pub trait PageRenderer: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Visible text of the document currently switched into.
    async fn get_text(&mut self) -> Result<String>;

    /// Full-page PNG of the top-level document.
    async fn get_screenshot(&mut self) -> Result<Vec<u8>>;

    async fn find_iframes(&mut self) -> Result<Vec<FrameRef>>;

    /// `None` returns to the top-level document.
    async fn switch_to_frame(&mut self, frame: Option<&FrameRef>) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Creates renderer instances when monitoring starts.
#[async_trait]
pub trait RendererLauncher: Send + Sync {
    /// Start a browser session already showing the game page.
    async fn launch(&self) -> Result<Box<dyn PageRenderer>>;
}
