//! Percentage extraction: OCR over a screenshot first, visible page text second.

pub mod config;
pub mod keywords;
pub mod matcher;
pub mod ocr;
pub mod percent;
pub mod resolver;
pub mod screenshot;
pub mod text;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Observation, Source};
use crate::renderer::PageRenderer;

pub use config::{AmbiguityPolicy, ExtractionConfig};
pub use matcher::LineMatcher;
pub use ocr::{OcrEngine, OcrExtractor, TesseractEngine};
pub use resolver::StatisticsResolver;
pub use text::TextExtractor;

/// One way of turning the current page into an [`Observation`].
///
/// `Ok(None)` means the method ran but found no percentage; `Err` means it
/// could not run at all (no screenshot, OCR engine missing, ...).
#[async_trait]
pub trait Extractor: Send + Sync {
    fn source(&self) -> Source;

    async fn extract(&self, renderer: &mut dyn PageRenderer) -> Result<Option<Observation>>;
}

/// Trimmed, non-blank lines in their original order.
pub(crate) fn text_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
