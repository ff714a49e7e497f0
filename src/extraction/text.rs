use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{text_lines, Extractor, LineMatcher};
use crate::models::{Observation, Percentages, Source};
use crate::renderer::PageRenderer;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Fallback extractor over the page's visible text, then each iframe's.
pub struct TextExtractor {
    matcher: Arc<LineMatcher>,
}

impl TextExtractor {
    pub fn new(matcher: Arc<LineMatcher>) -> Self {
        Self { matcher }
    }

    fn scan(&self, text: &str) -> Percentages {
        self.matcher.extract(&text_lines(text))
    }

    async fn scan_frames(&self, renderer: &mut dyn PageRenderer) -> Result<Percentages> {
        let frames = renderer.find_iframes().await?;
        log_debug!("searching {} iframes for statistics", frames.len());

        for frame in &frames {
            // Element references belong to the top document.
            renderer.switch_to_frame(None).await?;
            if let Err(err) = renderer.switch_to_frame(Some(frame)).await {
                log_warn!("cannot enter iframe #{}: {err:#}", frame.index);
                continue;
            }
            match renderer.get_text().await {
                Ok(text) => {
                    let found = self.scan(&text);
                    if !found.is_empty() {
                        log_debug!("statistics found in iframe #{}", frame.index);
                        return Ok(found);
                    }
                }
                Err(err) => log_warn!("cannot read iframe #{}: {err:#}", frame.index),
            }
        }
        Ok(Percentages::default())
    }
}

#[async_trait]
impl Extractor for TextExtractor {
    fn source(&self) -> Source {
        Source::Html
    }

    async fn extract(&self, renderer: &mut dyn PageRenderer) -> Result<Option<Observation>> {
        // A cycle cut short may have left the session inside an iframe.
        renderer.switch_to_frame(None).await?;
        let text = renderer.get_text().await?;
        let mut found = self.scan(&text);

        if found.is_empty() {
            let framed = self.scan_frames(renderer).await;
            let restored = renderer.switch_to_frame(None).await;
            found = framed?;
            restored?;
        }

        Ok(Observation::from_percentages(found, Source::Html))
    }
}
