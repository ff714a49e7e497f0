use std::sync::Arc;

use super::{Extractor, LineMatcher, OcrExtractor, TesseractEngine, TextExtractor};
use crate::error::{MonitorError, MonitorResult};
use crate::models::Observation;
use crate::renderer::PageRenderer;
use crate::settings::Settings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Tries the primary extractor, then the fallback. Results are never merged.
pub struct StatisticsResolver {
    primary: Box<dyn Extractor>,
    fallback: Box<dyn Extractor>,
}

impl StatisticsResolver {
    pub fn new(primary: Box<dyn Extractor>, fallback: Box<dyn Extractor>) -> Self {
        Self { primary, fallback }
    }

    /// Tesseract OCR first, page text second, sharing one matcher.
    pub fn from_settings(settings: &Settings) -> Self {
        let matcher = Arc::new(LineMatcher::new(settings.extraction.clone()));
        let engine = Arc::new(TesseractEngine::new(&settings.ocr));
        Self::new(
            Box::new(OcrExtractor::new(engine, matcher.clone(), &settings.ocr)),
            Box::new(TextExtractor::new(matcher)),
        )
    }

    pub async fn resolve(&self, renderer: &mut dyn PageRenderer) -> MonitorResult<Observation> {
        for extractor in [&self.primary, &self.fallback] {
            match extractor.extract(renderer).await {
                Ok(Some(observation)) => return Ok(observation),
                Ok(None) => log_debug!("{:?} extraction found no percentages", extractor.source()),
                Err(err) => log_warn!("{:?} extraction failed: {err:#}", extractor.source()),
            }
        }
        Err(MonitorError::ExtractionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::testing::{FakePage, ScriptedExtractor};

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = ScriptedExtractor::new(Source::Ocr, [Some(52.0)]);
        let fallback = ScriptedExtractor::new(Source::Html, [Some(70.0)]);
        let fallback_calls = fallback.calls();
        let resolver = StatisticsResolver::new(Box::new(primary), Box::new(fallback));

        let obs = resolver.resolve(&mut FakePage::new("")).await.unwrap();
        assert_eq!(obs.player_pct, Some(52.0));
        assert_eq!(obs.source, Source::Ocr);
        assert_eq!(fallback_calls.get(), 0);
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_page_text() {
        let primary = ScriptedExtractor::failing(Source::Ocr);
        let fallback = ScriptedExtractor::new(Source::Html, [Some(48.0)]);
        let resolver = StatisticsResolver::new(Box::new(primary), Box::new(fallback));

        let obs = resolver.resolve(&mut FakePage::new("")).await.unwrap();
        assert_eq!(obs.source, Source::Html);
        assert_eq!(obs.player_pct, Some(48.0));
    }

    #[tokio::test]
    async fn both_empty_is_extraction_failed() {
        let primary = ScriptedExtractor::new(Source::Ocr, [None]);
        let fallback = ScriptedExtractor::failing(Source::Html);
        let resolver = StatisticsResolver::new(Box::new(primary), Box::new(fallback));

        let err = resolver.resolve(&mut FakePage::new("")).await.unwrap_err();
        assert!(matches!(err, MonitorError::ExtractionFailed));
    }

    #[tokio::test]
    async fn real_extractors_end_to_end() {
        let settings = Settings::default();
        let resolver = StatisticsResolver::new(
            Box::new(ScriptedExtractor::failing(Source::Ocr)),
            Box::new(TextExtractor::new(Arc::new(LineMatcher::new(
                settings.extraction.clone(),
            )))),
        );
        let mut page = FakePage::new("JOGADOR 52%\nBANCA 40%\nEMPATE 8%");
        let obs = resolver.resolve(&mut page).await.unwrap();
        assert_eq!(
            (obs.player_pct, obs.banker_pct, obs.tie_pct),
            (Some(52.0), Some(40.0), Some(8.0))
        );
    }
}
