//! Session-wide analysis backend state
//!
//! The full feature extractor is initialized lazily, exactly once, the first
//! time any track needs it. Concurrent callers block on the same
//! initialization and share its outcome. A failed initialization downgrades
//! the whole session to the reduced backend; it is never retried.

use super::stratum::StratumExtractor;
use super::tempo::OnsetTempoDetector;
use super::traits::{FeatureExtractor, TempoDetector};
use crate::error::Result;
use std::sync::OnceLock;

/// Which backend the session ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Full,
    Reduced,
}

type ExtractorFactory = Box<dyn Fn() -> Result<Box<dyn FeatureExtractor>> + Send + Sync>;

/// Backend gate plus the secondary tempo detector, shared by all analyze calls
pub struct AnalysisContext {
    factory: ExtractorFactory,
    extractor: OnceLock<Option<Box<dyn FeatureExtractor>>>,
    detector: Box<dyn TempoDetector>,
}

impl AnalysisContext {
    /// Context backed by stratum-dsp and the onset tempo detector
    pub fn new() -> Self {
        Self::with_backends(
            || Ok(Box::new(StratumExtractor::initialize()?) as Box<dyn FeatureExtractor>),
            OnsetTempoDetector::new(),
        )
    }

    /// Context that never attempts the full backend
    pub fn reduced() -> Self {
        let ctx = Self::new();
        let _ = ctx.extractor.set(None);
        ctx
    }

    /// Context with custom backends
    pub fn with_backends<F, D>(factory: F, detector: D) -> Self
    where
        F: Fn() -> Result<Box<dyn FeatureExtractor>> + Send + Sync + 'static,
        D: TempoDetector + 'static,
    {
        Self {
            factory: Box::new(factory),
            extractor: OnceLock::new(),
            detector: Box::new(detector),
        }
    }

    /// The full extractor, initializing it on first use
    pub fn extractor(&self) -> Option<&dyn FeatureExtractor> {
        self.extractor
            .get_or_init(|| match (self.factory)() {
                Ok(extractor) => {
                    log::info!("Feature extraction backend ready (full analysis)");
                    Some(extractor)
                }
                Err(e) => {
                    log::warn!("{} - falling back to reduced analysis for this session", e);
                    None
                }
            })
            .as_deref()
    }

    pub fn detector(&self) -> &dyn TempoDetector {
        self.detector.as_ref()
    }

    /// Backend mode, initializing the backend if that has not happened yet
    pub fn mode(&self) -> BackendMode {
        if self.extractor().is_some() {
            BackendMode::Full
        } else {
            BackendMode::Reduced
        }
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MixError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_failed_init_downgrades_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let ctx = AnalysisContext::with_backends(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(MixError::BackendUnavailable("not installed".into()))
            },
            OnsetTempoDetector::new(),
        );

        assert_eq!(ctx.mode(), BackendMode::Reduced);
        assert_eq!(ctx.mode(), BackendMode::Reduced);
        assert!(ctx.extractor().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_callers_share_init() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let ctx = AnalysisContext::with_backends(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Box::new(StratumExtractor) as Box<dyn FeatureExtractor>)
            },
            OnsetTempoDetector::new(),
        );

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert_eq!(ctx.mode(), BackendMode::Full));
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reduced_context_skips_init() {
        assert_eq!(AnalysisContext::reduced().mode(), BackendMode::Reduced);
    }
}
