//! Progress-callback trait for stage and per-page evaluation events.
//!
//! Inject an [`Arc<dyn EvaluationProgressCallback>`] via
//! [`crate::config::EvaluatorConfigBuilder::progress_callback`] to observe an
//! evaluation as it moves through the pipeline. The CLI uses it to drive a
//! progress bar; the HTTP service runs without one.
//!
//! # Example
//!
//! ```rust
//! use edgequake_loan_eval::{EvaluationProgressCallback, EvaluatorConfig, PipelineStage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl EvaluationProgressCallback for StageLogger {
//!     fn on_stage(&self, stage: PipelineStage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = EvaluatorConfig::builder()
//!     .layout_api_key("up-test")
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn EvaluationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PipelineStage;
use std::sync::Arc;

/// Called by the evaluation pipeline as it advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `summary_concurrency > 1` the page events may
/// arrive from several tasks at once.
pub trait EvaluationProgressCallback: Send + Sync {
    /// Called on entry to each stage, including the final `Done`.
    fn on_stage(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called once the layout service has reported the page count.
    fn on_pages_known(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's summary request is sent.
    ///
    /// # Arguments
    /// * `page`        — zero-based page index
    /// * `total_pages` — billed pages in the document
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page has been summarized (or skipped as empty).
    ///
    /// # Arguments
    /// * `page`        — zero-based page index
    /// * `total_pages` — billed pages in the document
    /// * `summary_len` — byte length of the summary; 0 for pages without
    ///   substantive financial content
    fn on_page_complete(&self, page: usize, total_pages: usize, summary_len: usize) {
        let _ = (page, total_pages, summary_len);
    }

    /// Called once with the final stance when the evaluation succeeds.
    fn on_evaluation_complete(&self, stance: bool) {
        let _ = stance;
    }

    /// Called once when the evaluation fails.
    fn on_evaluation_failed(&self, stage: PipelineStage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl EvaluationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EvaluatorConfig`].
pub type ProgressCallback = Arc<dyn EvaluationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<PipelineStage>>,
        completes: AtomicUsize,
        summary_bytes: AtomicUsize,
    }

    impl EvaluationProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_page_complete(&self, _page: usize, _total_pages: usize, summary_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.summary_bytes.fetch_add(summary_len, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(PipelineStage::Fetching);
        cb.on_pages_known(2);
        cb.on_page_start(0, 2);
        cb.on_page_complete(0, 2, 42);
        cb.on_evaluation_failed(PipelineStage::Deciding, "bad json");
        cb.on_evaluation_complete(true);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_stage(PipelineStage::Fetching);
        tracker.on_stage(PipelineStage::Summarizing(0));
        tracker.on_page_complete(0, 2, 16);
        tracker.on_stage(PipelineStage::Summarizing(1));
        tracker.on_page_complete(1, 2, 0);

        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.summary_bytes.load(Ordering::SeqCst), 16);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![
                PipelineStage::Fetching,
                PipelineStage::Summarizing(0),
                PipelineStage::Summarizing(1)
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage(PipelineStage::Done);
    }
}
