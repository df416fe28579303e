//! Page summarization: condense each page into a numerically faithful summary.
//!
//! All prompt text lives in [`crate::prompts`]. The model may legitimately
//! answer with an empty string for pages without substantive financial
//! content; that is a valid [`PageSummary`], not an error. Transport and
//! service failures abort the evaluation (no retry).

use crate::config::EvaluatorConfig;
use crate::error::{EvaluationError, PipelineStage};
use crate::pipeline::aggregate::PageContent;
use crate::progress::ProgressCallback;
use crate::prompts::{summary_user_message, SUMMARY_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// The summarizer's output for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// Zero-based page index.
    pub page: usize,
    /// Raw model output; may be empty.
    pub text: String,
    /// True when the page had no elements and no model call was made.
    pub skipped: bool,
}

/// Produces a free-text summary for one page.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `page`. Errors must be [`EvaluationError::Summary`] for `page.page`.
    async fn summarize(&self, page: &PageContent) -> Result<String, EvaluationError>;
}

/// [`Summarizer`] backed by a chat-completion provider.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &EvaluatorConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, page: &PageContent) -> Result<String, EvaluationError> {
        let messages = vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(summary_user_message(&page.text)),
        ];
        let options = self.options();

        let response = timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| EvaluationError::Summary {
                page: page.page,
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| EvaluationError::Summary {
                page: page.page,
                reason: e.to_string(),
            })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page.page, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Summarize every page, returning summaries in page order.
///
/// With `concurrency == 1` each call completes before the next begins. Larger
/// values keep up to that many calls in flight; results are still yielded in
/// page order. The first failure stops the loop and is returned.
pub async fn summarize_pages(
    summarizer: &dyn Summarizer,
    pages: &[PageContent],
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PageSummary>, EvaluationError> {
    let total = pages.len();
    let calls: Vec<_> = pages
        .iter()
        .map(|page| summarize_one(summarizer, page, total, progress))
        .collect();
    stream::iter(calls)
    .buffered(concurrency.max(1))
    .try_collect()
    .await
}

async fn summarize_one(
    summarizer: &dyn Summarizer,
    page: &PageContent,
    total: usize,
    progress: Option<&ProgressCallback>,
) -> Result<PageSummary, EvaluationError> {
    if let Some(cb) = progress {
        cb.on_stage(PipelineStage::Summarizing(page.page));
        cb.on_page_start(page.page, total);
    }

    let summary = if page.is_empty() {
        debug!("Page {}: no elements, skipping summary", page.page);
        PageSummary {
            page: page.page,
            text: String::new(),
            skipped: true,
        }
    } else {
        let start = Instant::now();
        let text = summarizer.summarize(page).await?;
        debug!(
            "Page {}: {} chars summarized to {} in {:?}",
            page.page,
            page.text.len(),
            text.len(),
            start.elapsed()
        );
        PageSummary {
            page: page.page,
            text,
            skipped: false,
        }
    };

    if let Some(cb) = progress {
        cb.on_page_complete(summary.page, total, summary.text.len());
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoSummarizer {
        seen: Mutex<Vec<usize>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        async fn summarize(&self, page: &PageContent) -> Result<String, EvaluationError> {
            self.seen.lock().unwrap().push(page.page);
            if self.fail_on == Some(page.page) {
                return Err(EvaluationError::Summary {
                    page: page.page,
                    reason: "HTTP 503".into(),
                });
            }
            Ok(format!("[p{}]", page.page))
        }
    }

    fn page(idx: usize, text: &str, elements: usize) -> PageContent {
        PageContent {
            page: idx,
            text: text.to_string(),
            element_count: elements,
        }
    }

    #[tokio::test]
    async fn sequential_in_page_order_skipping_empty_pages() {
        let s = EchoSummarizer {
            seen: Mutex::new(vec![]),
            fail_on: None,
        };
        let pages = vec![page(0, "\na", 1), page(1, "", 0), page(2, "\nc", 1)];
        let out = summarize_pages(&s, &pages, 1, None).await.unwrap();

        assert_eq!(*s.seen.lock().unwrap(), vec![0, 2]);
        assert_eq!(
            out.iter().map(|p| p.text.as_str()).collect::<Vec<_>>(),
            vec!["[p0]", "", "[p2]"]
        );
        assert!(out[1].skipped);
    }

    #[tokio::test]
    async fn first_failure_aborts_remaining_pages() {
        let s = EchoSummarizer {
            seen: Mutex::new(vec![]),
            fail_on: Some(1),
        };
        let pages = vec![page(0, "\na", 1), page(1, "\nb", 1), page(2, "\nc", 1)];
        let err = summarize_pages(&s, &pages, 1, None).await.unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Summarizing(1));
        assert_eq!(*s.seen.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn concurrent_mode_keeps_page_order() {
        let s = EchoSummarizer {
            seen: Mutex::new(vec![]),
            fail_on: None,
        };
        let pages: Vec<_> = (0..6).map(|i| page(i, "\nx", 1)).collect();
        let out = summarize_pages(&s, &pages, 4, None).await.unwrap();
        assert_eq!(
            out.iter().map(|p| p.page).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4, 5]
        );
    }
}
