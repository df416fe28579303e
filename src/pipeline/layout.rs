//! Layout extraction: turn document bytes into page-tagged content elements.
//!
//! The external layout-analysis service receives the document as a multipart
//! upload (field `document`) with a bearer credential and answers with
//!
//! ```json
//! { "billed_pages": 2,
//!   "elements": [ { "page": 0, "category": "table", "html": "<table>…</table>" },
//!                 { "page": 0, "category": "paragraph", "text": "Total assets" } ] }
//! ```
//!
//! [`UpstageLayoutClient`] is the production [`LayoutExtractor`]; the
//! evaluator only sees the trait.

use crate::config::EvaluatorConfig;
use crate::error::EvaluationError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Largest page count accepted from the service.
pub const MAX_BILLED_PAGES: usize = 10_000;

/// Content category of a layout element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCategory {
    /// Rendered with its HTML markup, verbatim.
    Table,
    Text,
    /// Any other category the service reports (paragraph, heading1, caption, …).
    /// Rendered as plain text.
    Other(String),
}

impl From<&str> for ElementCategory {
    fn from(value: &str) -> Self {
        match value {
            "table" => ElementCategory::Table,
            "text" => ElementCategory::Text,
            other => ElementCategory::Other(other.to_string()),
        }
    }
}

impl ElementCategory {
    pub fn is_table(&self) -> bool {
        matches!(self, ElementCategory::Table)
    }
}

/// One unit of extracted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutElement {
    /// Zero-based page index.
    pub page: usize,
    pub category: ElementCategory,
    /// HTML markup for tables, plain text otherwise.
    pub content: String,
}

impl LayoutElement {
    pub fn table(page: usize, html: impl Into<String>) -> Self {
        Self {
            page,
            category: ElementCategory::Table,
            content: html.into(),
        }
    }

    pub fn text(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            category: ElementCategory::Text,
            content: text.into(),
        }
    }
}

/// The layout service's view of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutAnalysis {
    /// Pages the service processed; bounds the page loop.
    pub billed_pages: usize,
    /// Elements in the order the service returned them.
    pub elements: Vec<LayoutElement>,
}

impl LayoutAnalysis {
    /// Decode the service's JSON body.
    ///
    /// Tables must carry `html` and every other element must carry `text`;
    /// an element missing the field its category is rendered from is
    /// [`EvaluationError::MalformedLayout`], as is a `billed_pages` above
    /// [`MAX_BILLED_PAGES`].
    pub fn from_json(body: &[u8]) -> Result<Self, EvaluationError> {
        let raw: RawAnalysis =
            serde_json::from_slice(body).map_err(|e| EvaluationError::MalformedLayout {
                detail: e.to_string(),
            })?;

        if raw.billed_pages > MAX_BILLED_PAGES {
            return Err(EvaluationError::MalformedLayout {
                detail: format!(
                    "billed_pages {} exceeds the limit of {MAX_BILLED_PAGES}",
                    raw.billed_pages
                ),
            });
        }

        let elements = raw
            .elements
            .into_iter()
            .enumerate()
            .map(|(idx, el)| el.into_element(idx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            billed_pages: raw.billed_pages,
            elements,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    billed_pages: usize,
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    page: usize,
    category: String,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl RawElement {
    fn into_element(self, idx: usize) -> Result<LayoutElement, EvaluationError> {
        let category = ElementCategory::from(self.category.as_str());
        let (field, content) = if category.is_table() {
            ("html", self.html)
        } else {
            ("text", self.text)
        };
        let content = content.ok_or_else(|| EvaluationError::MalformedLayout {
            detail: format!(
                "element {idx} (page {}, category '{}') has no '{field}' field",
                self.page, self.category
            ),
        })?;
        Ok(LayoutElement {
            page: self.page,
            category,
            content,
        })
    }
}

/// Converts raw document bytes into a [`LayoutAnalysis`].
#[async_trait]
pub trait LayoutExtractor: Send + Sync {
    async fn extract(&self, document: Vec<u8>) -> Result<LayoutAnalysis, EvaluationError>;
}

/// HTTP client for the Upstage layout-analysis endpoint.
#[derive(Debug, Clone)]
pub struct UpstageLayoutClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl UpstageLayoutClient {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, EvaluationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EvaluationError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvaluationError> {
        Self::new(
            &config.layout_url,
            &config.layout_api_key,
            config.layout_timeout_secs,
        )
    }
}

#[async_trait]
impl LayoutExtractor for UpstageLayoutClient {
    async fn extract(&self, document: Vec<u8>) -> Result<LayoutAnalysis, EvaluationError> {
        info!("Submitting {} bytes for layout analysis", document.len());

        let form = Form::new().part("document", Part::bytes(document).file_name("document"));
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EvaluationError::Extraction {
                reason: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Extraction {
                reason: format!("HTTP {status}: {}", truncate(&body, 200)),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EvaluationError::Extraction {
                reason: e.to_string(),
            })?;
        let analysis = LayoutAnalysis::from_json(&body)?;
        debug!(
            "Layout analysis: {} billed pages, {} elements",
            analysis.billed_pages,
            analysis.elements.len()
        );
        Ok(analysis)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
