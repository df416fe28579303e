//! Page aggregation: one text blob per billed page.
//!
//! Each page is built by scanning the whole element list for elements on that
//! page, keeping the service's order. Every element contributes a line break
//! followed by its content: table markup verbatim, everything else as plain
//! text. The scan is O(pages × elements); statements run to tens of pages.

use crate::pipeline::layout::LayoutElement;
use tracing::warn;

/// The concatenated content of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Zero-based page index.
    pub page: usize,
    pub text: String,
    /// Elements that contributed to `text`.
    pub element_count: usize,
}

impl PageContent {
    /// A page with no elements. Such pages are not sent to the summarizer.
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }
}

/// Build one [`PageContent`] per page index in `0..billed_pages`.
///
/// Elements reporting a page outside that range are never selected.
pub fn aggregate_pages(elements: &[LayoutElement], billed_pages: usize) -> Vec<PageContent> {
    let stray = elements.iter().filter(|e| e.page >= billed_pages).count();
    if stray > 0 {
        warn!(
            "{} layout elements reference pages beyond billed_pages={}; ignored",
            stray, billed_pages
        );
    }

    (0..billed_pages)
        .map(|page| render_page(elements, page))
        .collect()
}

fn render_page(elements: &[LayoutElement], page: usize) -> PageContent {
    let mut text = String::new();
    let mut element_count = 0;
    for element in elements.iter().filter(|e| e.page == page) {
        // `content` already holds markup for tables and plain text otherwise.
        text.push('\n');
        text.push_str(&element.content);
        element_count += 1;
    }
    PageContent {
        page,
        text,
        element_count,
    }
}
