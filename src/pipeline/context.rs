//! Context assembly: the page summaries, concatenated in page order.

use crate::pipeline::summarize::PageSummary;

/// Concatenate summaries in page order with no added separator.
///
/// Empty summaries contribute nothing. The result may be empty; the decision
/// stage still runs in that case.
pub fn assemble_context(summaries: &[PageSummary]) -> String {
    let mut ordered: Vec<&PageSummary> = summaries.iter().collect();
    ordered.sort_by_key(|s| s.page);
    ordered.iter().map(|s| s.text.as_str()).collect()
}
