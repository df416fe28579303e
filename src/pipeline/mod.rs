//! Pipeline stages for loan evaluation.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the network-facing ones can be swapped behind
//! their traits.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ layout ──▶ aggregate ──▶ summarize ──▶ context ──▶ generator ──▶ decision
//! (bytes)   (elements)  (per page)    (per page)    (string)    (model)       (parse)
//! ```
//!
//! 1. [`fetch`]     — download the document bytes; one attempt
//! 2. [`layout`]    — multipart upload to the layout-analysis service
//! 3. [`aggregate`] — one text blob per billed page, tables kept as markup
//! 4. [`summarize`] — one summary call per non-empty page, in page order
//! 5. [`context`]   — concatenate the summaries
//! 6. [`generator`] — chat or adapter backend produces the decision text
//! 7. [`decision`]  — strict four-field JSON validation

pub mod aggregate;
pub mod context;
pub mod decision;
pub mod fetch;
pub mod generator;
pub mod layout;
pub mod summarize;
