//! Fixed instructions sent to the language models.
//!
//! Every prompt lives here so the summary and decision contracts can be read,
//! changed and tested in one place. The chat backend sends
//! [`DECISION_SYSTEM_PROMPT`]; the adapter was fine-tuned on its own prompt
//! layout, [`adapter_prompt`], which must not drift from that format.

/// System instruction for the per-page summary call.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert in financial analysis. Below is a page from a financial statement document.
Your task is to summarize the key financial information, including all relevant numerical figures, trends, and notable observations.
Ensure that no important numerical data is omitted. Your summary should be clear, concise, and no longer than 200 words, focusing only on the most significant details.
If you find the page lacks sufficient information for a summary, you MUST return an empty response."#;

/// System instruction for the decision call.
pub const DECISION_SYSTEM_PROMPT: &str = r#"You are a bank loan assistant tasked with determining the suitability of a loan applicant based on their provided financial statements. You must:

1. Analyze the latest financial data provided.
2. Decide whether the applicant is suitable for a loan.
3. Provide three reasons or insights supporting your decision.

Your insights must be backed up with financial figures. Be as critical as possible.

Your response MUST be in JSON format, following the example below STRICTLY:

{
    "stance": true,
    "insight_1": "Example of the first insight",
    "insight_2": "Example of the second insight",
    "insight_3": "Example of the third insight"
}"#;

/// User turn for the summary call.
pub fn summary_user_message(page_content: &str) -> String {
    format!("This is the text you are to summarize:\n{page_content}")
}

/// User turn for the decision call.
pub fn decision_user_message(context: &str) -> String {
    format!("These are the applicant's financial statements:\n{context}")
}

/// System turn the decision adapter was fine-tuned with.
pub const ADAPTER_SYSTEM_PROMPT: &str = r#"You are a bank loan assistant tasked with determining the suitability of a loan applicant based on their provided financial statements. You must:

1. Analyze the latest financial data provided.
2. Decide whether the applicant is suitable for a loan.
3. Provide three reasons or insights supporting your decision.

Your insights must be backed up with financial figures.

The output must be in JSON format, following the example below STRICTLY:

{
    "stance": true,
    "insight_1": "Example of the first insight",
    "insight_2": "Example of the second insight",
    "insight_3": "Example of the third insight"
}"#;

/// Single-string prompt for raw generation against the decision adapter.
///
/// Turns open with `<|im_start|> role` and are never closed; there is no
/// `<|im_end|>` and no assistant turn, matching the fine-tuning data.
pub fn adapter_prompt(context: &str) -> String {
    format!(
        "<|im_start|> system\n{ADAPTER_SYSTEM_PROMPT}\n\n<|im_start|> user\n\
         These are the applicant's financial statements:\n{context}\n"
    )
}
