//! Document fetching: download the applicant's document into memory.
//!
//! The layout service takes the bytes as a multipart upload, so there is no
//! temp file here. One attempt only; any failure aborts the evaluation.

use crate::config::is_http_url;
use crate::error::EvaluationError;
use std::time::Duration;
use tracing::{debug, info};

/// Download `url` and return the full body.
///
/// # Errors
/// * [`EvaluationError::InvalidInput`] — `url` is not http(s); no request is made
/// * [`EvaluationError::FetchTimeout`] — no complete response within `timeout_secs`
/// * [`EvaluationError::Fetch`] — connection failure or non-2xx status
pub async fn fetch_document(url: &str, timeout_secs: u64) -> Result<Vec<u8>, EvaluationError> {
    if !is_http_url(url) {
        return Err(EvaluationError::InvalidInput {
            input: url.to_string(),
        });
    }

    info!("Fetching document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EvaluationError::Internal(format!("HTTP client: {e}")))?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            EvaluationError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            EvaluationError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(EvaluationError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    debug!("Fetched {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_reference_without_network() {
        let err = fetch_document("/tmp/statement.pdf", 5).await.unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidInput { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn uppercase_scheme_is_fetched_not_rejected() {
        let err = fetch_document("HTTP://127.0.0.1:9/doc.pdf", 5)
            .await
            .unwrap_err();
        assert!(
            !matches!(err, EvaluationError::InvalidInput { .. }),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_error() {
        // Port 9 on loopback (discard) is closed on any sane test host.
        let err = fetch_document("http://127.0.0.1:9/doc.pdf", 5)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                EvaluationError::Fetch { .. } | EvaluationError::FetchTimeout { .. }
            ),
            "got: {err}"
        );
    }
}
