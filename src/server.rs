//! HTTP surface: one "evaluate loan" operation plus a health check.
//!
//! | Method | Path | Body | Success |
//! |--------|------|------|---------|
//! | `POST` | `/evaluate-loan` | `{"file_url": "https://…"}` | `200` + [`LoanDecision`] |
//! | `GET`  | `/health` | — | `200` + `{"status": "ok"}` |
//!
//! Any pipeline failure, including an unusable decision, is answered with
//! `500` and `{"detail": "<message>"}`. Insights are never partially returned.
//! A body that is not `{"file_url": "…"}` keeps the extractor's 4xx status
//! with the same `{"detail": …}` shape.

use crate::error::EvaluationError;
use crate::evaluate::LoanEvaluator;
use crate::pipeline::decision::LoanDecision;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Request body for `POST /evaluate-loan`.
#[derive(Debug, Deserialize)]
pub struct LoanRequest {
    pub file_url: String,
}

/// A failed request rendered as an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be read as a [`LoanRequest`].
    BadRequest(JsonRejection),
    Evaluation(EvaluationError),
}

impl From<EvaluationError> for ApiError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(rejection) => (
                rejection.status(),
                Json(json!({ "detail": rejection.body_text() })),
            )
                .into_response(),
            ApiError::Evaluation(e) => {
                let body = Json(json!({
                    "detail": e.to_string(),
                    "stage": e.stage().to_string(),
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Build the router around a shared evaluator.
pub fn router(evaluator: Arc<LoanEvaluator>) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/evaluate-loan", post(evaluate_loan))
        .with_state(evaluator)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn evaluate_loan(
    State(evaluator): State<Arc<LoanEvaluator>>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> Result<Json<LoanDecision>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("evaluate-loan rejected request body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;
    match evaluator.evaluate(&request.file_url).await {
        Ok(evaluation) => Ok(Json(evaluation.decision)),
        Err(e) => {
            warn!("evaluate-loan failed for '{}': {}", request.file_url, e);
            Err(e.into())
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(evaluator: Arc<LoanEvaluator>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "loan evaluation service ready");
    axum::serve(listener, router(evaluator)).await
}
