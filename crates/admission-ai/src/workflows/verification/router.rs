use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, HumanDecision, VerificationRequest};
use super::orchestrator::OrchestrationError;
use super::repository::{DecisionRepository, RepositoryError, VerificationRecordStore};
use super::service::{VerificationService, VerificationServiceError};

/// Router builder exposing verification, progress, and accuracy endpoints.
pub fn verification_router<S, H>(service: Arc<VerificationService<S, H>>) -> Router
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    Router::new()
        .route("/api/v1/verifications", post(verify_handler::<S, H>))
        .route(
            "/api/v1/verifications/:application_id/progress",
            get(progress_handler::<S, H>),
        )
        .route(
            "/api/v1/verifications/:application_id/records",
            get(records_handler::<S, H>),
        )
        .route(
            "/api/v1/verifications/:application_id/decision",
            put(decision_handler::<S, H>),
        )
        .route("/api/v1/accuracy/providers", get(provider_stats_handler::<S, H>))
        .route("/api/v1/accuracy/overall", get(overall_stats_handler::<S, H>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionPayload {
    pub(crate) decision: HumanDecision,
}

fn error_response(error: VerificationServiceError) -> Response {
    let status = match &error {
        VerificationServiceError::Orchestration(OrchestrationError::InsufficientProviders {
            ..
        }) => StatusCode::PRECONDITION_FAILED,
        VerificationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VerificationServiceError::Orchestration(OrchestrationError::Registry(_))
        | VerificationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn verify_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
    axum::Json(request): axum::Json<VerificationRequest>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    match service.verify(request).await {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn progress_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
    Path(application_id): Path<i64>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    let events = service
        .subscribe(ApplicationId(application_id))
        .map(|event| Event::default().event("progress").json_data(event));

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub(crate) async fn records_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
    Path(application_id): Path<i64>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    match service.records(ApplicationId(application_id)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
    Path(application_id): Path<i64>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    match service.record_decision(ApplicationId(application_id), payload.decision) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn provider_stats_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    match service.provider_stats() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn overall_stats_handler<S, H>(
    State(service): State<Arc<VerificationService<S, H>>>,
) -> Response
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    match service.overall_stats() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}
