use crate::infra::AppState;
use admission_ai::workflows::verification::{
    verification_router, DecisionRepository, VerificationRecordStore, VerificationService,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_verification_routes<S, H>(
    service: Arc<VerificationService<S, H>>,
) -> axum::Router
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    verification_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_verification_service;
    use admission_ai::config::VerificationConfig;
    use admission_ai::workflows::verification::{Platform, ProviderConfig};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn single_provider_config() -> VerificationConfig {
        VerificationConfig {
            providers: vec![ProviderConfig {
                platform: Platform::OpenAi,
                credential: "sk-test".to_string(),
                model: "gpt-4o".to_string(),
                enabled: true,
                endpoint: Some("http://127.0.0.1:1".to_string()),
            }],
            provider_timeout: Some(Duration::from_secs(1)),
            document_root: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn verification_routes_are_mounted_next_to_health_checks() {
        let service = Arc::new(
            build_verification_service(&single_provider_config()).expect("service builds"),
        );
        let router = with_verification_routes(service);

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);

        let request = json!({
            "applicationId": 5,
            "testName": "SAT",
            "testScore": "1540",
            "testCategory": "standardized",
            "identityDocumentRef": "id.png",
            "testResultDocumentRef": "result.pdf"
        });
        let response = router
            .oneshot(
                Request::post("/api/v1/verifications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&request).unwrap()))
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    }
}
