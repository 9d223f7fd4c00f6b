use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::verification::domain::Platform;
use crate::workflows::verification::router::{decision_handler, verify_handler, DecisionPayload};
use crate::workflows::verification::{
    verification_router, DecisionRepository, HumanDecision, VerificationService,
};

fn approving_service() -> (
    VerificationService<MemoryRecords, MemoryDecisions>,
    Arc<MemoryRecords>,
    Arc<MemoryDecisions>,
) {
    build_service(
        providers(&[Platform::OpenAi, Platform::Anthropic]),
        adapters(vec![
            (Platform::OpenAi, Script::Approve),
            (Platform::Anthropic, Script::Approve),
        ]),
        MemoryDocuments::default(),
    )
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn verify_route_returns_the_consensus_decision() {
    let (service, records, _) = approving_service();
    let router = verification_router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/verifications",
            serde_json::to_value(request()).unwrap(),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["approved"], true);
    assert_eq!(payload["kind"], "unanimous_approval");
    assert_eq!(payload["needsManualReview"], false);
    assert_eq!(
        payload["perProviderResults"].as_array().map(Vec::len),
        Some(2)
    );
    assert_eq!(records.snapshot().len(), 2);
}

#[tokio::test]
async fn verify_handler_returns_precondition_failed_with_one_provider() {
    let (service, _, _) = build_service(
        providers(&[Platform::Gemini]),
        adapters(vec![(Platform::Gemini, Script::Approve)]),
        MemoryDocuments::default(),
    );

    let response = verify_handler::<MemoryRecords, MemoryDecisions>(
        State(Arc::new(service)),
        axum::Json(request()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("found 1")));
}

#[tokio::test]
async fn verify_handler_rejects_when_documents_are_missing() {
    let (service, records, _) = build_service(
        providers(&[Platform::OpenAi, Platform::Anthropic]),
        adapters(vec![
            (Platform::OpenAi, Script::Approve),
            (Platform::Anthropic, Script::Approve),
        ]),
        MemoryDocuments::default().without(IDENTITY_REF),
    );

    let response = verify_handler::<MemoryRecords, MemoryDecisions>(
        State(Arc::new(service)),
        axum::Json(request()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["approved"], false);
    assert_eq!(payload["kind"], "unanimous_rejection");
    assert_eq!(records.snapshot().len(), 2);
}

#[tokio::test]
async fn service_history_reads_what_the_orchestrator_wrote() {
    let (service, _, _) = approving_service();

    service.verify(request()).await.expect("run succeeds");

    assert_eq!(service.records(APPLICATION).expect("readable").len(), 2);
    service
        .record_decision(APPLICATION, HumanDecision::Approved)
        .expect("decision recorded");
    let overall = service.overall_stats().expect("stats");
    assert_eq!(overall.total_verifications, 2);
    assert_eq!(overall.accuracy, 100.0);
}

#[tokio::test]
async fn decision_handler_rejects_unknown_applications() {
    let (service, _, decisions) = approving_service();

    let response = decision_handler::<MemoryRecords, MemoryDecisions>(
        State(Arc::new(service)),
        Path(999),
        axum::Json(DecisionPayload {
            decision: HumanDecision::Approved,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(decisions.all()
        .expect("readable")
        .is_empty());
}

#[tokio::test]
async fn recorded_decisions_feed_the_accuracy_endpoints() {
    let (service, _, _) = approving_service();
    let service = Arc::new(service);
    service.verify(request()).await.expect("run succeeds");
    let router = verification_router(service.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/verifications/42/decision",
            json!({ "decision": "rejected" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/accuracy/providers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let providers = read_json_body(response).await;
    let providers = providers.as_array().expect("provider list");
    assert_eq!(providers.len(), 2);
    assert!(providers
        .iter()
        .all(|entry| entry["falsePositive"] == 1 && entry["accuracy"] == 0.0));

    let response = router
        .oneshot(
            Request::get("/api/v1/accuracy/overall")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    let overall = read_json_body(response).await;
    assert_eq!(overall["totalVerifications"], 2);
    assert_eq!(overall["falsePositiveRate"], 100.0);
}

#[tokio::test]
async fn records_route_lists_history_for_an_application() {
    let (service, _, _) = approving_service();
    let service = Arc::new(service);
    service.verify(request()).await.expect("run succeeds");

    let response = verification_router(service)
        .oneshot(
            Request::get("/api/v1/verifications/42/records")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let records = read_json_body(response).await;
    let records = records.as_array().expect("record list");
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record["applicationId"] == 42 && record["result"] == "approved"));
}

#[tokio::test]
async fn progress_route_opens_an_event_stream() {
    let (service, _, _) = approving_service();
    let service = Arc::new(service);
    let response = verification_router(service)
        .oneshot(
            Request::get("/api/v1/verifications/42/progress")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some(mime::TEXT_EVENT_STREAM.as_ref())
    );
}
