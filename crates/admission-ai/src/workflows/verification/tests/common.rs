use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::workflows::verification::documents::{
    Document, DocumentError, DocumentStore, StoredDocument,
};
use crate::workflows::verification::domain::{
    ApplicationId, DocumentRef, HumanDecision, Platform, ProviderConfig, ProviderVerdict,
    RecordedVerdict, TestCategory, VerificationRecord, VerificationRequest, VerificationResult,
};
use crate::workflows::verification::payload::VerificationPayload;
use crate::workflows::verification::progress::{
    ProgressBroadcaster, ProgressEvent, ProgressSubscription,
};
use crate::workflows::verification::providers::{AdapterSet, ProviderAdapter, ProviderCallError};
use crate::workflows::verification::registry::StaticProviderRegistry;
use crate::workflows::verification::repository::{
    AlertError, DecisionRepository, RepositoryError, ReviewAlert, ReviewAlertPublisher,
    VerificationRecordStore,
};
use crate::workflows::verification::{
    verification_router, VerificationOrchestrator, VerificationService,
};

pub(crate) const APPLICATION: ApplicationId = ApplicationId(42);
pub(crate) const IDENTITY_REF: &str = "uploads/42/id.png";
pub(crate) const RESULT_REF: &str = "uploads/42/result.jpg";

pub(crate) fn request() -> VerificationRequest {
    VerificationRequest {
        application_id: APPLICATION,
        test_name: "WAIS-IV".to_string(),
        test_score: "134".to_string(),
        test_category: TestCategory::Intelligence,
        identity_document_ref: DocumentRef(IDENTITY_REF.to_string()),
        test_result_document_ref: DocumentRef(RESULT_REF.to_string()),
    }
}

fn stored(media_type: mime::Mime, filename: &str) -> StoredDocument {
    StoredDocument {
        bytes: b"fixture-bytes".to_vec(),
        media_type,
        filename: filename.to_string(),
        url: None,
    }
}

fn document(label: &'static str, reference: &str, stored: StoredDocument) -> Document {
    Document::from_stored(label, &DocumentRef(reference.to_string()), stored)
        .expect("fixture document is valid")
}

pub(crate) fn payload() -> VerificationPayload {
    VerificationPayload::new(
        request(),
        document("identity document", IDENTITY_REF, stored(mime::IMAGE_PNG, "id.png")),
        document(
            "test result document",
            RESULT_REF,
            stored(mime::IMAGE_JPEG, "result.jpg"),
        ),
    )
}

pub(crate) fn payload_with_pdf() -> VerificationPayload {
    let mut payload = payload();
    payload.test_result_document = document(
        "test result document",
        "uploads/42/result.pdf",
        stored(mime::APPLICATION_PDF, "result.pdf"),
    );
    payload
}

pub(crate) fn provider(platform: Platform) -> ProviderConfig {
    ProviderConfig {
        platform,
        credential: format!("{}-test-key", platform.label()),
        model: platform.default_model().to_string(),
        enabled: true,
        endpoint: None,
    }
}

pub(crate) fn providers(platforms: &[Platform]) -> Vec<ProviderConfig> {
    platforms.iter().copied().map(provider).collect()
}

pub(crate) fn verdict(platform: Platform, approved: bool, reason: &str) -> ProviderVerdict {
    ProviderVerdict {
        platform,
        model: platform.default_model().to_string(),
        result: VerificationResult {
            approved,
            reason: reason.to_string(),
            confidence: 0.9,
        },
        errored: false,
        completed_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    }
}

pub(crate) fn record(
    application_id: i64,
    platform: Platform,
    result: RecordedVerdict,
) -> VerificationRecord {
    VerificationRecord {
        application_id: ApplicationId(application_id),
        platform,
        model: platform.default_model().to_string(),
        result,
        reasoning: "fixture".to_string(),
        confidence: 0.8,
        timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    }
}

/// How a scripted adapter answers.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Approve,
    Reject(&'static str),
    Fail,
    Stall(Duration),
    Panic,
}

pub(crate) struct ScriptedAdapter {
    platform: Platform,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAdapter {
    pub(crate) fn new(platform: Platform, script: Script) -> Self {
        Self {
            platform,
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn counted(platform: Platform, script: Script, calls: Arc<AtomicUsize>) -> Self {
        Self {
            platform,
            script,
            calls,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn verify(
        &self,
        _payload: &VerificationPayload,
        _config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Approve => Ok(VerificationResult {
                approved: true,
                reason: "documents consistent with claim".to_string(),
                confidence: 0.92,
            }),
            Script::Reject(reason) => Ok(VerificationResult {
                approved: false,
                reason: reason.to_string(),
                confidence: 0.85,
            }),
            Script::Fail => Err(ProviderCallError::Status {
                platform: self.platform,
                status: 503,
                body: "upstream overloaded".to_string(),
            }),
            Script::Stall(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(VerificationResult {
                    approved: true,
                    reason: "late answer".to_string(),
                    confidence: 0.5,
                })
            }
            Script::Panic => panic!("scripted adapter panic"),
        }
    }
}

pub(crate) fn adapters(scripts: Vec<(Platform, Script)>) -> AdapterSet {
    scripts
        .into_iter()
        .fold(AdapterSet::new(), |set, (platform, script)| {
            set.with(Arc::new(ScriptedAdapter::new(platform, script)))
        })
}

#[derive(Default, Clone)]
pub(crate) struct MemoryRecords {
    records: Arc<Mutex<Vec<VerificationRecord>>>,
}

impl MemoryRecords {
    pub(crate) fn snapshot(&self) -> Vec<VerificationRecord> {
        self.records.lock().expect("records mutex poisoned").clone()
    }
}

impl VerificationRecordStore for MemoryRecords {
    fn append(&self, record: VerificationRecord) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .push(record);
        Ok(())
    }

    fn for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<VerificationRecord>, RepositoryError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|record| record.application_id == application_id)
            .collect())
    }

    fn all(&self) -> Result<Vec<VerificationRecord>, RepositoryError> {
        Ok(self.snapshot())
    }
}

pub(crate) struct UnavailableRecords;

impl VerificationRecordStore for UnavailableRecords {
    fn append(&self, _record: VerificationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_application(
        &self,
        _application_id: ApplicationId,
    ) -> Result<Vec<VerificationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<VerificationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryDecisions {
    decisions: Arc<Mutex<HashMap<ApplicationId, HumanDecision>>>,
}

impl DecisionRepository for MemoryDecisions {
    fn record(
        &self,
        application_id: ApplicationId,
        decision: HumanDecision,
    ) -> Result<(), RepositoryError> {
        self.decisions
            .lock()
            .expect("decision mutex poisoned")
            .insert(application_id, decision);
        Ok(())
    }

    fn all(&self) -> Result<HashMap<ApplicationId, HumanDecision>, RepositoryError> {
        Ok(self.decisions.lock().expect("decision mutex poisoned").clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryAlerts {
    events: Arc<Mutex<Vec<ReviewAlert>>>,
}

impl MemoryAlerts {
    pub(crate) fn events(&self) -> Vec<ReviewAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl ReviewAlertPublisher for MemoryAlerts {
    fn publish(&self, alert: ReviewAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct MemoryDocuments {
    documents: HashMap<String, StoredDocument>,
}

impl Default for MemoryDocuments {
    fn default() -> Self {
        let mut documents = HashMap::new();
        documents.insert(IDENTITY_REF.to_string(), stored(mime::IMAGE_PNG, "id.png"));
        documents.insert(RESULT_REF.to_string(), stored(mime::IMAGE_JPEG, "result.jpg"));
        Self { documents }
    }
}

impl MemoryDocuments {
    pub(crate) fn without(mut self, reference: &str) -> Self {
        self.documents.remove(reference);
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn fetch(&self, reference: &DocumentRef) -> Result<StoredDocument, DocumentError> {
        self.documents
            .get(&reference.0)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(reference.0.clone()))
    }
}

/// Everything a test needs to drive and inspect one orchestrator.
pub(crate) struct Harness {
    pub(crate) orchestrator: VerificationOrchestrator<MemoryRecords>,
    pub(crate) records: Arc<MemoryRecords>,
    pub(crate) alerts: Arc<MemoryAlerts>,
    pub(crate) broadcaster: ProgressBroadcaster,
}

pub(crate) fn harness(configs: Vec<ProviderConfig>, adapters: AdapterSet) -> Harness {
    harness_with_documents(configs, adapters, MemoryDocuments::default())
}

pub(crate) fn harness_with_documents(
    configs: Vec<ProviderConfig>,
    adapters: AdapterSet,
    documents: MemoryDocuments,
) -> Harness {
    let records = Arc::new(MemoryRecords::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let broadcaster = ProgressBroadcaster::new();
    let orchestrator = VerificationOrchestrator::new(
        Arc::new(StaticProviderRegistry::new(configs)),
        adapters,
        Arc::new(documents),
        records.clone(),
        alerts.clone(),
        broadcaster.clone(),
    );
    Harness {
        orchestrator,
        records,
        alerts,
        broadcaster,
    }
}

pub(crate) fn build_service(
    configs: Vec<ProviderConfig>,
    adapters: AdapterSet,
    documents: MemoryDocuments,
) -> (
    VerificationService<MemoryRecords, MemoryDecisions>,
    Arc<MemoryRecords>,
    Arc<MemoryDecisions>,
) {
    let harness = harness_with_documents(configs, adapters, documents);
    let decisions = Arc::new(MemoryDecisions::default());
    let service = VerificationService::new(harness.orchestrator, decisions.clone());
    (service, harness.records, decisions)
}

pub(crate) fn verification_router_with_service(
    service: VerificationService<MemoryRecords, MemoryDecisions>,
) -> axum::Router {
    verification_router(Arc::new(service))
}

pub(crate) fn drain(subscription: &mut ProgressSubscription) -> Vec<ProgressEvent> {
    std::iter::from_fn(|| subscription.try_recv()).collect()
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
