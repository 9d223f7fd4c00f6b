use admission_ai::workflows::verification::{
    AlertError, ApplicationId, DecisionRepository, DocumentError, DocumentRef, DocumentStore,
    HumanDecision, RepositoryError, ReviewAlert, ReviewAlertPublisher, StoredDocument,
    VerificationRecord, VerificationRecordStore,
};
use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store mutex poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVerificationRecords {
    records: Arc<Mutex<Vec<VerificationRecord>>>,
}

impl VerificationRecordStore for InMemoryVerificationRecords {
    fn append(&self, record: VerificationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        guard.push(record);
        Ok(())
    }

    fn for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|record| record.application_id == application_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisions {
    decisions: Arc<Mutex<HashMap<ApplicationId, HumanDecision>>>,
}

impl DecisionRepository for InMemoryDecisions {
    fn record(
        &self,
        application_id: ApplicationId,
        decision: HumanDecision,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.decisions.lock().map_err(poisoned)?;
        guard.insert(application_id, decision);
        Ok(())
    }

    fn all(&self) -> Result<HashMap<ApplicationId, HumanDecision>, RepositoryError> {
        let guard = self.decisions.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }
}

/// Keeps review alerts in memory and mirrors them to the log for reviewers tailing it.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewAlerts {
    events: Arc<Mutex<Vec<ReviewAlert>>>,
}

impl ReviewAlertPublisher for InMemoryReviewAlerts {
    fn publish(&self, alert: ReviewAlert) -> Result<(), AlertError> {
        warn!(
            application_id = %alert.application_id,
            template = %alert.template,
            details = ?alert.details,
            "application flagged for manual review"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AlertError::Transport("alert mutex poisoned".to_string()))?;
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryReviewAlerts {
    pub(crate) fn events(&self) -> Vec<ReviewAlert> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Serves applicant uploads from a directory; references are paths relative to it.
#[derive(Debug, Clone)]
pub(crate) struct FilesystemDocumentStore {
    root: PathBuf,
}

impl FilesystemDocumentStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, reference: &DocumentRef) -> Option<PathBuf> {
        let relative = Path::new(reference.0.trim());
        let confined = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (confined && !reference.0.trim().is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl DocumentStore for FilesystemDocumentStore {
    async fn fetch(&self, reference: &DocumentRef) -> Result<StoredDocument, DocumentError> {
        let path = self
            .resolve(reference)
            .ok_or_else(|| DocumentError::NotFound(reference.0.clone()))?;

        let bytes = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => DocumentError::NotFound(reference.0.clone()),
            _ => DocumentError::Unavailable(format!("{}: {err}", path.display())),
        })?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.0.clone());

        Ok(StoredDocument {
            bytes,
            media_type: mime_guess::from_path(&path).first_or_octet_stream(),
            filename,
            url: None,
        })
    }
}
