use std::sync::Arc;

use tracing::info;

use super::accuracy::{AccuracyAnalyzer, OverallAccuracy, ProviderAccuracy};
use super::domain::{
    ApplicationId, ConsensusDecision, HumanDecision, VerificationRecord, VerificationRequest,
};
use super::orchestrator::{OrchestrationError, VerificationOrchestrator};
use super::progress::ProgressSubscription;
use super::repository::{DecisionRepository, RepositoryError, VerificationRecordStore};

/// Service composing the orchestrator, record history, and accuracy analyzer.
pub struct VerificationService<S, H> {
    orchestrator: Arc<VerificationOrchestrator<S>>,
    records: Arc<S>,
    decisions: Arc<H>,
    analyzer: AccuracyAnalyzer<S, H>,
}

impl<S, H> VerificationService<S, H>
where
    S: VerificationRecordStore + 'static,
    H: DecisionRepository + 'static,
{
    /// History and accuracy read the store the orchestrator appends to.
    pub fn new(orchestrator: VerificationOrchestrator<S>, decisions: Arc<H>) -> Self {
        let records = Arc::clone(orchestrator.records());
        let analyzer = AccuracyAnalyzer::new(records.clone(), decisions.clone());
        Self {
            orchestrator: Arc::new(orchestrator),
            records,
            decisions,
            analyzer,
        }
    }

    /// Run every enabled provider against the request and return the consensus.
    pub async fn verify(
        &self,
        request: VerificationRequest,
    ) -> Result<ConsensusDecision, VerificationServiceError> {
        Ok(self.orchestrator.run(request).await?)
    }

    /// Observe provider transitions for an application from now on.
    pub fn subscribe(&self, application_id: ApplicationId) -> ProgressSubscription {
        self.orchestrator.broadcaster().subscribe(application_id)
    }

    pub fn records(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<VerificationRecord>, VerificationServiceError> {
        Ok(self.records.for_application(application_id)?)
    }

    /// Store the reviewer's final call so the accuracy statistics can score it.
    pub fn record_decision(
        &self,
        application_id: ApplicationId,
        decision: HumanDecision,
    ) -> Result<(), VerificationServiceError> {
        if self.records.for_application(application_id)?.is_empty() {
            return Err(RepositoryError::NotFound.into());
        }
        self.decisions.record(application_id, decision)?;
        info!(%application_id, ?decision, "human decision recorded");
        Ok(())
    }

    pub fn provider_stats(&self) -> Result<Vec<ProviderAccuracy>, VerificationServiceError> {
        Ok(self.analyzer.compute_per_provider_stats()?)
    }

    pub fn overall_stats(&self) -> Result<OverallAccuracy, VerificationServiceError> {
        Ok(self.analyzer.compute_overall_stats()?)
    }
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationServiceError {
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
