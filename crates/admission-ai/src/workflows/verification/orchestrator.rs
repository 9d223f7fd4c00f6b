use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use super::consensus::ConsensusEngine;
use super::documents::{Document, DocumentError, DocumentStore};
use super::domain::{
    ApplicationId, ConsensusDecision, ConsensusKind, DocumentRef, Platform, ProviderConfig,
    ProviderRunState, ProviderVerdict, RecordedVerdict, VerificationRequest, VerificationResult,
};
use super::payload::VerificationPayload;
use super::progress::{ProgressBroadcaster, ProgressEvent};
use super::providers::{AdapterSet, ProviderAdapter, ProviderCallError};
use super::registry::{ProviderRegistry, RegistryError};
use super::repository::{ReviewAlert, ReviewAlertPublisher, VerificationRecordStore};

/// Fewer distinct enabled platforms than this is a caller error, not a partial run.
pub const MIN_PROVIDERS: usize = 2;

/// Failures that stop a run before any provider is contacted.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("at least {MIN_PROVIDERS} enabled providers are required, found {enabled}")]
    InsufficientProviders { enabled: usize },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A document every provider needed could not be loaded.
#[derive(Debug, thiserror::Error)]
#[error("could not load {label}: {source}")]
struct DocumentFailure {
    label: &'static str,
    #[source]
    source: DocumentError,
}

/// Fans a request out to every enabled provider and reduces the verdicts to one decision.
pub struct VerificationOrchestrator<S> {
    registry: Arc<dyn ProviderRegistry>,
    adapters: AdapterSet,
    documents: Arc<dyn DocumentStore>,
    records: Arc<S>,
    alerts: Arc<dyn ReviewAlertPublisher>,
    broadcaster: ProgressBroadcaster,
    consensus: ConsensusEngine,
    provider_timeout: Option<Duration>,
}

impl<S> VerificationOrchestrator<S>
where
    S: VerificationRecordStore,
{
    pub fn new(
        registry: Arc<dyn ProviderRegistry>,
        adapters: AdapterSet,
        documents: Arc<dyn DocumentStore>,
        records: Arc<S>,
        alerts: Arc<dyn ReviewAlertPublisher>,
        broadcaster: ProgressBroadcaster,
    ) -> Self {
        Self {
            registry,
            adapters,
            documents,
            records,
            alerts,
            broadcaster,
            consensus: ConsensusEngine::new(),
            provider_timeout: None,
        }
    }

    /// Bounds every provider call; an overrun ends in the `error` state.
    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.broadcaster
    }

    /// Store every run appends its per-provider records to.
    pub fn records(&self) -> &Arc<S> {
        &self.records
    }

    pub async fn run(
        &self,
        request: VerificationRequest,
    ) -> Result<ConsensusDecision, OrchestrationError> {
        let application_id = request.application_id;
        let providers = distinct_platforms(self.registry.list_enabled()?);
        if providers.len() < MIN_PROVIDERS {
            warn!(%application_id, enabled = providers.len(), "verification refused: not enough providers");
            return Err(OrchestrationError::InsufficientProviders {
                enabled: providers.len(),
            });
        }

        for config in &providers {
            self.broadcaster.publish(ProgressEvent::new(
                application_id,
                config.platform,
                ProviderRunState::Pending,
            ));
        }

        info!(%application_id, providers = providers.len(), "verification run started");

        let verdicts = match self.resolve_documents(request).await {
            Ok(payload) => self.dispatch(providers, Arc::new(payload)).await,
            Err(failure) => self.reject_unreadable(application_id, providers, &failure),
        };

        let decision = self.consensus.decide(application_id, &verdicts);
        self.persist(&decision);
        if decision.kind == ConsensusKind::Split {
            self.flag_for_review(&decision, application_id);
        }

        info!(
            %application_id,
            approved = decision.approved,
            kind = ?decision.kind,
            "verification run finished"
        );
        Ok(decision)
    }

    async fn dispatch(
        &self,
        providers: Vec<ProviderConfig>,
        payload: Arc<VerificationPayload>,
    ) -> Vec<ProviderVerdict> {
        let application_id = payload.application_id;
        let tasks: Vec<_> = providers
            .into_iter()
            .map(|config| {
                let platform = config.platform;
                let model = config.model.clone();
                let handle = tokio::spawn(run_provider(
                    self.adapters.get(platform),
                    Arc::clone(&payload),
                    config,
                    self.broadcaster.clone(),
                    self.provider_timeout,
                ));
                (platform, model, handle)
            })
            .collect();

        let mut verdicts = Vec::with_capacity(tasks.len());
        for (platform, model, handle) in tasks {
            let verdict = match handle.await {
                Ok(verdict) => verdict,
                Err(join_error) => {
                    let failure = ProviderCallError::Aborted {
                        platform,
                        message: join_error.to_string(),
                    };
                    error!(%application_id, %platform, %failure, "provider task aborted");
                    self.broadcaster.publish(
                        ProgressEvent::new(application_id, platform, ProviderRunState::Error)
                            .with_message(failure.to_string()),
                    );
                    failed_verdict(platform, model, failure.to_string())
                }
            };
            verdicts.push(verdict);
        }
        verdicts
    }

    /// Without the documents no provider can be asked, so each one ends in `error`.
    fn reject_unreadable(
        &self,
        application_id: ApplicationId,
        providers: Vec<ProviderConfig>,
        failure: &DocumentFailure,
    ) -> Vec<ProviderVerdict> {
        error!(%application_id, %failure, "documents unavailable; counting every provider as a rejection");
        providers
            .into_iter()
            .map(|config| {
                let platform = config.platform;
                self.broadcaster.publish(ProgressEvent::new(
                    application_id,
                    platform,
                    ProviderRunState::Running,
                ));
                self.broadcaster.publish(
                    ProgressEvent::new(application_id, platform, ProviderRunState::Error)
                        .with_message(failure.to_string()),
                );
                failed_verdict(platform, config.model, failure.to_string())
            })
            .collect()
    }

    async fn resolve_documents(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationPayload, DocumentFailure> {
        let (identity, test_result) = tokio::try_join!(
            self.load_document("identity document", &request.identity_document_ref),
            self.load_document("test result document", &request.test_result_document_ref),
        )?;
        Ok(VerificationPayload::new(request, identity, test_result))
    }

    async fn load_document(
        &self,
        label: &'static str,
        reference: &DocumentRef,
    ) -> Result<Document, DocumentFailure> {
        let stored = self
            .documents
            .fetch(reference)
            .await
            .map_err(|source| DocumentFailure { label, source })?;
        Document::from_stored(label, reference, stored)
            .map_err(|source| DocumentFailure { label, source })
    }

    fn persist(&self, decision: &ConsensusDecision) {
        for record in &decision.per_provider_results {
            if let Err(err) = self.records.append(record.clone()) {
                error!(
                    application_id = %record.application_id,
                    platform = %record.platform,
                    %err,
                    "failed to persist verification record"
                );
            }
        }
    }

    fn flag_for_review(&self, decision: &ConsensusDecision, application_id: ApplicationId) {
        let mut details = BTreeMap::new();
        for record in &decision.per_provider_results {
            let verdict = match record.result {
                RecordedVerdict::Approved => "approved",
                RecordedVerdict::Rejected => "rejected",
                RecordedVerdict::Error => "error",
            };
            details.insert(record.platform.to_string(), verdict.to_string());
        }

        let alert = ReviewAlert {
            template: "split_verdict".to_string(),
            application_id,
            details,
        };
        if let Err(err) = self.alerts.publish(alert) {
            warn!(%application_id, %err, "failed to flag split verdict for review");
        }
    }
}

async fn run_provider(
    adapter: Option<Arc<dyn ProviderAdapter>>,
    payload: Arc<VerificationPayload>,
    config: ProviderConfig,
    broadcaster: ProgressBroadcaster,
    provider_timeout: Option<Duration>,
) -> ProviderVerdict {
    let application_id = payload.application_id;
    let platform = config.platform;
    broadcaster.publish(ProgressEvent::new(
        application_id,
        platform,
        ProviderRunState::Running,
    ));

    let outcome = match adapter {
        Some(adapter) => call_with_deadline(adapter.as_ref(), &payload, &config, provider_timeout).await,
        None => Err(ProviderCallError::NoAdapter(platform)),
    };

    match outcome {
        Ok(result) => {
            let summary = if result.approved { "approved" } else { "rejected" };
            info!(%application_id, %platform, approved = result.approved, "provider verdict received");
            broadcaster.publish(
                ProgressEvent::new(application_id, platform, ProviderRunState::Completed)
                    .with_message(summary),
            );
            ProviderVerdict {
                platform,
                model: config.model,
                result,
                errored: false,
                completed_at: Utc::now(),
            }
        }
        Err(failure) => {
            warn!(%application_id, %platform, %failure, "provider call failed; counting as rejection");
            broadcaster.publish(
                ProgressEvent::new(application_id, platform, ProviderRunState::Error)
                    .with_message(failure.to_string()),
            );
            failed_verdict(platform, config.model, failure.to_string())
        }
    }
}

async fn call_with_deadline(
    adapter: &dyn ProviderAdapter,
    payload: &VerificationPayload,
    config: &ProviderConfig,
    provider_timeout: Option<Duration>,
) -> Result<VerificationResult, ProviderCallError> {
    match provider_timeout {
        Some(limit) => tokio::time::timeout(limit, adapter.verify(payload, config))
            .await
            .map_err(|_| ProviderCallError::Timeout {
                platform: config.platform,
                elapsed: limit,
            })?,
        None => adapter.verify(payload, config).await,
    }
}

/// Keeps the first config per platform; verdicts and alerts are keyed by platform.
fn distinct_platforms(configs: Vec<ProviderConfig>) -> Vec<ProviderConfig> {
    let mut seen = BTreeSet::new();
    configs
        .into_iter()
        .filter(|config| {
            let first = seen.insert(config.platform);
            if !first {
                warn!(platform = %config.platform, "ignoring duplicate provider config");
            }
            first
        })
        .collect()
}

fn failed_verdict(platform: Platform, model: String, reason: String) -> ProviderVerdict {
    ProviderVerdict {
        platform,
        model,
        result: VerificationResult::failed(reason),
        errored: true,
        completed_at: Utc::now(),
    }
}
