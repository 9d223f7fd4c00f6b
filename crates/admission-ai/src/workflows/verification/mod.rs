//! Multi-provider verification of applicant documents.
//!
//! A run fans the applicant's identity and test-result documents out to every enabled AI
//! provider, reports each provider's progress to live observers, and reduces the verdicts
//! with a unanimity rule. Persisted verdicts are later scored against the human reviewer's
//! final call.

pub mod accuracy;
pub mod consensus;
pub mod documents;
pub mod domain;
pub mod orchestrator;
pub mod parser;
pub mod payload;
pub mod progress;
pub(crate) mod prompt;
pub mod providers;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use accuracy::{AccuracyAnalyzer, ConfusionMatrix, OverallAccuracy, ProviderAccuracy};
pub use consensus::ConsensusEngine;
pub use documents::{Document, DocumentError, DocumentKind, DocumentStore, StoredDocument};
pub use domain::{
    ApplicationId, ConsensusDecision, ConsensusKind, DocumentRef, HumanDecision, Platform,
    ProviderConfig, ProviderRunState, ProviderVerdict, RecordedVerdict, TestCategory,
    VerificationRecord, VerificationRequest, VerificationResult,
};
pub use orchestrator::{OrchestrationError, VerificationOrchestrator, MIN_PROVIDERS};
pub use parser::{parse_verdict, ParseError};
pub use payload::VerificationPayload;
pub use progress::{ProgressBroadcaster, ProgressEvent, ProgressSubscription};
pub use providers::{
    AdapterSet, AnthropicAdapter, GeminiAdapter, OpenAiAdapter, ProviderAdapter,
    ProviderCallError,
};
pub use registry::{ProviderRegistry, RegistryError, StaticProviderRegistry};
pub use repository::{
    AlertError, DecisionRepository, RepositoryError, ReviewAlert, ReviewAlertPublisher,
    VerificationRecordStore,
};
pub use router::verification_router;
pub use service::{VerificationService, VerificationServiceError};
