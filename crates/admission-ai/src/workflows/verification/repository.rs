use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, HumanDecision, VerificationRecord};

/// Insert-only storage for per-provider verdicts.
pub trait VerificationRecordStore: Send + Sync {
    fn append(&self, record: VerificationRecord) -> Result<(), RepositoryError>;
    fn for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<VerificationRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<VerificationRecord>, RepositoryError>;
}

/// Final human calls on applications, owned by the membership side of the system.
pub trait DecisionRepository: Send + Sync {
    fn record(
        &self,
        application_id: ApplicationId,
        decision: HumanDecision,
    ) -> Result<(), RepositoryError>;
    fn all(&self) -> Result<HashMap<ApplicationId, HumanDecision>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound review hooks (e.g., reviewer queue or e-mail adapters).
pub trait ReviewAlertPublisher: Send + Sync {
    fn publish(&self, alert: ReviewAlert) -> Result<(), AlertError>;
}

/// Payload flagging an application for closer human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAlert {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
