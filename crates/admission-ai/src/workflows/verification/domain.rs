use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the admission application a verification run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque key understood by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(pub String);

/// Family of test the applicant is claiming a qualifying score on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    /// College-admission and graduate entrance exams (SAT, ACT, GRE, GMAT, LSAT).
    Standardized,
    /// Supervised IQ batteries (WAIS, Stanford-Binet, Cattell).
    Intelligence,
    Other,
}

impl TestCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TestCategory::Standardized => "standardized test",
            TestCategory::Intelligence => "intelligence test",
            TestCategory::Other => "other qualifying test",
        }
    }
}

/// Applicant-provided request consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub application_id: ApplicationId,
    pub test_name: String,
    pub test_score: String,
    pub test_category: TestCategory,
    pub identity_document_ref: DocumentRef,
    pub test_result_document_ref: DocumentRef,
}

/// AI platforms an adapter can exist for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::OpenAi, Platform::Anthropic, Platform::Gemini];

    pub fn label(&self) -> &'static str {
        match self {
            Platform::OpenAi => "openai",
            Platform::Anthropic => "anthropic",
            Platform::Gemini => "gemini",
        }
    }

    pub(crate) fn env_prefix(&self) -> &'static str {
        match self {
            Platform::OpenAi => "OPENAI",
            Platform::Anthropic => "ANTHROPIC",
            Platform::Gemini => "GEMINI",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Platform::OpenAi => "gpt-4o",
            Platform::Anthropic => "claude-sonnet-4-20250514",
            Platform::Gemini => "gemini-2.0-flash",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(Platform::OpenAi),
            "anthropic" | "claude" => Ok(Platform::Anthropic),
            "gemini" | "google" => Ok(Platform::Gemini),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Configured provider snapshot. The credential is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub platform: Platform,
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub model: String,
    pub enabled: bool,
    /// Base URL override, mainly for proxies and local fakes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("platform", &self.platform)
            .field("credential", &"<redacted>")
            .field("model", &self.model)
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Normalized verdict from one provider for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub approved: bool,
    pub reason: String,
    /// Advisory only; never consulted by consensus.
    pub confidence: f32,
}

impl VerificationResult {
    /// Conservative stand-in used when a provider could not produce a verdict.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            confidence: 0.0,
        }
    }
}

/// Lifecycle of one provider within one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRunState {
    Pending,
    Running,
    Completed,
    Error,
}

impl ProviderRunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderRunState::Completed | ProviderRunState::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderRunState::Pending => "pending",
            ProviderRunState::Running => "running",
            ProviderRunState::Completed => "completed",
            ProviderRunState::Error => "error",
        }
    }
}

/// Stored outcome of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordedVerdict {
    Approved,
    Rejected,
    Error,
}

impl RecordedVerdict {
    /// Errors were counted as rejections when consensus ran, so they score as such.
    pub fn is_approval(&self) -> bool {
        matches!(self, RecordedVerdict::Approved)
    }
}

/// Terminal verdict of one provider, as handed to consensus.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderVerdict {
    pub platform: Platform,
    pub model: String,
    pub result: VerificationResult,
    pub errored: bool,
    pub completed_at: DateTime<Utc>,
}

impl ProviderVerdict {
    pub fn recorded_verdict(&self) -> RecordedVerdict {
        if self.errored {
            RecordedVerdict::Error
        } else if self.result.approved {
            RecordedVerdict::Approved
        } else {
            RecordedVerdict::Rejected
        }
    }

    pub fn to_record(&self, application_id: ApplicationId) -> VerificationRecord {
        VerificationRecord {
            application_id,
            platform: self.platform,
            model: self.model.clone(),
            result: self.recorded_verdict(),
            reasoning: self.result.reason.clone(),
            confidence: self.result.confidence,
            timestamp: self.completed_at,
        }
    }
}

/// Insert-only audit row, one per provider per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub application_id: ApplicationId,
    pub platform: Platform,
    pub model: String,
    pub result: RecordedVerdict,
    pub reasoning: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// Shape of the agreement between providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusKind {
    UnanimousApproval,
    UnanimousRejection,
    Split,
}

/// Final output of an orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusDecision {
    pub approved: bool,
    pub reason: String,
    pub kind: ConsensusKind,
    pub needs_manual_review: bool,
    pub per_provider_results: Vec<VerificationRecord>,
}

/// Final call made by a human reviewer after the AI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanDecision {
    Pending,
    Approved,
    Rejected,
}

impl HumanDecision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HumanDecision::Pending)
    }
}
