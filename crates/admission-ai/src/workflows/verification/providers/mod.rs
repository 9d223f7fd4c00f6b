//! Adapters translating a verification payload into one platform's HTTP call.

mod anthropic;
mod gemini;
mod http;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::{OpenAiAdapter, DOCUMENT_CAPABLE_MODELS};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::domain::{Platform, ProviderConfig, VerificationResult};
use super::parser::ParseError;
use super::payload::VerificationPayload;

const MAX_REPLY_TOKENS: u32 = 1024;

/// Uniform contract every AI platform integration satisfies.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn verify(
        &self,
        payload: &VerificationPayload,
        config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError>;
}

/// Failure of a single provider call. Every variant is recovered by the orchestrator as a
/// rejected verdict for that provider only.
#[derive(Debug, thiserror::Error)]
pub enum ProviderCallError {
    #[error("{platform} request failed: {message}")]
    Transport { platform: Platform, message: String },
    #[error("{platform} returned HTTP {status}: {body}")]
    Status {
        platform: Platform,
        status: u16,
        body: String,
    },
    #[error("{platform} reply was malformed: {message}")]
    MalformedReply { platform: Platform, message: String },
    #[error("{platform} reply could not be parsed: {source}")]
    Parse {
        platform: Platform,
        #[source]
        source: ParseError,
    },
    #[error("{platform} model {model} does not support document attachments")]
    UnsupportedModel { platform: Platform, model: String },
    #[error("{platform} did not answer within {}s", .elapsed.as_secs())]
    Timeout { platform: Platform, elapsed: Duration },
    #[error("no adapter registered for {0}")]
    NoAdapter(Platform),
    #[error("{platform} verification task aborted: {message}")]
    Aborted { platform: Platform, message: String },
}

/// Adapters keyed by platform, so orchestration never branches on platform names.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: BTreeMap<Platform, Arc<dyn ProviderAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapters for every platform the service ships with, sharing one HTTP client.
    pub fn standard(client: reqwest::Client) -> Self {
        Self::new()
            .with(Arc::new(OpenAiAdapter::new(client.clone())))
            .with(Arc::new(AnthropicAdapter::new(client.clone())))
            .with(Arc::new(GeminiAdapter::new(client)))
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&platform).cloned()
    }
}

fn resolve_endpoint(config: &ProviderConfig, fallback: &str) -> String {
    config
        .endpoint
        .as_deref()
        .unwrap_or(fallback)
        .trim_end_matches('/')
        .to_string()
}
