use serde_json::Value;
use tracing::debug;

use super::ProviderCallError;
use crate::workflows::verification::domain::{Platform, VerificationResult};
use crate::workflows::verification::parser::parse_verdict;

const ERROR_BODY_LIMIT: usize = 300;

/// Sends a prepared request and returns the decoded JSON body of a successful reply.
pub(super) async fn send_json(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderCallError> {
    let response = request
        .send()
        .await
        .map_err(|err| ProviderCallError::Transport {
            platform,
            message: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderCallError::Status {
            platform,
            status: status.as_u16(),
            body: truncate(&body, ERROR_BODY_LIMIT),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|err| ProviderCallError::MalformedReply {
            platform,
            message: err.to_string(),
        })
}

/// Runs the shared verdict parser over the reply text.
pub(super) fn verdict_from_text(
    platform: Platform,
    text: &str,
) -> Result<VerificationResult, ProviderCallError> {
    debug!(%platform, chars = text.len(), "parsing provider reply");
    parse_verdict(text).map_err(|source| ProviderCallError::Parse { platform, source })
}

fn truncate(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
