use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::http::{send_json, verdict_from_text};
use super::{resolve_endpoint, ProviderAdapter, ProviderCallError, MAX_REPLY_TOKENS};
use crate::workflows::verification::domain::{Platform, ProviderConfig, VerificationResult};
use crate::workflows::verification::payload::VerificationPayload;
use crate::workflows::verification::prompt::build_prompt;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Gemini only takes inline bytes here; public URLs are never used.
pub struct GeminiAdapter {
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub(crate) fn request_body(payload: &VerificationPayload) -> Value {
    let mut parts = vec![json!({ "text": build_prompt(payload) })];
    for document in payload.documents() {
        parts.push(json!({ "text": format!("Attached {}:", document.label) }));
        parts.push(json!({
            "inline_data": {
                "mime_type": document.mime_essence(),
                "data": document.base64()
            }
        }));
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "temperature": 0,
            "maxOutputTokens": MAX_REPLY_TOKENS,
            "responseMimeType": "application/json"
        }
    })
}

pub(crate) fn reply_text(body: &Value) -> Option<String> {
    let parts = body.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn platform(&self) -> Platform {
        Platform::Gemini
    }

    async fn verify(
        &self,
        payload: &VerificationPayload,
        config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            resolve_endpoint(config, DEFAULT_ENDPOINT),
            config.model
        );
        info!(application_id = %payload.application_id, model = %config.model, "calling gemini");

        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &config.credential)
            .json(&request_body(payload));
        let body = send_json(Platform::Gemini, request).await?;

        let text = reply_text(&body).ok_or_else(|| ProviderCallError::MalformedReply {
            platform: Platform::Gemini,
            message: "missing candidates[0].content.parts text".to_string(),
        })?;
        verdict_from_text(Platform::Gemini, &text)
    }
}
