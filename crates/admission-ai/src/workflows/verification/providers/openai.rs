use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::http::{send_json, verdict_from_text};
use super::{resolve_endpoint, ProviderAdapter, ProviderCallError, MAX_REPLY_TOKENS};
use crate::workflows::verification::documents::{Document, DocumentKind};
use crate::workflows::verification::domain::{Platform, ProviderConfig, VerificationResult};
use crate::workflows::verification::payload::VerificationPayload;
use crate::workflows::verification::prompt::build_prompt;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com";

/// Models that accept image and file parts. Dated snapshots of these are accepted too.
pub const DOCUMENT_CAPABLE_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4-turbo",
    "gpt-5",
    "gpt-5-mini",
    "o1",
    "o3",
    "o4-mini",
];

pub struct OpenAiAdapter {
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub(crate) fn supports_documents(model: &str) -> bool {
    let model = model.trim();
    DOCUMENT_CAPABLE_MODELS.iter().any(|allowed| {
        model == *allowed
            || model
                .strip_prefix(allowed)
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|snapshot| snapshot.starts_with("20"))
    })
}

fn document_part(document: &Document) -> Value {
    match document.kind {
        DocumentKind::Image => {
            let url = document.url.clone().unwrap_or_else(|| document.data_url());
            json!({
                "type": "image_url",
                "image_url": { "url": url, "detail": "high" }
            })
        }
        DocumentKind::Pdf => json!({
            "type": "file",
            "file": {
                "filename": document.filename,
                "file_data": document.data_url()
            }
        }),
    }
}

pub(crate) fn request_body(payload: &VerificationPayload, model: &str) -> Value {
    let mut content = vec![json!({ "type": "text", "text": build_prompt(payload) })];
    for document in payload.documents() {
        content.push(json!({ "type": "text", "text": format!("Attached {}:", document.label) }));
        content.push(document_part(document));
    }

    json!({
        "model": model,
        "max_tokens": MAX_REPLY_TOKENS,
        "temperature": 0,
        "messages": [
            {
                "role": "system",
                "content": "You verify admission documents. Always answer with valid JSON."
            },
            { "role": "user", "content": content }
        ]
    })
}

pub(crate) fn reply_text(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn platform(&self) -> Platform {
        Platform::OpenAi
    }

    async fn verify(
        &self,
        payload: &VerificationPayload,
        config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError> {
        if !supports_documents(&config.model) {
            return Err(ProviderCallError::UnsupportedModel {
                platform: Platform::OpenAi,
                model: config.model.clone(),
            });
        }

        let url = format!(
            "{}/v1/chat/completions",
            resolve_endpoint(config, DEFAULT_ENDPOINT)
        );
        info!(application_id = %payload.application_id, model = %config.model, "calling openai");

        let request = self
            .client
            .post(url)
            .bearer_auth(&config.credential)
            .json(&request_body(payload, &config.model));
        let body = send_json(Platform::OpenAi, request).await?;

        let text = reply_text(&body).ok_or_else(|| ProviderCallError::MalformedReply {
            platform: Platform::OpenAi,
            message: "missing choices[0].message.content".to_string(),
        })?;
        verdict_from_text(Platform::OpenAi, &text)
    }
}
