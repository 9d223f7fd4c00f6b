use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::http::{send_json, verdict_from_text};
use super::{resolve_endpoint, ProviderAdapter, ProviderCallError, MAX_REPLY_TOKENS};
use crate::workflows::verification::documents::{Document, DocumentKind};
use crate::workflows::verification::domain::{Platform, ProviderConfig, VerificationResult};
use crate::workflows::verification::payload::VerificationPayload;
use crate::workflows::verification::prompt::build_prompt;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn document_block(document: &Document) -> Value {
    match (document.kind, document.url.as_deref()) {
        (DocumentKind::Image, Some(url)) => json!({
            "type": "image",
            "source": { "type": "url", "url": url }
        }),
        (DocumentKind::Image, None) => json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": document.mime_essence(),
                "data": document.base64()
            }
        }),
        (DocumentKind::Pdf, _) => json!({
            "type": "document",
            "source": {
                "type": "base64",
                "media_type": "application/pdf",
                "data": document.base64()
            }
        }),
    }
}

pub(crate) fn request_body(payload: &VerificationPayload, model: &str) -> Value {
    let mut content = Vec::new();
    for document in payload.documents() {
        content.push(json!({ "type": "text", "text": format!("Attached {}:", document.label) }));
        content.push(document_block(document));
    }
    content.push(json!({ "type": "text", "text": build_prompt(payload) }));

    json!({
        "model": model,
        "max_tokens": MAX_REPLY_TOKENS,
        "temperature": 0,
        "system": "You verify admission documents. Always answer with valid JSON.",
        "messages": [{ "role": "user", "content": content }]
    })
}

pub(crate) fn reply_text(body: &Value) -> Option<String> {
    let blocks = body.get("content")?.as_array()?;
    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then(|| text.join("\n"))
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn platform(&self) -> Platform {
        Platform::Anthropic
    }

    async fn verify(
        &self,
        payload: &VerificationPayload,
        config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError> {
        let url = format!("{}/v1/messages", resolve_endpoint(config, DEFAULT_ENDPOINT));
        info!(application_id = %payload.application_id, model = %config.model, "calling anthropic");

        let request = self
            .client
            .post(url)
            .header("x-api-key", &config.credential)
            .header("anthropic-version", API_VERSION)
            .json(&request_body(payload, &config.model));
        let body = send_json(Platform::Anthropic, request).await?;

        let text = reply_text(&body).ok_or_else(|| ProviderCallError::MalformedReply {
            platform: Platform::Anthropic,
            message: "reply carried no text blocks".to_string(),
        })?;
        verdict_from_text(Platform::Anthropic, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::verification::tests::common::payload_with_pdf;

    #[test]
    fn pdfs_become_document_blocks() {
        let body = request_body(&payload_with_pdf(), "claude-sonnet-4-20250514");
        let content = body["messages"][0]["content"]
            .as_array()
            .expect("content blocks");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["type"], "base64");
        assert_eq!(content[3]["type"], "document");
        assert_eq!(content[3]["source"]["media_type"], "application/pdf");
        assert_eq!(content.last().expect("prompt")["type"], "text");
    }

    #[test]
    fn reply_text_joins_text_blocks() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Assessment follows." },
                { "type": "text", "text": "{\"approved\": true, \"reason\": \"ok\"}" }
            ]
        });
        let text = reply_text(&body).expect("text present");
        assert!(text.ends_with("\"ok\"}"));
        assert_eq!(reply_text(&json!({ "content": [] })), None);
    }
}
