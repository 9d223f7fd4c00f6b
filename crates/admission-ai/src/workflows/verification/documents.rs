use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mime::Mime;

use super::domain::DocumentRef;

/// How a provider has to be handed a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn from_mime(media_type: &Mime) -> Option<Self> {
        if media_type.type_() == mime::IMAGE {
            Some(DocumentKind::Image)
        } else if media_type.essence_str() == mime::APPLICATION_PDF.essence_str() {
            Some(DocumentKind::Pdf)
        } else {
            None
        }
    }
}

/// Raw bytes as handed back by the document store.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub bytes: Vec<u8>,
    pub media_type: Mime,
    pub filename: String,
    /// Publicly reachable URL, when the store can mint one.
    pub url: Option<String>,
}

/// Byte-fetch capability over whatever store holds applicant uploads.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, reference: &DocumentRef) -> Result<StoredDocument, DocumentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("document {reference} has unsupported media type {media_type}")]
    UnsupportedMediaType {
        reference: String,
        media_type: String,
    },
    #[error("document {reference} is empty")]
    Empty { reference: String },
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// A resolved document ready to be encoded for a provider.
#[derive(Debug, Clone)]
pub struct Document {
    pub label: &'static str,
    pub filename: String,
    pub media_type: Mime,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    pub url: Option<String>,
}

impl Document {
    pub fn from_stored(
        label: &'static str,
        reference: &DocumentRef,
        stored: StoredDocument,
    ) -> Result<Self, DocumentError> {
        let kind = DocumentKind::from_mime(&stored.media_type).ok_or_else(|| {
            DocumentError::UnsupportedMediaType {
                reference: reference.0.clone(),
                media_type: stored.media_type.to_string(),
            }
        })?;

        if stored.bytes.is_empty() {
            return Err(DocumentError::Empty {
                reference: reference.0.clone(),
            });
        }

        Ok(Self {
            label,
            filename: stored.filename,
            media_type: stored.media_type,
            kind,
            bytes: stored.bytes,
            url: stored.url,
        })
    }

    pub fn mime_essence(&self) -> &str {
        self.media_type.essence_str()
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_essence(), self.base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(media_type: Mime, bytes: &[u8]) -> StoredDocument {
        StoredDocument {
            bytes: bytes.to_vec(),
            media_type,
            filename: "upload".to_string(),
            url: None,
        }
    }

    #[test]
    fn classifies_images_and_pdfs() {
        assert_eq!(
            DocumentKind::from_mime(&mime::IMAGE_PNG),
            Some(DocumentKind::Image)
        );
        assert_eq!(
            DocumentKind::from_mime(&mime::APPLICATION_PDF),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::from_mime(&mime::TEXT_PLAIN), None);
    }

    #[test]
    fn rejects_unsupported_media_types() {
        let reference = DocumentRef("uploads/notes.txt".to_string());
        match Document::from_stored("identity document", &reference, stored(mime::TEXT_PLAIN, b"hi"))
        {
            Err(DocumentError::UnsupportedMediaType { reference, .. }) => {
                assert_eq!(reference, "uploads/notes.txt")
            }
            other => panic!("expected unsupported media type, got {other:?}"),
        }
    }

    #[test]
    fn data_url_embeds_mime_and_base64() {
        let reference = DocumentRef("uploads/id.png".to_string());
        let document =
            Document::from_stored("identity document", &reference, stored(mime::IMAGE_PNG, b"abc"))
                .expect("png accepted");
        assert_eq!(document.data_url(), "data:image/png;base64,YWJj");
    }
}
