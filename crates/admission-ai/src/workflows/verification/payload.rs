use super::documents::Document;
use super::domain::{ApplicationId, TestCategory, VerificationRequest};

/// A request whose documents have been fetched and validated, shared by every adapter call.
#[derive(Debug, Clone)]
pub struct VerificationPayload {
    pub application_id: ApplicationId,
    pub test_name: String,
    pub test_score: String,
    pub test_category: TestCategory,
    pub identity_document: Document,
    pub test_result_document: Document,
}

impl VerificationPayload {
    pub fn new(
        request: VerificationRequest,
        identity_document: Document,
        test_result_document: Document,
    ) -> Self {
        Self {
            application_id: request.application_id,
            test_name: request.test_name,
            test_score: request.test_score,
            test_category: request.test_category,
            identity_document,
            test_result_document,
        }
    }

    /// Documents in the order they are attached to provider calls.
    pub fn documents(&self) -> [&Document; 2] {
        [&self.identity_document, &self.test_result_document]
    }
}
