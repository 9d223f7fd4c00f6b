use super::domain::TestCategory;
use super::payload::VerificationPayload;

const REPLY_FORMAT: &str = "Respond with a single JSON object and nothing else: \
{\"approved\": true|false, \"reason\": \"<one or two sentences>\", \"confidence\": <0.0-1.0>}";

const SHARED_CHECKS: &str = "You are reviewing an application to a high-IQ society. \
Two documents are attached: an identity document and a test-result document. \
Check that the name on both documents matches, that neither document shows signs of \
editing or forgery, and that the test result document supports the claimed score.";

fn category_instructions(category: TestCategory) -> &'static str {
    match category {
        TestCategory::Standardized => {
            "The test is a standardized admissions exam. Confirm the score report comes from \
             the issuing testing organisation, that the section or composite score matches the \
             claimed score, and that the report is an official copy rather than a screenshot of \
             practice results."
        }
        TestCategory::Intelligence => {
            "The test is a supervised intelligence assessment. Confirm it was administered by a \
             licensed psychologist or accredited proctor, that the report names the battery used, \
             and that the full-scale score matches the claimed score. Online or unsupervised tests \
             must be rejected."
        }
        TestCategory::Other => {
            "The test is not one of the standard admission tests. Confirm the issuing body is \
             identifiable, the document is an official result, and the claimed score appears on \
             it. Reject when the percentile or scale cannot be established from the document."
        }
    }
}

/// Builds the instruction text shared by every adapter.
pub fn build_prompt(payload: &VerificationPayload) -> String {
    format!(
        "{SHARED_CHECKS}\n\n{}\n\nApplicant claims:\n- Test name: {}\n- Claimed score: {}\n- Test category: {}\n\n{REPLY_FORMAT}",
        category_instructions(payload.test_category),
        payload.test_name,
        payload.test_score,
        payload.test_category.label(),
    )
}
