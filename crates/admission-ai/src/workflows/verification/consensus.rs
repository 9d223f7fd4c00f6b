use super::domain::{ApplicationId, ConsensusDecision, ConsensusKind, ProviderVerdict};

/// Unanimity policy: any single dissent blocks approval.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusEngine;

impl ConsensusEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(
        &self,
        application_id: ApplicationId,
        verdicts: &[ProviderVerdict],
    ) -> ConsensusDecision {
        let per_provider_results = verdicts
            .iter()
            .map(|verdict| verdict.to_record(application_id))
            .collect();

        if verdicts.is_empty() {
            return ConsensusDecision {
                approved: false,
                reason: "no provider verdicts were available".to_string(),
                kind: ConsensusKind::UnanimousRejection,
                needs_manual_review: true,
                per_provider_results,
            };
        }

        let rejections: Vec<&ProviderVerdict> = verdicts
            .iter()
            .filter(|verdict| !verdict.result.approved)
            .collect();

        if rejections.is_empty() {
            return ConsensusDecision {
                approved: true,
                reason: format!("all {} providers approved the documents", verdicts.len()),
                kind: ConsensusKind::UnanimousApproval,
                needs_manual_review: false,
                per_provider_results,
            };
        }

        let labeled = rejections
            .iter()
            .map(|verdict| format!("[{}] {}", verdict.platform, verdict.result.reason))
            .collect::<Vec<_>>()
            .join("\n");

        if rejections.len() == verdicts.len() {
            ConsensusDecision {
                approved: false,
                reason: labeled,
                kind: ConsensusKind::UnanimousRejection,
                needs_manual_review: false,
                per_provider_results,
            }
        } else {
            ConsensusDecision {
                approved: false,
                reason: format!(
                    "providers disagreed ({} of {} rejected):\n{}",
                    rejections.len(),
                    verdicts.len(),
                    labeled
                ),
                kind: ConsensusKind::Split,
                needs_manual_review: true,
                per_provider_results,
            }
        }
    }
}
