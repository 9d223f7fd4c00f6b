//! Retroactive scoring of provider verdicts against final human decisions.
//!
//! Statistics are rebuilt from the full record history on every call. That keeps the
//! analyzer stateless at the cost of O(history) work per query.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{HumanDecision, Platform};
use super::repository::{DecisionRepository, RepositoryError, VerificationRecordStore};

/// TP/TN/FP/FN counts where "positive" means approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl ConfusionMatrix {
    pub fn record(&mut self, provider_approved: bool, human_approved: bool) {
        match (provider_approved, human_approved) {
            (true, true) => self.true_positive += 1,
            (false, false) => self.true_negative += 1,
            (true, false) => self.false_positive += 1,
            (false, true) => self.false_negative += 1,
        }
    }

    fn merge(&mut self, other: &ConfusionMatrix) {
        self.true_positive += other.true_positive;
        self.true_negative += other.true_negative;
        self.false_positive += other.false_positive;
        self.false_negative += other.false_negative;
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        percentage(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        percentage(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        percentage(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn false_positive_rate(&self) -> f64 {
        percentage(self.false_positive, self.false_positive + self.true_negative)
    }

    pub fn false_negative_rate(&self) -> f64 {
        percentage(self.false_negative, self.false_negative + self.true_positive)
    }
}

fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Per-platform scoring; rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccuracy {
    pub platform: Platform,
    pub total: u64,
    pub true_positive: u64,
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl ProviderAccuracy {
    fn from_matrix(platform: Platform, matrix: &ConfusionMatrix) -> Self {
        Self {
            platform,
            total: matrix.total(),
            true_positive: matrix.true_positive,
            true_negative: matrix.true_negative,
            false_positive: matrix.false_positive,
            false_negative: matrix.false_negative,
            accuracy: matrix.accuracy(),
            precision: matrix.precision(),
            recall: matrix.recall(),
        }
    }
}

/// System-wide scoring across every provider verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallAccuracy {
    pub total_verifications: u64,
    pub accuracy: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
}

/// Read-only analyzer joining verification records with human decisions.
pub struct AccuracyAnalyzer<S, H> {
    records: Arc<S>,
    decisions: Arc<H>,
}

impl<S, H> AccuracyAnalyzer<S, H>
where
    S: VerificationRecordStore,
    H: DecisionRepository,
{
    pub fn new(records: Arc<S>, decisions: Arc<H>) -> Self {
        Self { records, decisions }
    }

    fn matrices(&self) -> Result<BTreeMap<Platform, ConfusionMatrix>, RepositoryError> {
        let decisions = self.decisions.all()?;
        let mut matrices: BTreeMap<Platform, ConfusionMatrix> = BTreeMap::new();

        for record in self.records.all()? {
            let human_approved = match decisions.get(&record.application_id) {
                Some(decision) if decision.is_terminal() => *decision == HumanDecision::Approved,
                _ => continue,
            };
            matrices
                .entry(record.platform)
                .or_default()
                .record(record.result.is_approval(), human_approved);
        }

        Ok(matrices)
    }

    pub fn compute_per_provider_stats(&self) -> Result<Vec<ProviderAccuracy>, RepositoryError> {
        Ok(self
            .matrices()?
            .iter()
            .map(|(platform, matrix)| ProviderAccuracy::from_matrix(*platform, matrix))
            .collect())
    }

    pub fn compute_overall_stats(&self) -> Result<OverallAccuracy, RepositoryError> {
        let mut combined = ConfusionMatrix::default();
        for matrix in self.matrices()?.values() {
            combined.merge(matrix);
        }

        Ok(OverallAccuracy {
            total_verifications: combined.total(),
            accuracy: combined.accuracy(),
            false_positive_rate: combined.false_positive_rate(),
            false_negative_rate: combined.false_negative_rate(),
        })
    }
}
