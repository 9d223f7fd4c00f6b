use crate::infra::{InMemoryDecisions, InMemoryReviewAlerts, InMemoryVerificationRecords};
use crate::server::AppVerificationService;
use crate::verify::{print_decision, print_progress, verify_with_progress};
use admission_ai::error::AppError;
use admission_ai::workflows::verification::{
    AdapterSet, ApplicationId, DocumentError, DocumentRef, DocumentStore, HumanDecision, Platform,
    ProgressBroadcaster, ProviderAdapter, ProviderCallError, ProviderConfig,
    StaticProviderRegistry, StoredDocument, TestCategory, VerificationOrchestrator,
    VerificationPayload, VerificationRequest, VerificationResult, VerificationService,
};
use async_trait::async_trait;
use clap::Args;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Simulated provider latency in milliseconds
    #[arg(long, default_value_t = 150)]
    pub(crate) latency_ms: u64,
    /// Skip the accuracy summary at the end of the demo
    #[arg(long)]
    pub(crate) skip_accuracy: bool,
}

#[derive(Debug, Clone, Copy)]
enum Scripted {
    Approve(&'static str),
    Reject(&'static str),
    Outage,
}

/// Stand-in for a real platform so the demo runs without credentials or network access.
struct ScriptedProvider {
    platform: Platform,
    latency: Duration,
    answers: HashMap<ApplicationId, Scripted>,
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn verify(
        &self,
        payload: &VerificationPayload,
        _config: &ProviderConfig,
    ) -> Result<VerificationResult, ProviderCallError> {
        tokio::time::sleep(self.latency).await;
        match self.answers.get(&payload.application_id) {
            Some(Scripted::Approve(reason)) => Ok(VerificationResult {
                approved: true,
                reason: reason.to_string(),
                confidence: 0.9,
            }),
            Some(Scripted::Reject(reason)) => Ok(VerificationResult {
                approved: false,
                reason: reason.to_string(),
                confidence: 0.8,
            }),
            Some(Scripted::Outage) | None => Err(ProviderCallError::Status {
                platform: self.platform,
                status: 503,
                body: "service temporarily unavailable".to_string(),
            }),
        }
    }
}

struct DemoUploads;

#[async_trait]
impl DocumentStore for DemoUploads {
    async fn fetch(&self, reference: &DocumentRef) -> Result<StoredDocument, DocumentError> {
        let media_type = mime_guess::from_path(&reference.0).first_or_octet_stream();
        Ok(StoredDocument {
            bytes: format!("demo upload {}", reference.0).into_bytes(),
            media_type,
            filename: reference.0.rsplit('/').next().unwrap_or_default().to_string(),
            url: None,
        })
    }
}

struct Scenario {
    request: VerificationRequest,
    human_decision: HumanDecision,
    answers: [(Platform, Scripted); 3],
}

fn scenarios() -> Vec<Scenario> {
    let request = |id: i64, test_name: &str, score: &str, category: TestCategory| {
        VerificationRequest {
            application_id: ApplicationId(id),
            test_name: test_name.to_string(),
            test_score: score.to_string(),
            test_category: category,
            identity_document_ref: DocumentRef(format!("applications/{id}/passport.jpg")),
            test_result_document_ref: DocumentRef(format!("applications/{id}/score-report.pdf")),
        }
    };

    vec![
        Scenario {
            request: request(1001, "SAT", "1560", TestCategory::Standardized),
            human_decision: HumanDecision::Approved,
            answers: [
                (Platform::OpenAi, Scripted::Approve("College Board report matches the claim")),
                (Platform::Anthropic, Scripted::Approve("name and score consistent across documents")),
                (Platform::Gemini, Scripted::Approve("official report, 1560 total")),
            ],
        },
        Scenario {
            request: request(1002, "WAIS-IV", "138", TestCategory::Intelligence),
            human_decision: HumanDecision::Rejected,
            answers: [
                (Platform::OpenAi, Scripted::Approve("psychologist signature present")),
                (Platform::Anthropic, Scripted::Reject("full-scale IQ on the report reads 128")),
                (Platform::Gemini, Scripted::Approve("score legible and above threshold")),
            ],
        },
        Scenario {
            request: request(1003, "GRE", "332", TestCategory::Standardized),
            human_decision: HumanDecision::Approved,
            answers: [
                (Platform::OpenAi, Scripted::Approve("ETS score report is authentic")),
                (Platform::Anthropic, Scripted::Approve("scores sum to the claimed total")),
                (Platform::Gemini, Scripted::Outage),
            ],
        },
    ]
}

fn demo_service(latency: Duration, scenarios: &[Scenario]) -> (AppVerificationService, InMemoryReviewAlerts) {
    let mut adapters = AdapterSet::new();
    for platform in Platform::ALL {
        let answers = scenarios
            .iter()
            .filter_map(|scenario| {
                scenario
                    .answers
                    .iter()
                    .find(|(candidate, _)| *candidate == platform)
                    .map(|(_, answer)| (scenario.request.application_id, *answer))
            })
            .collect();
        adapters.register(Arc::new(ScriptedProvider {
            platform,
            latency,
            answers,
        }));
    }

    let providers = Platform::ALL
        .into_iter()
        .map(|platform| ProviderConfig {
            platform,
            credential: "demo".to_string(),
            model: platform.default_model().to_string(),
            enabled: true,
            endpoint: None,
        })
        .collect();

    let alerts = InMemoryReviewAlerts::default();
    let orchestrator = VerificationOrchestrator::new(
        Arc::new(StaticProviderRegistry::new(providers)),
        adapters,
        Arc::new(DemoUploads),
        Arc::new(InMemoryVerificationRecords::default()),
        Arc::new(alerts.clone()),
        ProgressBroadcaster::new(),
    )
    .with_provider_timeout(Some(latency * 10));

    let service = VerificationService::new(orchestrator, Arc::new(InMemoryDecisions::default()));
    (service, alerts)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let latency = Duration::from_millis(args.latency_ms);
    let scenarios = scenarios();
    let (service, alerts) = demo_service(latency, &scenarios);

    println!("Admission verification demo (scripted providers, no network calls)");
    for scenario in &scenarios {
        let request = scenario.request.clone();
        println!(
            "\nApplication {}: {} score {} ({})",
            request.application_id,
            request.test_name,
            request.test_score,
            request.test_category.label()
        );

        let decision = verify_with_progress(&service, request, print_progress).await?;
        print_decision(&decision);

        service.record_decision(scenario.request.application_id, scenario.human_decision)?;
        println!("  Human reviewer: {:?}", scenario.human_decision);
    }

    let flagged = alerts.events();
    if flagged.is_empty() {
        println!("\nManual review queue: empty");
    } else {
        println!("\nManual review queue");
        for alert in &flagged {
            let verdicts = alert
                .details
                .iter()
                .map(|(platform, verdict)| format!("{platform}={verdict}"))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  application {} ({}): {}", alert.application_id, alert.template, verdicts);
        }
    }

    if args.skip_accuracy {
        return Ok(());
    }

    println!("\nProvider accuracy against human decisions");
    for stats in service.provider_stats()? {
        println!(
            "  {:<9} n={} accuracy {:>6.2}% precision {:>6.2}% recall {:>6.2}% (TP {} TN {} FP {} FN {})",
            stats.platform.label(),
            stats.total,
            stats.accuracy,
            stats.precision,
            stats.recall,
            stats.true_positive,
            stats.true_negative,
            stats.false_positive,
            stats.false_negative
        );
    }
    let overall = service.overall_stats()?;
    println!(
        "  overall   n={} accuracy {:.2}% false-positive rate {:.2}% false-negative rate {:.2}%",
        overall.total_verifications,
        overall.accuracy,
        overall.false_positive_rate,
        overall.false_negative_rate
    );

    Ok(())
}
