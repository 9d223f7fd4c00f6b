use crate::server::{build_verification_service, AppVerificationService};
use admission_ai::config::AppConfig;
use admission_ai::error::AppError;
use admission_ai::telemetry;
use admission_ai::workflows::verification::{
    ApplicationId, ConsensusDecision, DocumentRef, ProgressEvent, TestCategory,
    VerificationRequest,
};
use clap::Args;
use futures::StreamExt;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Application the documents belong to
    #[arg(long)]
    pub(crate) application_id: i64,
    /// Name of the qualifying test (e.g. SAT, WAIS-IV)
    #[arg(long)]
    pub(crate) test_name: String,
    /// Score as claimed by the applicant
    #[arg(long)]
    pub(crate) test_score: String,
    /// standardized, intelligence, or other
    #[arg(long, value_parser = parse_category, default_value = "standardized")]
    pub(crate) category: TestCategory,
    /// Identity document path, relative to the document root
    #[arg(long)]
    pub(crate) identity: String,
    /// Test result document path, relative to the document root
    #[arg(long)]
    pub(crate) test_result: String,
    /// Override the configured document root
    #[arg(long)]
    pub(crate) document_root: Option<PathBuf>,
    /// Print the decision as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn parse_category(raw: &str) -> Result<TestCategory, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "standardized" => Ok(TestCategory::Standardized),
        "intelligence" | "iq" => Ok(TestCategory::Intelligence),
        "other" => Ok(TestCategory::Other),
        other => Err(format!(
            "unknown test category '{other}' (expected standardized, intelligence, or other)"
        )),
    }
}

pub(crate) async fn run_verify(args: VerifyArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(root) = args.document_root {
        config.verification.document_root = root;
    }
    telemetry::init(&config.telemetry, config.environment)?;

    let service = build_verification_service(&config.verification)?;
    let request = VerificationRequest {
        application_id: ApplicationId(args.application_id),
        test_name: args.test_name,
        test_score: args.test_score,
        test_category: args.category,
        identity_document_ref: DocumentRef(args.identity),
        test_result_document_ref: DocumentRef(args.test_result),
    };

    let decision = verify_with_progress(&service, request, print_progress).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        print_decision(&decision);
    }
    Ok(())
}

/// Runs one verification while rendering every progress event as it arrives.
pub(crate) async fn verify_with_progress<F>(
    service: &AppVerificationService,
    request: VerificationRequest,
    mut render: F,
) -> Result<ConsensusDecision, AppError>
where
    F: FnMut(&ProgressEvent),
{
    let mut progress = service.subscribe(request.application_id);
    let run = service.verify(request);
    tokio::pin!(run);

    let decision = loop {
        tokio::select! {
            Some(event) = progress.next() => render(&event),
            result = &mut run => break result?,
        }
    };

    while let Some(event) = progress.try_recv() {
        render(&event);
    }
    Ok(decision)
}

pub(crate) fn print_progress(event: &ProgressEvent) {
    match &event.message {
        Some(message) => println!(
            "  [{:<9}] {:<9} {}",
            event.platform.label(),
            event.status.label(),
            message
        ),
        None => println!("  [{:<9}] {}", event.platform.label(), event.status.label()),
    }
}

pub(crate) fn print_decision(decision: &ConsensusDecision) {
    println!(
        "\nDecision: {} ({:?}{})",
        if decision.approved { "APPROVED" } else { "REJECTED" },
        decision.kind,
        if decision.needs_manual_review {
            ", manual review required"
        } else {
            ""
        }
    );
    for line in decision.reason.lines() {
        println!("  {line}");
    }
    println!("\nPer-provider results");
    for record in &decision.per_provider_results {
        println!(
            "  {:<9} {:<28} {:?} (confidence {:.2})",
            record.platform.label(),
            record.model,
            record.result,
            record.confidence
        );
    }
}
