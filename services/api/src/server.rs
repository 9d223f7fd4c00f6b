use crate::cli::ServeArgs;
use crate::infra::{
    AppState, FilesystemDocumentStore, InMemoryDecisions, InMemoryReviewAlerts,
    InMemoryVerificationRecords,
};
use crate::routes::with_verification_routes;
use admission_ai::config::{AppConfig, VerificationConfig};
use admission_ai::error::AppError;
use admission_ai::telemetry;
use admission_ai::workflows::verification::{
    AdapterSet, ProgressBroadcaster, StaticProviderRegistry, VerificationOrchestrator,
    VerificationService,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type AppVerificationService =
    VerificationService<InMemoryVerificationRecords, InMemoryDecisions>;

/// Wires the configured providers, upload directory, and in-memory stores into a service.
pub(crate) fn build_verification_service(
    config: &VerificationConfig,
) -> Result<AppVerificationService, AppError> {
    let enabled: BTreeSet<_> = config
        .providers
        .iter()
        .filter(|provider| provider.enabled)
        .map(|provider| provider.platform.label())
        .collect();
    if enabled.len() < admission_ai::workflows::verification::MIN_PROVIDERS {
        warn!(
            ?enabled,
            "fewer than two providers configured; verification requests will be refused"
        );
    }

    let client = reqwest::Client::builder().build()?;
    let orchestrator = VerificationOrchestrator::new(
        Arc::new(StaticProviderRegistry::new(config.providers.clone())),
        AdapterSet::standard(client),
        Arc::new(FilesystemDocumentStore::new(&config.document_root)),
        Arc::new(InMemoryVerificationRecords::default()),
        Arc::new(InMemoryReviewAlerts::default()),
        ProgressBroadcaster::new(),
    )
    .with_provider_timeout(config.provider_timeout);

    info!(
        providers = ?enabled,
        timeout_secs = config.provider_timeout.map(|limit| limit.as_secs()),
        document_root = %config.document_root.display(),
        "verification service configured"
    );

    Ok(VerificationService::new(
        orchestrator,
        Arc::new(InMemoryDecisions::default()),
    ))
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verification_service = Arc::new(build_verification_service(&config.verification)?);

    let app = with_verification_routes(verification_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission verification service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
