use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryScorebookRepository, LoggingChangePublisher};
use crate::routes::with_readiness_routes;
use admissions_readiness::config::AppConfig;
use admissions_readiness::error::AppError;
use admissions_readiness::scoring::{ReadinessBlueprint, ReadinessService};
use admissions_readiness::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let blueprint = config.scoring.apply(ReadinessBlueprint::standard())?;
    let repository = Arc::new(InMemoryScorebookRepository::default());
    let publisher = Arc::new(LoggingChangePublisher::default());
    let service = Arc::new(ReadinessService::new(repository, publisher, blueprint));

    let app = with_readiness_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_complete = config.scoring.require_complete,
        "admissions readiness service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
