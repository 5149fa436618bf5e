use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryHospitalBackend, InMemorySessionGateway};
use crate::routes::with_operations_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hospital_ops::config::AppConfig;
use hospital_ops::error::AppError;
use hospital_ops::telemetry;
use hospital_ops::workflows::allocation::SiteAllocationService;
use hospital_ops::workflows::scp::SessionGateway;
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

    let backend = Arc::new(InMemoryHospitalBackend::seeded());
    let allocation_service = Arc::new(SiteAllocationService::new(backend.clone(), backend));
    let session_gateway: Arc<dyn SessionGateway> = Arc::new(InMemorySessionGateway::default());

    let app = with_operations_routes(allocation_service)
        .layer(Extension(app_state))
        .layer(Extension(session_gateway))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hospital operations console ready");

    axum::serve(listener, app).await?;
    Ok(())
}
