use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hirelink::auth::CredentialStore;
use hirelink::backend::HttpBackend;
use hirelink::config::AppConfig;
use hirelink::error::AppError;
use hirelink::telemetry;
use hirelink::workflows::applications::ApplicationDesk;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let credentials = config.backend.credentials();
    if credentials.is_none() {
        warn!("HIRELINK_ACCESS_TOKEN not set; backend calls will be rejected as unauthorized");
    }
    let backend = Arc::new(HttpBackend::new(
        &config.backend,
        CredentialStore::new(credentials),
    )?);
    let desk = Arc::new(ApplicationDesk::new(
        backend.clone(),
        backend.clone(),
        backend,
    ));

    let app = with_application_routes(desk)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = %config.backend.base_url,
        "job application service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
