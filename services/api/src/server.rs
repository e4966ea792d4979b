use crate::cli::ServeArgs;
use crate::infra::{build_service, cors_layer, open_repository, AppState};
use crate::routes::with_campus_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lostfound::config::AppConfig;
use lostfound::error::AppError;
use lostfound::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = open_repository(&config.storage)?;
    let service = build_service(&config, repository);
    if let Some(password) = config.bootstrap.admin_password.as_deref() {
        let admin = service.bootstrap_admin(&config.bootstrap.admin_email, password)?;
        service.seed_default_settings(Some(admin.id))?;
    }

    let app = with_campus_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lost and found api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
