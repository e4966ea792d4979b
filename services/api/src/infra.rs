use axum::http::{HeaderValue, Method};
use lostfound::auth::TokenSigner;
use lostfound::config::{AppConfig, StorageConfig};
use lostfound::workflows::campus::{CampusService, InMemoryRepository, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub(crate) type SharedService = Arc<CampusService<InMemoryRepository>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Opens the snapshot file when one is configured, otherwise a purely in-memory store.
pub(crate) fn open_repository(
    storage: &StorageConfig,
) -> Result<InMemoryRepository, RepositoryError> {
    match &storage.data_file {
        Some(path) => {
            let repository = InMemoryRepository::open(path)?;
            info!(path = %path.display(), "campus store opened");
            Ok(repository)
        }
        None => {
            warn!("APP_DATA_FILE not set; data lives only as long as the process");
            Ok(InMemoryRepository::default())
        }
    }
}

pub(crate) fn build_service(config: &AppConfig, repository: InMemoryRepository) -> SharedService {
    let signer = TokenSigner::new(&config.auth.token_secret, config.auth.token_ttl_minutes);
    Arc::new(CampusService::new(Arc::new(repository), signer))
}

/// Browser origins allowed to call the API. `*` in the list opens it to everyone.
pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}
