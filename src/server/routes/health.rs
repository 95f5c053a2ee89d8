//! Health check and status endpoints

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{web, HttpResponse, Result as ActixResult};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/health")
            .route("", web::get().to(health_check))
            .route("/detailed", web::get().to(detailed_health_check))
            .route("/version", web::get().to(version_info)),
    );
}

/// Basic health status
#[derive(Debug, serde::Serialize)]
struct HealthStatus {
    status: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: Cow<'static, str>,
}

/// Basic health check endpoint
///
/// Used by load balancers and monitoring; does not touch any backend.
pub async fn health_check() -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    let health_status = HealthStatus {
        status: Cow::Borrowed("healthy"),
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(health_status)))
}

/// Detailed health status including backends
#[derive(Debug, serde::Serialize)]
struct DetailedHealthStatus {
    status: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: Cow<'static, str>,
    database: bool,
    provider: Cow<'static, str>,
}

/// Detailed health check endpoint
///
/// Probes the database and reports the configured provider.
pub async fn detailed_health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Detailed health check requested");

    let database_healthy = match state.storage.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Database health check failed: {}", e);
            false
        }
    };

    let detailed_status = DetailedHealthStatus {
        status: if database_healthy {
            Cow::Borrowed("healthy")
        } else {
            Cow::Borrowed("degraded")
        },
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        database: database_healthy,
        provider: Cow::Owned(state.provider.name().to_string()),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(detailed_status)))
}

/// Build metadata
#[derive(Debug, serde::Serialize)]
struct VersionInfo {
    version: Cow<'static, str>,
    build_time: Cow<'static, str>,
    git_hash: Cow<'static, str>,
}

/// Version endpoint exposing build metadata
pub async fn version_info() -> ActixResult<HttpResponse> {
    let version = VersionInfo {
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        build_time: Cow::Borrowed(env!("BUILD_TIME")),
        git_hash: Cow::Borrowed(env!("GIT_HASH")),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(version)))
}
