//! HTTP server core implementation

use crate::auth::JwtHandler;
use crate::config::{Config, ServerConfig};
use crate::provider::build_provider;
use crate::server::middleware::AuthMiddleware;
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::Database;
use crate::utils::error::{Result, ServiceError};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer as ActixHttpServer};
use tracing::info;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    ///
    /// Connects to the database, runs migrations, and constructs the
    /// configured completion provider.
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");

        let storage = Database::connect(&config.storage.database).await?;
        storage.migrate().await?;

        let jwt = JwtHandler::new(&config.auth);
        let provider = build_provider(&config.provider)?;
        info!(
            "Registered completion provider: {} ({})",
            provider.name(),
            provider.model()
        );

        let state = AppState::new(config.clone(), jwt, storage, provider);

        Ok(Self {
            config: config.server.clone(),
            state,
        })
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();

        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);

        let server = ActixHttpServer::new(move || create_app(state.clone()))
            .bind(&bind_addr)
            .map_err(|e| {
                ServiceError::Config(format!("Failed to bind {}: {}", bind_addr, e))
            })?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        server
            .await
            .map_err(|e| ServiceError::internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Create the Actix-web application
///
/// Public so integration tests can drive the full route table against an
/// in-memory state.
pub fn create_app(
    state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let cors_config = &state.config.server.cors;
    let mut cors = Cors::default();

    if cors_config.enabled {
        if cors_config.allows_all_origins() {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_config.allowed_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .max_age(cors_config.max_age as usize);
    }

    App::new()
        .app_data(state)
        .wrap(AuthMiddleware)
        .wrap(Logger::default())
        .wrap(cors)
        .configure(routes::health::configure_routes)
        .configure(routes::auth::configure_routes)
        .configure(routes::generate::configure_routes)
        .configure(routes::history::configure_routes)
}
