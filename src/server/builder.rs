//! Server startup with automatic configuration loading

use crate::config::Config;
use crate::server::server::HttpServer;
use crate::utils::error::Result;
use std::path::Path;
use tracing::info;

/// Run the server with automatic configuration loading
///
/// A YAML config file is used when present; otherwise configuration comes
/// from environment variables (with `.env` support for development).
pub async fn run_server() -> Result<()> {
    info!("Starting CursorConnect backend");

    dotenvy::dotenv().ok();

    let config_path = std::env::var("CURSORCONNECT_CONFIG")
        .unwrap_or_else(|_| "config/service.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration file: {}", config_path);
        Config::from_file(&config_path).await?
    } else {
        info!(
            "No configuration file at {}, reading configuration from environment",
            config_path
        );
        Config::from_env()?
    };

    let server = HttpServer::new(&config).await?;
    info!(
        "Server starting at: http://{}",
        config.server.address()
    );
    info!("API Endpoints:");
    info!("   GET    /api/health - Health check");
    info!("   POST   /api/auth/register - User registration");
    info!("   POST   /api/auth/login - User login");
    info!("   POST   /api/generate - Whole completion");
    info!("   POST   /api/generate/stream - Streamed completion (SSE)");
    info!("   GET    /api/history - Paginated query history");

    server.start().await
}
