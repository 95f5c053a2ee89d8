//! Application state shared across HTTP handlers

use crate::auth::JwtHandler;
use crate::config::Config;
use crate::provider::CompletionProvider;
use crate::storage::Database;
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// All fields are wrapped in Arc for efficient sharing across workers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (shared read-only)
    pub config: Arc<Config>,
    /// JWT issuance and verification
    pub jwt: Arc<JwtHandler>,
    /// Database access
    pub storage: Arc<Database>,
    /// Configured completion provider
    pub provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    /// Create a new AppState with shared resources
    pub fn new(
        config: Config,
        jwt: JwtHandler,
        storage: Database,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            storage: Arc::new(storage),
            provider,
        }
    }
}
