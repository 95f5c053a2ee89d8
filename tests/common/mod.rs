//! Common test utilities
//!
//! Shared infrastructure for integration tests: an in-memory database,
//! a scripted completion provider and application-state fixtures.

#![allow(dead_code)]

use cursorconnect::auth::JwtHandler;
use cursorconnect::config::{AuthConfig, Config, DatabaseConfig};
use cursorconnect::provider::{ChunkStream, Completion, CompletionProvider, ProviderChunk};
use cursorconnect::server::AppState;
use cursorconnect::storage::{Database, NewUser};
use cursorconnect::{Result, ServiceError};
use std::sync::Arc;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "An-integration-test-secret-long-enough-for-hs256";

/// Connect to a fresh in-memory database with migrated tables
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn test_database() -> Database {
    let database = Database::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..Default::default()
    })
    .await
    .expect("in-memory database should connect");

    database.migrate().await.expect("migrations should run");
    database
}

/// Test configuration with a fixed JWT secret
pub fn test_config() -> Config {
    Config {
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiration: 3600,
        },
        ..Default::default()
    }
}

/// Create a user directly in storage, returning its id
pub async fn create_test_user(database: &Database, name: &str) -> Uuid {
    database
        .create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: cursorconnect::auth::hash_password("a-test-password").unwrap(),
        })
        .await
        .expect("user creation should succeed")
        .id
}

/// Scripted completion provider for tests
///
/// `complete` returns a fixed text; `stream` replays a fixed chunk
/// sequence. When `unavailable` is set, both fail.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub text: String,
    pub chunks: Vec<ProviderChunk>,
    pub unavailable: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            text: "The answer is 4.".to_string(),
            chunks: vec![
                ProviderChunk::Text("The ".to_string()),
                ProviderChunk::Text("answer is ".to_string()),
                ProviderChunk::Text("4.".to_string()),
                ProviderChunk::Done,
            ],
            unavailable: false,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, _prompt: &str) -> Result<Completion> {
        if self.unavailable {
            return Err(ServiceError::ProviderUnavailable(
                "mock provider is down".to_string(),
            ));
        }

        Ok(Completion {
            text: self.text.clone(),
            model: "mock-model".to_string(),
            prompt_tokens: 4,
            completion_tokens: 8,
            total_tokens: 12,
            latency_ms: 5,
        })
    }

    async fn stream(&self, _prompt: &str) -> Result<ChunkStream> {
        if self.unavailable {
            return Err(ServiceError::ProviderUnavailable(
                "mock provider is down".to_string(),
            ));
        }

        Ok(Box::pin(futures::stream::iter(self.chunks.clone())))
    }
}

/// Build application state around an in-memory database and mock provider
pub async fn test_state(provider: MockProvider) -> actix_web::web::Data<AppState> {
    let config = test_config();
    let jwt = JwtHandler::new(&config.auth);
    let database = test_database().await;

    actix_web::web::Data::new(AppState::new(config, jwt, database, Arc::new(provider)))
}

/// Poll the database until the user has `expected` interactions, or panic
///
/// Streamed interactions are recorded on a spawned task, so tests give
/// persistence a moment to land.
pub async fn wait_for_interaction_count(database: &Database, user_id: Uuid, expected: u64) {
    for _ in 0..50 {
        let (_, total) = database
            .find_interactions_by_user(user_id, 1, 10)
            .await
            .expect("listing interactions should succeed");
        if total == expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("expected {} interactions for user {}", expected, user_id);
}

/// Assert that the interaction count stays at `expected` for a short window
pub async fn assert_interaction_count_stays(database: &Database, user_id: Uuid, expected: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let (_, total) = database
        .find_interactions_by_user(user_id, 1, 10)
        .await
        .expect("listing interactions should succeed");
    assert_eq!(total, expected);
}
