//! # CursorConnect
//!
//! Backend service for CursorConnect: a chat-style query interface over
//! third-party LLM providers with per-user query history.
//!
//! The service exposes a REST API for registration, login and history
//! management, plus a server-sent-event endpoint that relays a provider's
//! token stream to the browser while accumulating the full response for
//! persistence.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cursorconnect::{Config, server::HttpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = HttpServer::new(&config).await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod provider;
pub mod relay;
pub mod sdk;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use provider::{Completion, CompletionProvider, ProviderChunk, QueryMetadata};
pub use relay::StreamRelay;
pub use utils::error::{Result, ServiceError};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
