//! HTTP server implementation
//!
//! This module provides the HTTP server, routing and middleware.

pub mod builder;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use server::HttpServer;
pub use state::AppState;
