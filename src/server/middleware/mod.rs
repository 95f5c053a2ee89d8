//! HTTP middleware

pub mod auth;

pub use auth::{current_user, AuthMiddleware, AuthenticatedUser};
