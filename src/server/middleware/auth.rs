//! Authentication middleware
//!
//! Protected routes require a Bearer access token; the verified user
//! identity is injected into request extensions before any handler runs.

use crate::server::state::AppState;
use crate::utils::error::ServiceError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderMap;
use actix_web::{web, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

/// Identity of the authenticated caller, stored in request extensions
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    /// Verified user ID from the access token
    pub user_id: Uuid,
}

/// Auth middleware for Actix-web
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

/// Service implementation for auth middleware
pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if is_public_route(req.path()) {
                return service.call(req).await;
            }

            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| ServiceError::internal("Application state missing"))?;

            let token = extract_bearer_token(req.headers()).ok_or_else(|| {
                ServiceError::unauthorized("Not authorized to access this route")
            })?;

            let claims = state.jwt.verify_access_token(&token).map_err(|_| {
                ServiceError::unauthorized("Not authorized to access this route")
            })?;

            debug!("authenticated request for user: {}", claims.sub);
            req.extensions_mut().insert(AuthenticatedUser {
                user_id: claims.sub,
            });

            service.call(req).await
        })
    }
}

/// Extract a Bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Check if a route is public (doesn't require authentication)
fn is_public_route(path: &str) -> bool {
    const PUBLIC_ROUTES: &[&str] = &[
        "/api/health",
        "/api/auth/register",
        "/api/auth/login",
        "/api/auth/refresh",
    ];

    PUBLIC_ROUTES.iter().any(|&route| path.starts_with(route))
}

/// Get the authenticated user injected by the middleware
pub fn current_user(req: &HttpRequest) -> Result<AuthenticatedUser, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| ServiceError::unauthorized("User not authenticated").into())
}
