//! Authentication endpoints: register, login, token refresh, current user

use crate::auth::{hash_password, verify_password, TokenPair};
use crate::server::middleware::current_user;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::storage::database::entities::user;
use crate::storage::NewUser;
use crate::utils::validation;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Configure authentication routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/me", web::get().to(me)),
    );
}

/// Registration request payload
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plain-text password (hashed before storage)
    pub password: String,
}

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Registered email address
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// Token refresh request payload
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A previously issued refresh token
    pub refresh_token: String,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// User ID
    pub id: Uuid,
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Account creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserInfo {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at.to_utc(),
        }
    }
}

/// Successful authentication response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Issued token pair
    #[serde(flatten)]
    pub tokens: TokenPair,
    /// Authenticated user
    pub user: UserInfo,
}

/// User registration endpoint
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> ActixResult<HttpResponse> {
    info!("User registration attempt: {}", request.username);

    // Validate input
    if let Err(e) = validation::validate_username(&request.username) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string())));
    }
    if let Err(e) = validation::validate_email(&request.email) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string())));
    }
    if let Err(e) = validation::validate_password(&request.password) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string())));
    }

    // Check if email already exists
    match state.storage.find_user_by_email(&request.email).await {
        Ok(Some(_)) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(
                "Email is already registered. Please use a different email or login".to_string(),
            )));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to check existing email: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Database error".to_string())));
        }
    }

    // Check if username already exists
    match state.storage.find_user_by_username(&request.username).await {
        Ok(Some(_)) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(
                "Username already exists".to_string(),
            )));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to check existing user: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Database error".to_string())));
        }
    }

    // Hash password
    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Password hashing failed".to_string(),
            )));
        }
    };

    // Store user in database
    let request = request.into_inner();
    let created = match state
        .storage
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
        })
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to create user: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("User creation failed".to_string())));
        }
    };

    // Issue tokens so registration logs the user straight in
    let tokens = match state.jwt.create_token_pair(created.id) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to generate tokens: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Token generation failed".to_string(),
            )));
        }
    };

    info!("User registered successfully: {}", created.username);

    Ok(HttpResponse::Created().json(ApiResponse::success(AuthResponse {
        tokens,
        user: created.into(),
    })))
}

/// User login endpoint
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> ActixResult<HttpResponse> {
    info!("User login attempt: {}", request.email);

    // Find user by email
    let user = match state.storage.find_user_by_email(&request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Login attempt with unknown email: {}", request.email);
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid credentials".to_string())));
        }
        Err(e) => {
            error!("Database error during login: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Database error".to_string())));
        }
    };

    // Verify password
    let password_valid = match verify_password(&request.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            error!("Password verification error: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Authentication error".to_string(),
            )));
        }
    };

    if !password_valid {
        warn!("Login attempt with invalid password for: {}", request.email);
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::<()>::error("Invalid credentials".to_string())));
    }

    // Update last login time (best-effort)
    if let Err(e) = state.storage.update_user_last_login(user.id).await {
        warn!("Failed to update last login time: {}", e);
    }

    // Generate JWT tokens
    let tokens = match state.jwt.create_token_pair(user.id) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to generate tokens: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Token generation failed".to_string(),
            )));
        }
    };

    info!("User logged in successfully: {}", user.username);

    Ok(HttpResponse::Ok().json(ApiResponse::success(AuthResponse {
        tokens,
        user: user.into(),
    })))
}

/// Token refresh endpoint
pub async fn refresh(
    state: web::Data<AppState>,
    request: web::Json<RefreshRequest>,
) -> ActixResult<HttpResponse> {
    let user_id = match state.jwt.verify_refresh_token(&request.refresh_token) {
        Ok(user_id) => user_id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::<()>::error(
                "Invalid or expired refresh token".to_string(),
            )));
        }
    };

    // The account must still exist
    let user = match state.storage.find_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Refresh attempt for deleted user: {}", user_id);
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid credentials".to_string())));
        }
        Err(e) => {
            error!("Database error during token refresh: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Database error".to_string())));
        }
    };

    let tokens = match state.jwt.create_token_pair(user.id) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to generate tokens: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Token generation failed".to_string(),
            )));
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(AuthResponse {
        tokens,
        user: user.into(),
    })))
}

/// Current user endpoint
pub async fn me(state: web::Data<AppState>, req: HttpRequest) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    match state.storage.find_user_by_id(auth.user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user)))),
        Ok(None) => Ok(HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("User not found".to_string()))),
        Err(e) => {
            error!("Database error fetching current user: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Database error".to_string())))
        }
    }
}
