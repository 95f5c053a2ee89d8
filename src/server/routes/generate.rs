//! Query generation endpoints
//!
//! `POST /api/generate` returns the whole completion; `POST
//! /api/generate/stream` relays the provider's token stream as SSE.

use crate::provider::QueryMetadata;
use crate::relay::{sse_response, StreamRelay};
use crate::server::middleware::current_user;
use crate::server::routes::{errors, ApiResponse};
use crate::server::state::AppState;
use crate::storage::NewInteraction;
use crate::utils::validation::validate_query;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Number of items returned by the recent-interactions endpoint
const RECENT_LIMIT: u64 = 5;

/// Configure generation routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/generate")
            .route("", web::post().to(generate))
            .route("/stream", web::post().to(generate_stream))
            .route("/recent", web::get().to(recent)),
    );
}

/// Generation request payload
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Free-text query
    pub query: String,
}

/// A generated (and usually persisted) completion
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Persisted interaction ID; absent when recording failed
    pub id: Option<Uuid>,
    /// The submitted query
    pub query: String,
    /// The generated response text
    pub response: String,
    /// Completion metadata
    pub metadata: QueryMetadata,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Generate a complete response for a query
pub async fn generate(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<GenerateRequest>,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    if let Err(e) = validate_query(&request.query) {
        return Ok(errors::validation_error(&e.to_string()));
    }
    let query = request.query.trim().to_string();

    info!(user_id = %auth.user_id, "generate request");

    let completion = match state.provider.complete(&query).await {
        Ok(completion) => completion,
        Err(e) => {
            error!("completion request failed: {}", e);
            return Ok(e.error_response());
        }
    };

    let metadata = QueryMetadata::from(&completion);

    // Recording failures do not withhold the already-generated response;
    // the interaction is simply absent from history.
    let saved = match state
        .storage
        .insert_interaction(NewInteraction {
            user_id: auth.user_id,
            query_text: query.clone(),
            response_text: completion.text.clone(),
            metadata: metadata.clone(),
        })
        .await
    {
        Ok(model) => Some(model),
        Err(e) => {
            error!("failed to record interaction: {}", e);
            None
        }
    };

    let response = GenerateResponse {
        id: saved.as_ref().map(|model| model.id),
        query,
        response: completion.text,
        metadata,
        created_at: saved
            .map(|model| model.created_at.to_utc())
            .unwrap_or_else(chrono::Utc::now),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Stream a response for a query as server-sent events
pub async fn generate_stream(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<GenerateRequest>,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    if let Err(e) = validate_query(&request.query) {
        return Ok(errors::validation_error(&e.to_string()));
    }
    let query = request.query.trim().to_string();

    info!(user_id = %auth.user_id, "streaming generate request");

    // Failures opening the stream surface as plain HTTP errors; failures
    // after the stream is open surface as in-band error frames.
    let upstream = match state.provider.stream(&query).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to open provider stream: {}", e);
            return Ok(e.error_response());
        }
    };

    let relay = StreamRelay::new(
        Some(auth.user_id),
        query,
        state.provider.model().to_string(),
    );

    Ok(sse_response(
        relay.into_sse_stream(upstream, Arc::clone(&state.storage)),
    ))
}

/// Interaction view returned by listing endpoints
#[derive(Debug, Serialize)]
pub struct InteractionView {
    /// Interaction ID
    pub id: Uuid,
    /// The submitted query
    pub query: String,
    /// The recorded response
    pub response: String,
    /// Recorded metadata
    pub metadata: serde_json::Value,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::storage::database::entities::interaction::Model> for InteractionView {
    fn from(model: crate::storage::database::entities::interaction::Model) -> Self {
        Self {
            id: model.id,
            query: model.query_text,
            response: model.response_text,
            metadata: model.metadata,
            created_at: model.created_at.to_utc(),
        }
    }
}

/// Most recent interactions for the current user
pub async fn recent(state: web::Data<AppState>, req: HttpRequest) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    match state
        .storage
        .find_recent_interactions(auth.user_id, RECENT_LIMIT)
        .await
    {
        Ok(items) => {
            let views: Vec<InteractionView> =
                items.into_iter().map(InteractionView::from).collect();
            let count = views.len();
            Ok(HttpResponse::Ok()
                .json(ApiResponse::success_with_meta(views, json!({ "count": count }))))
        }
        Err(e) => {
            error!("failed to list recent interactions: {}", e);
            Ok(errors::internal_error("Database error"))
        }
    }
}
