//! Query history endpoints
//!
//! Every operation is scoped to the authenticated user; accessing another
//! user's interaction fails with a forbidden error and changes nothing.

use crate::server::middleware::current_user;
use crate::server::routes::generate::InteractionView;
use crate::server::routes::{errors, ApiResponse, PaginatedResponse, PaginationQuery};
use crate::server::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

/// Configure history routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/history")
            .route("", web::get().to(list_history))
            .route("", web::delete().to(clear_history))
            .route("/{id}", web::get().to(get_history_item))
            .route("/{id}", web::delete().to(delete_history_item)),
    );
}

/// List the current user's interactions, newest first
pub async fn list_history(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PaginationQuery>,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    if let Err(message) = query.validate() {
        return Ok(errors::validation_error(&message));
    }
    let limit = query.effective_limit();

    match state
        .storage
        .find_interactions_by_user(auth.user_id, query.page as u64, limit as u64)
        .await
    {
        Ok((items, total)) => {
            let views: Vec<InteractionView> =
                items.into_iter().map(InteractionView::from).collect();
            let response = PaginatedResponse::new(views, query.page, limit, total);
            Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
        }
        Err(e) => {
            error!("failed to list history: {}", e);
            Ok(errors::internal_error("Database error"))
        }
    }
}

/// Fetch a single interaction
pub async fn get_history_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;
    let id = path.into_inner();

    let interaction = match state.storage.find_interaction_by_id(id).await {
        Ok(Some(interaction)) => interaction,
        Ok(None) => {
            return Ok(errors::not_found_error(&format!(
                "Interaction not found with id {}",
                id
            )));
        }
        Err(e) => {
            error!("failed to fetch interaction: {}", e);
            return Ok(errors::internal_error("Database error"));
        }
    };

    if interaction.user_id != auth.user_id {
        return Ok(errors::forbidden_error(
            "Not authorized to access this interaction",
        ));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(InteractionView::from(interaction))))
}

/// Delete a single interaction
///
/// Deleting an already-deleted id reports not-found, never a server error.
pub async fn delete_history_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;
    let id = path.into_inner();

    let interaction = match state.storage.find_interaction_by_id(id).await {
        Ok(Some(interaction)) => interaction,
        Ok(None) => {
            return Ok(errors::not_found_error(&format!(
                "Interaction not found with id {}",
                id
            )));
        }
        Err(e) => {
            error!("failed to fetch interaction: {}", e);
            return Ok(errors::internal_error("Database error"));
        }
    };

    // Ownership check happens before anything is removed
    if interaction.user_id != auth.user_id {
        return Ok(errors::forbidden_error(
            "Not authorized to delete this interaction",
        ));
    }

    match state.storage.delete_interaction_by_id(id).await {
        Ok(_) => {
            info!(user_id = %auth.user_id, interaction_id = %id, "interaction deleted");
            Ok(HttpResponse::Ok().json(ApiResponse::success(json!({}))))
        }
        Err(e) => {
            error!("failed to delete interaction: {}", e);
            Ok(errors::internal_error("Database error"))
        }
    }
}

/// Delete the current user's entire history
pub async fn clear_history(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let auth = current_user(&req)?;

    match state.storage.delete_interactions_by_user(auth.user_id).await {
        Ok(deleted) => {
            info!(user_id = %auth.user_id, deleted, "history cleared");
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(
                json!({}),
                json!({ "deleted": deleted }),
            )))
        }
        Err(e) => {
            error!("failed to clear history: {}", e);
            Ok(errors::internal_error("Database error"))
        }
    }
}
