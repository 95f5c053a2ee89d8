//! User persistence operations

use super::entities::{self, user};
use super::Database;
use crate::utils::error::{Result, ServiceError};
use sea_orm::*;
use tracing::debug;
use uuid::Uuid;

/// Data required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Argon2 password hash
    pub password_hash: String,
}

impl Database {
    /// Create a new user
    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model> {
        debug!("Creating user: {}", new_user.username);

        let now = chrono::Utc::now();
        let active_model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            last_login_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = active_model
            .insert(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(created)
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        debug!("Finding user by ID: {}", user_id);

        entities::User::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        debug!("Finding user by username: {}", username);

        entities::User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        debug!("Finding user by email: {}", email);

        entities::User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Update user last login
    pub async fn update_user_last_login(&self, user_id: Uuid) -> Result<()> {
        debug!("Updating last login for user: {}", user_id);

        let user_model = entities::User::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let mut active_model: user::ActiveModel = user_model.into();
        active_model.last_login_at = Set(Some(chrono::Utc::now().into()));
        active_model.updated_at = Set(chrono::Utc::now().into());

        active_model
            .update(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(())
    }
}
