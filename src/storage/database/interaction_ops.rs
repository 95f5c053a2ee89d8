//! Interaction history persistence operations
//!
//! Each insert is a self-contained document write keyed by a fresh UUID;
//! concurrent relay sessions never contend on the same row.

use super::entities::{self, interaction};
use super::Database;
use crate::provider::QueryMetadata;
use crate::utils::error::{Result, ServiceError};
use sea_orm::*;
use tracing::debug;
use uuid::Uuid;

/// Data required to record an interaction
#[derive(Debug, Clone)]
pub struct NewInteraction {
    /// Owning user
    pub user_id: Uuid,
    /// The submitted query text
    pub query_text: String,
    /// The full response text
    pub response_text: String,
    /// Completion metadata
    pub metadata: QueryMetadata,
}

impl Database {
    /// Record a completed interaction
    pub async fn insert_interaction(&self, record: NewInteraction) -> Result<interaction::Model> {
        debug!("Recording interaction for user: {}", record.user_id);

        let active_model = interaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            query_text: Set(record.query_text),
            response_text: Set(record.response_text),
            metadata: Set(serde_json::to_value(&record.metadata)?),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = active_model
            .insert(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(created)
    }

    /// Page through a user's interactions, newest first
    ///
    /// `page` is 1-based. Returns the page items and the total row count;
    /// a page beyond the total yields an empty list.
    pub async fn find_interactions_by_user(
        &self,
        user_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<interaction::Model>, u64)> {
        debug!("Listing interactions for user: {} page {}", user_id, page);

        let paginator = entities::Interaction::find()
            .filter(interaction::Column::UserId.eq(user_id))
            .order_by_desc(interaction::Column::CreatedAt)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::Database)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::Database)?;

        Ok((items, total))
    }

    /// Fetch a user's most recent interactions
    pub async fn find_recent_interactions(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<interaction::Model>> {
        entities::Interaction::find()
            .filter(interaction::Column::UserId.eq(user_id))
            .order_by_desc(interaction::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Find a single interaction by ID
    pub async fn find_interaction_by_id(&self, id: Uuid) -> Result<Option<interaction::Model>> {
        entities::Interaction::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Delete an interaction; returns whether a row was removed
    pub async fn delete_interaction_by_id(&self, id: Uuid) -> Result<bool> {
        let result = entities::Interaction::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(result.rows_affected > 0)
    }

    /// Delete all interactions owned by a user; returns the removed count
    pub async fn delete_interactions_by_user(&self, user_id: Uuid) -> Result<u64> {
        let result = entities::Interaction::delete_many()
            .filter(interaction::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(ServiceError::Database)?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::NewUser;

    async fn test_database() -> Database {
        let database = Database::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        database
    }

    async fn test_user(db: &Database, name: &str) -> Uuid {
        db.create_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "$argon2-fake-hash".to_string(),
        })
        .await
        .unwrap()
        .id
    }

    fn record(user_id: Uuid, n: usize) -> NewInteraction {
        NewInteraction {
            user_id,
            query_text: format!("query {}", n),
            response_text: format!("response {}", n),
            metadata: QueryMetadata {
                model: "gpt-3.5-turbo".to_string(),
                tokens: 12,
                prompt_tokens: None,
                completion_tokens: None,
                processing_ms: 100,
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = test_database().await;
        let user_id = test_user(&db, "alice").await;

        let created = db.insert_interaction(record(user_id, 1)).await.unwrap();
        assert_eq!(created.query_text, "query 1");

        let fetched = db
            .find_interaction_by_id(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.response_text, "response 1");
        assert_eq!(fetched.metadata["model"], "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_pagination() {
        let db = test_database().await;
        let user_id = test_user(&db, "alice").await;

        for n in 0..25 {
            db.insert_interaction(record(user_id, n)).await.unwrap();
        }

        let (page1, total) = db
            .find_interactions_by_user(user_id, 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 25);
        assert_eq!(page1.len(), 10);

        let (page3, _) = db
            .find_interactions_by_user(user_id, 3, 10)
            .await
            .unwrap();
        assert_eq!(page3.len(), 5);

        // Beyond the total: empty list, not an error
        let (page9, _) = db
            .find_interactions_by_user(user_id, 9, 10)
            .await
            .unwrap();
        assert!(page9.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_isolated_per_user() {
        let db = test_database().await;
        let alice = test_user(&db, "alice").await;
        let bob = test_user(&db, "bob").await;

        db.insert_interaction(record(alice, 1)).await.unwrap();
        db.insert_interaction(record(bob, 2)).await.unwrap();

        let (items, total) = db.find_interactions_by_user(alice, 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].user_id, alice);
    }

    #[tokio::test]
    async fn test_recent_interactions_limit() {
        let db = test_database().await;
        let user_id = test_user(&db, "alice").await;

        for n in 0..8 {
            db.insert_interaction(record(user_id, n)).await.unwrap();
        }

        let recent = db.find_recent_interactions(user_id, 5).await.unwrap();
        assert_eq!(recent.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = test_database().await;
        let user_id = test_user(&db, "alice").await;
        let created = db.insert_interaction(record(user_id, 1)).await.unwrap();

        assert!(db.delete_interaction_by_id(created.id).await.unwrap());
        // Second delete reports nothing removed, not an error
        assert!(!db.delete_interaction_by_id(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let db = test_database().await;
        let alice = test_user(&db, "alice").await;
        let bob = test_user(&db, "bob").await;

        for n in 0..3 {
            db.insert_interaction(record(alice, n)).await.unwrap();
        }
        db.insert_interaction(record(bob, 9)).await.unwrap();

        assert_eq!(db.delete_interactions_by_user(alice).await.unwrap(), 3);

        let (_, bob_total) = db.find_interactions_by_user(bob, 1, 10).await.unwrap();
        assert_eq!(bob_total, 1);
    }
}
