use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recorded query/response interaction
///
/// Interactions are append-only: created once per completed relay session
/// or whole completion, never updated afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "interactions")]
pub struct Model {
    /// Interaction ID (UUID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// The submitted query text
    #[sea_orm(column_type = "Text")]
    pub query_text: String,

    /// The full response text
    #[sea_orm(column_type = "Text")]
    pub response_text: String,

    /// Free-form metadata (model name, token estimates, latency)
    pub metadata: Json,

    /// Creation timestamp, used for sorting and pagination
    pub created_at: DateTimeWithTimeZone,
}

/// Interaction entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning user relation
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
