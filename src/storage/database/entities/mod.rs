//! SeaORM entity definitions

pub mod interaction;
pub mod user;

pub use interaction::Entity as Interaction;
pub use user::Entity as User;
