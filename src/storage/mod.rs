//! Storage layer: persistent records of users and their interactions

pub mod database;

pub use database::{Database, NewInteraction, NewUser};
