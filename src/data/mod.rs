//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Typed records for users, key pairs, posts and delivery jobs

mod database;
mod models;

pub use database::Database;
pub use models::*;

#[cfg(test)]
mod database_test;
