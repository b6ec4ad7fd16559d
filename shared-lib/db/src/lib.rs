//! Database utilities for the school services.
//!
//! This crate provides MySQL connection pool management using sqlx and a
//! [`MySqlUserStore`] implementing the `auth` user store contract.

mod config;
mod pool;
mod user_store;

pub use config::DbConfig;
pub use pool::{create_pool, health_check, DbPool};
pub use user_store::MySqlUserStore;
