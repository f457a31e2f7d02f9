//! Database module
//!
//! PostgreSQL integration using sqlx with:
//! - Connection pool management and embedded migrations
//! - Row types with FromRow
//! - Repository functions per table
//! - [`PgDirectory`], the account directory used by the services

pub mod directory;
pub mod models;
pub mod pool;
pub mod repository;

// Re-export commonly used items
pub use directory::PgDirectory;
pub use pool::{create_pool, health_check, run_migrations};
