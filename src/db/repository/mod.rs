//! Database repositories
//!
//! Repository pattern for database access, separating data access logic
//! from business logic.

pub mod accounts;
pub mod configs;
pub mod domains;
pub mod groups;
pub mod logs;
pub mod panel_domains;
