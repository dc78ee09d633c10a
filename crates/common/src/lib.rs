//! CourseHub Common Library
//!
//! Shared code for the CourseHub discussion services including:
//! - Database models and repository patterns
//! - User directory client abstraction
//! - Error types and handling
//! - Configuration management
//! - Viewer identity extraction
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod directory;
pub mod errors;
pub mod identity;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use directory::UserDirectory;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
