//! Database connection and repository module
//!
//! Provides connection pooling plus the table-scoped repositories the core
//! services read from and write to. Each aggregation or import invocation
//! runs as one request-scoped chain of fetches; nothing is cached between
//! calls and reads across fetches are not snapshot-consistent.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub mod completion_repository;
pub mod import_log_repository;
pub mod insight_repository;
pub mod project_repository;

pub use completion_repository::CompletionRepository;
pub use import_log_repository::ImportLogRepository;
pub use insight_repository::InsightRepository;
pub use project_repository::ProjectRepository;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/completions".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Create a connection pool from the given configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        "Connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connection_timeout)
        .connect(&config.database_url)
        .await
}
