//! Database access layer for message persistence.
//!
//! All SQL lives behind the repositories in this module; the dispatch engine
//! and HTTP handlers never issue queries directly. This keeps the claim
//! transition and the status guards in one place.

use std::sync::Arc;

use sqlx::PgPool;

pub mod messages;

use crate::error::Result;

/// Container for repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Repository for message records.
    pub messages: Arc<messages::Repository>,
}

impl Storage {
    /// Creates a new storage instance over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self { messages: Arc::new(messages::Repository::new(pool)) }
    }

    /// Verifies database connectivity with a trivial query.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.messages.pool()).await?;

        Ok(())
    }
}
