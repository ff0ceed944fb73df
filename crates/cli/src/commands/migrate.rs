//! Database migration commands.
//!
//! The storefront keeps no domain data of its own. Its only table is the
//! session store, whose schema is owned by `tower-sessions-sqlx-store`.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Create the `tower_sessions.session` table if it does not exist.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migration complete");
    Ok(())
}
