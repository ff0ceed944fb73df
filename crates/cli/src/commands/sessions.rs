//! Session maintenance.
//!
//! Expired sessions are only filtered on load, never deleted by the server.
//! Run this from a scheduled job to keep the table small.

use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Delete every session whose expiry has passed.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn prune() -> Result<(), CommandError> {
    let pool = connect().await?;

    PostgresStore::new(pool).delete_expired().await?;

    tracing::info!("Expired sessions deleted");
    Ok(())
}
