//! CLI subcommand implementations.

pub mod migrate;
pub mod sessions;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by the database commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    SessionStore(#[from] tower_sessions::session_store::Error),
}

/// Read the storefront database URL, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    let _ = dotenvy::dotenv();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

async fn connect() -> Result<PgPool, CommandError> {
    use secrecy::ExposeSecret;

    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}
