use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::errors::AppError;

const MAX_CONNECTIONS: u32 = 10;
const CONNECT_ATTEMPTS: u32 = 5;
const FIRST_BACKOFF: Duration = Duration::from_secs(2);

/// Connects to the document database, retrying with doubling backoff while
/// the server comes up.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut backoff = FIRST_BACKOFF;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let connected = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await;

        match connected {
            Ok(pool) => {
                tracing::info!("Connected to the document database");
                return Ok(pool);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(
                    "Database connection attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    CONNECT_ATTEMPTS,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Applies the embedded `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Document schema is up to date");
    Ok(())
}
