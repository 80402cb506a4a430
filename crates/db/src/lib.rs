pub mod models;
pub mod repositories;
pub mod schema;

pub mod mock;

use eyre::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Checks whether a repository error is a unique constraint violation on the
/// named constraint, so insert races can be mapped to a domain error
/// instead of a server fault.
pub fn is_unique_violation(err: &eyre::Report, constraint: &str) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => {
            db.is_unique_violation() && db.constraint().map_or(true, |c| c == constraint)
        }
        _ => false,
    }
}
