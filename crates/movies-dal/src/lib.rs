pub mod error;
pub mod movie;
pub mod price;

use std::str::FromStr as _;

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type Pool = sqlx::Pool<ChosenDB>;

/// Schema migrations, including the seed rows.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    debug!("Database schema is up to date");
    Ok(())
}

/// Escapes `LIKE` wildcards, so user input is matched as a plain substring.
pub(crate) fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
