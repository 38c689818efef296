pub mod error;
pub mod filters;
pub mod movie;
pub mod runtime;

use std::{fmt::Display, str::FromStr as _, time::Duration};

pub use error::Error;
pub use filters::Filters;
pub use runtime::Runtime;
pub use sqlx::Error as SqlxError;

use greenlight_types::config::BackendConfig;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::debug;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn new_pool(config: &BackendConfig) -> Result<Pool, Error> {
    let database_url = config.database_url();
    let options = SqliteConnectOptions::from_str(&database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(config.query_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_open_conns)
        .max_lifetime(config.db_max_lifetime)
        .idle_timeout(config.db_max_idle_time)
        .connect_with(options)
        .await?;
    debug!(%database_url, "Connected to database");
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{} ASC", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub offset: i64,
    pub limit: i64,
    /// number of all records matching the filters, not only those in `rows`
    pub total: u64,
    pub rows: Vec<T>,
}
