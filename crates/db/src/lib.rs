use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Pool, Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if needed) the database at `database_url` and apply migrations.
    pub async fn new(database_url: &str) -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?;
        Self::connect(options).await
    }

    pub async fn new_at_path(path: &Path) -> Result<DBService, sqlx::Error> {
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<DBService, sqlx::Error> {
        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database ready");
        Ok(DBService { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Transaction that holds SQLite's write lock from its first statement, so
/// read-then-write bodies wait on `busy_timeout` instead of failing to upgrade.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
