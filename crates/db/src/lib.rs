//! SQLite database access for the library service.
//!
//! [`Database`] wraps a `sqlx::SqlitePool` and applies module-contributed
//! [`Migration`]s. Applied migrations are recorded in `_library_migrations`
//! keyed by `(module, id)`, so reapplying the same set is a no-op.

use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use library_kernel::settings::DatabaseSettings;
use library_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

/// Errors raised while opening or migrating the database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Holds a connection pool to the SQLite database.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file named in `settings`.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        Self::open(&settings.path, settings.max_connections).await
    }

    /// Open (or create) the database at `path`.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::info!(target: "library-db", path = %path.display(), "database opened");
        Ok(Self { pool })
    }

    /// Private in-memory database. Each `Database` gets its own; a single
    /// connection keeps the schema alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply every migration not yet recorded, each in its own transaction.
    /// Returns how many were applied.
    pub async fn apply_migrations(
        &self,
        migrations: &[(String, Migration)],
    ) -> Result<usize, DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _library_migrations (
                module     TEXT    NOT NULL,
                id         TEXT    NOT NULL,
                applied_at INTEGER NOT NULL,
                PRIMARY KEY (module, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let already: Option<(String,)> =
                sqlx::query_as("SELECT id FROM _library_migrations WHERE module = ? AND id = ?")
                    .bind(module)
                    .bind(migration.id)
                    .fetch_optional(&self.pool)
                    .await?;
            if already.is_some() {
                tracing::debug!(target: "library-db", %module, id = migration.id, "migration already applied");
                continue;
            }

            let wrap = |source: sqlx::Error| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            };

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .map_err(wrap)?;
            sqlx::query("INSERT INTO _library_migrations (module, id, applied_at) VALUES (?, ?, ?)")
                .bind(module)
                .bind(migration.id)
                .bind(now_timestamp())
                .execute(&mut *tx)
                .await
                .map_err(wrap)?;
            tx.commit().await?;

            tracing::info!(target: "library-db", %module, id = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_migrations() -> Vec<(String, Migration)> {
        vec![(
            "shelf".to_string(),
            Migration {
                id: "001_init",
                up: r#"
                    CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
                    CREATE INDEX shelf_label ON shelf (label);
                "#,
            },
        )]
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let db = Database::in_memory().await.unwrap();
        let migrations = sample_migrations();

        assert_eq!(db.apply_migrations(&migrations).await.unwrap(), 1);
        assert_eq!(db.apply_migrations(&migrations).await.unwrap(), 0);

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(names.contains(&"shelf"));
        assert!(names.contains(&"_library_migrations"));
    }

    #[tokio::test]
    async fn test_failed_migration_names_its_source() {
        let db = Database::in_memory().await.unwrap();
        let broken = vec![(
            "shelf".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE (",
            },
        )];

        let err = db.apply_migrations(&broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { ref id, .. } if id == "001_broken"));

        let recorded: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _library_migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded.0, 0);
    }

    #[tokio::test]
    async fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("library.db");
        let db = Database::open(&db_path, 2).await.unwrap();
        db.apply_migrations(&sample_migrations()).await.unwrap();
        db.close().await;
        assert!(db_path.exists());

        let reopened = Database::open(&db_path, 2).await.unwrap();
        assert_eq!(reopened.apply_migrations(&sample_migrations()).await.unwrap(), 0);
    }
}
