use crate::config::DatabaseConfig;
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use rusqlite::Connection;

/// Apply PRAGMAs to a SQLite connection.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
}

/// Create a deadpool-sqlite connection pool.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, deadpool_sqlite::CreatePoolError> {
    let db_path = config.path.clone();

    // Visitor rows hold IP addresses; keep the file private to the service user
    #[cfg(unix)]
    {
        if let Err(e) = restrict_db_file(&db_path) {
            tracing::warn!(error = %e, path = %db_path.display(), "failed to set database file permissions");
        }
    }

    let mut cfg = Config::new(db_path);
    cfg.pool = Some(PoolConfig::new(config.pool_size.max(1)));
    cfg.create_pool(Runtime::Tokio1)
}

/// Create the database file with mode 0600, or tighten an existing one,
/// before SQLite opens it.
#[cfg(unix)]
fn restrict_db_file(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if path.exists() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
    } else {
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
            .map(drop)
    }
}

/// Initialize the pool: get a connection and apply pragmas + run migrations.
pub async fn init_pool(pool: &Pool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get().await?;
    conn.interact(|conn| {
        apply_pragmas(conn)?;
        crate::storage::migrations::run_migrations(conn)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_pool_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig {
            path: dir.path().join("footfall.db"),
            pool_size: 2,
        })
        .unwrap();
        init_pool(&pool).await.unwrap();

        let conn = pool.get().await.unwrap();
        let tables: i64 = conn
            .interact(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'visitors'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_database_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        let pool = create_pool(&DatabaseConfig {
            path: path.clone(),
            pool_size: 1,
        })
        .unwrap();
        init_pool(&pool).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
