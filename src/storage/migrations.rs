use rusqlite::Connection;

const MIGRATION_001: &str = include_str!("../../migrations/001_visitors.sql");

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            applied INTEGER NOT NULL
        );",
    )?;

    let migrations: &[(i64, &str, &str)] = &[(1, "001_visitors", MIGRATION_001)];

    for &(id, name, sql) in migrations {
        let applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !applied {
            tracing::info!(migration = name, "applying migration");
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO _migrations (id, name, applied) VALUES (?1, ?2, unixepoch())",
                rusqlite::params![id, name],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);

        let open_default: Option<i64> = {
            conn.execute(
                "INSERT INTO visitors (ip_address, destination_port, session_id, user_agent,
                                       device_type, browser, start_time)
                 VALUES ('1.1.1.1', 80, 's', 'ua', 'Desktop', 'Unknown', 0)",
                [],
            )
            .unwrap();
            conn.query_row("SELECT end_time FROM visitors", [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(open_default, None);
    }
}
