use crate::error::AppResult;
use crate::types::{Browser, DeviceType, NewVisit, VisitQueryParams, VisitorRecord};
use deadpool_sqlite::Pool;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};

const SELECT_COLUMNS: &str = "id, ip_address, region, destination_port, session_id, user_agent,
     device_type, browser, city, asn, isp, latitude, longitude,
     start_time, end_time, total_time_spent";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<VisitorRecord> {
    Ok(VisitorRecord {
        id: row.get(0)?,
        ip_address: row.get(1)?,
        region: row.get(2)?,
        destination_port: row.get(3)?,
        session_id: row.get(4)?,
        user_agent: row.get(5)?,
        device_type: DeviceType::from_label(&row.get::<_, String>(6)?),
        browser: Browser::from_label(&row.get::<_, String>(7)?),
        city: row.get(8)?,
        asn: row.get(9)?,
        isp: row.get(10)?,
        latitude: row.get(11)?,
        longitude: row.get(12)?,
        start_time: row.get(13)?,
        end_time: row.get(14)?,
        total_time_spent: row.get(15)?,
    })
}

/// Insert a new open visit. Returns the row id.
pub async fn insert_visit(pool: &Pool, visit: NewVisit) -> AppResult<i64> {
    let conn = pool.get().await?;
    let start_time = chrono::Utc::now().timestamp();

    let id = conn
        .interact(move |conn| {
            conn.execute(
                "INSERT INTO visitors (
                    ip_address, region, destination_port, session_id, user_agent,
                    device_type, browser, city, asn, isp, latitude, longitude, start_time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    visit.ip_address,
                    visit.region,
                    visit.destination_port,
                    visit.session_id,
                    visit.user_agent,
                    visit.device_type.as_str(),
                    visit.browser.as_str(),
                    visit.city,
                    visit.asn,
                    visit.isp,
                    visit.latitude,
                    visit.longitude,
                    start_time,
                ],
            )?;
            Ok::<_, rusqlite::Error>(conn.last_insert_rowid())
        })
        .await??;

    Ok(id)
}

/// Close every open visit for `session_id`. Returns the number of rows updated,
/// which is zero when the session has no open visit.
pub async fn close_visit(pool: &Pool, session_id: String, total_time_spent: i64) -> AppResult<usize> {
    let conn = pool.get().await?;
    let end_time = chrono::Utc::now().timestamp();

    let updated = conn
        .interact(move |conn| {
            conn.execute(
                "UPDATE visitors
                 SET end_time = ?1, total_time_spent = ?2
                 WHERE session_id = ?3 AND end_time IS NULL",
                params![end_time, total_time_spent, session_id],
            )
        })
        .await??;

    Ok(updated)
}

/// List visits newest first.
pub async fn list_visits(pool: &Pool, filter: VisitQueryParams) -> AppResult<Vec<VisitorRecord>> {
    let conn = pool.get().await?;

    let records = conn
        .interact(move |conn| {
            let mut sql = format!("SELECT {SELECT_COLUMNS} FROM visitors WHERE 1=1");
            let mut values: Vec<Value> = Vec::new();

            if let Some(session_id) = filter.session_id.as_deref() {
                values.push(Value::Text(session_id.to_string()));
                sql.push_str(&format!(" AND session_id = ?{}", values.len()));
            }
            match filter.open {
                Some(true) => sql.push_str(" AND end_time IS NULL"),
                Some(false) => sql.push_str(" AND end_time IS NOT NULL"),
                None => {}
            }

            values.push(Value::Integer(filter.limit()));
            sql.push_str(&format!(" ORDER BY start_time DESC, id DESC LIMIT ?{}", values.len()));
            values.push(Value::Integer(filter.offset()));
            sql.push_str(&format!(" OFFSET ?{}", values.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, rusqlite::Error>(rows)
        })
        .await??;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::sqlite::{create_pool, init_pool};

    async fn test_pool() -> (Pool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig {
            path: dir.path().join("visits.db"),
            pool_size: 2,
        })
        .unwrap();
        init_pool(&pool).await.unwrap();
        (pool, dir)
    }

    fn visit(session_id: &str) -> NewVisit {
        NewVisit {
            ip_address: "203.0.113.9".to_string(),
            region: "Unknown".to_string(),
            destination_port: 443,
            session_id: session_id.to_string(),
            user_agent: "Apache-HttpClient/4.5.14 (Java/17)".to_string(),
            device_type: DeviceType::AutomatedTool,
            browser: Browser::ApacheHttpClient,
            city: "Unknown".to_string(),
            asn: "Unknown".to_string(),
            isp: "Unknown".to_string(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    fn for_session(session_id: &str) -> VisitQueryParams {
        VisitQueryParams {
            session_id: Some(session_id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_creates_open_record() {
        let (pool, _dir) = test_pool().await;
        let id = insert_visit(&pool, visit("s1")).await.unwrap();

        let rows = list_visits(&pool, for_session("s1")).await.unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.id, id);
        assert!(r.is_open());
        assert_eq!(r.total_time_spent, 0);
        assert_eq!(r.device_type, DeviceType::AutomatedTool);
        assert_eq!(r.browser, Browser::ApacheHttpClient);
        assert_eq!(r.destination_port, 443);
    }

    #[tokio::test]
    async fn test_close_is_one_way() {
        let (pool, _dir) = test_pool().await;
        insert_visit(&pool, visit("s1")).await.unwrap();

        assert_eq!(close_visit(&pool, "s1".into(), 42).await.unwrap(), 1);
        // Already closed: nothing left to match
        assert_eq!(close_visit(&pool, "s1".into(), 99).await.unwrap(), 0);

        let rows = list_visits(&pool, for_session("s1")).await.unwrap();
        assert!(rows[0].end_time.is_some());
        assert_eq!(rows[0].total_time_spent, 42);
    }

    #[tokio::test]
    async fn test_close_updates_all_open_rows_for_session() {
        let (pool, _dir) = test_pool().await;
        insert_visit(&pool, visit("dup")).await.unwrap();
        insert_visit(&pool, visit("dup")).await.unwrap();
        insert_visit(&pool, visit("other")).await.unwrap();

        assert_eq!(close_visit(&pool, "dup".into(), 7).await.unwrap(), 2);

        let dup = list_visits(&pool, for_session("dup")).await.unwrap();
        assert!(dup.iter().all(|r| r.total_time_spent == 7 && !r.is_open()));
        let other = list_visits(&pool, for_session("other")).await.unwrap();
        assert!(other[0].is_open());
    }

    #[tokio::test]
    async fn test_close_unknown_session_matches_nothing() {
        let (pool, _dir) = test_pool().await;
        assert_eq!(close_visit(&pool, "abc".into(), 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (pool, _dir) = test_pool().await;
        for i in 0..5 {
            insert_visit(&pool, visit(&format!("s{i}"))).await.unwrap();
        }
        close_visit(&pool, "s0".into(), 1).await.unwrap();

        let open = list_visits(
            &pool,
            VisitQueryParams {
                open: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(open.len(), 4);

        let page = list_visits(
            &pool,
            VisitQueryParams {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 2);
        // Newest first: ids 5,4,3,... so offset 1 starts at s3
        assert_eq!(page[0].session_id, "s3");
        assert_eq!(page[1].session_id, "s2");
    }
}
