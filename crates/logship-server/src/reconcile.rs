use rusqlite::Connection;
use tracing::info;

use crate::db::Database;
use crate::queries::{project, session};
use crate::Result;
use logship_types::OwnerId;

const COST_EPSILON: f64 = 1e-9;

/// One counter that disagrees with its from-scratch recomputation.
#[derive(Debug, Clone)]
pub struct CounterDrift {
    /// "session" or "project"
    pub entity: &'static str,
    pub id: String,
    pub stored_count: i64,
    pub actual_count: i64,
    pub stored_cost: f64,
    pub actual_cost: f64,
}

fn session_drift(conn: &Connection) -> Result<Vec<(OwnerId, CounterDrift)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT s.owner_id, s.id, s.message_count, s.total_cost,
               COUNT(m.id), COALESCE(SUM(m.cost), 0)
        FROM sessions s
        LEFT JOIN messages m
            ON m.owner_id = s.owner_id AND m.session_id = s.id
        GROUP BY s.owner_id, s.id
        "#,
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CounterDrift {
                    entity: "session",
                    id: row.get(1)?,
                    stored_count: row.get(2)?,
                    stored_cost: row.get(3)?,
                    actual_count: row.get(4)?,
                    actual_cost: row.get(5)?,
                },
            ))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(rows
        .into_iter()
        .filter(|(_, d)| {
            d.stored_count != d.actual_count
                || (d.stored_cost - d.actual_cost).abs() > COST_EPSILON
        })
        .map(|(owner, d)| (OwnerId::new(owner), d))
        .collect())
}

fn project_drift(conn: &Connection) -> Result<Vec<CounterDrift>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT p.id, p.message_count, p.total_cost,
               COUNT(m.id), COALESCE(SUM(m.cost), 0)
        FROM projects p
        LEFT JOIN messages m
            ON m.owner_id = p.owner_id AND m.project_id = p.id
        GROUP BY p.id
        "#,
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(CounterDrift {
                entity: "project",
                id: row.get(0)?,
                stored_count: row.get(1)?,
                stored_cost: row.get(2)?,
                actual_count: row.get(3)?,
                actual_cost: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(rows
        .into_iter()
        .filter(|d| {
            d.stored_count != d.actual_count
                || (d.stored_cost - d.actual_cost).abs() > COST_EPSILON
        })
        .collect())
}

/// Compare incrementally maintained aggregates against a full recomputation
/// from the messages table. The two paths must agree exactly; any drift is
/// reported and, when `repair` is set, the stored counters are rewritten to
/// the recomputed values.
pub fn reconcile(db: &Database, repair: bool) -> Result<Vec<CounterDrift>> {
    let conn = &db.conn;
    let mut drifts = Vec::new();

    for (owner, drift) in session_drift(conn)? {
        if repair {
            session::set_counters(conn, &owner, &drift.id, drift.actual_count, drift.actual_cost)?;
        }
        drifts.push(drift);
    }

    for drift in project_drift(conn)? {
        if repair {
            project::set_counters(conn, &drift.id, drift.actual_count, drift.actual_cost)?;
        }
        drifts.push(drift);
    }

    info!(drifts = drifts.len(), repaired = repair, "reconcile complete");
    Ok(drifts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestService;
    use chrono::Utc;
    use logship_types::{CanonicalMessage, IngestBatch, MessageKind, content_hash};

    fn message(id: &str, session: &str, cost: Option<f64>) -> CanonicalMessage {
        CanonicalMessage {
            id: id.to_string(),
            kind: MessageKind::User,
            session_id: session.to_string(),
            parent_id: None,
            timestamp: Utc::now(),
            text_content: Some(id.to_string()),
            model_name: None,
            token_usage: None,
            cost_estimate: cost,
            duration_ms: None,
            tool_payload: None,
            content_hash: content_hash("user", session, None, Some(id), None),
        }
    }

    #[test]
    fn test_normal_ingestion_has_zero_drift() {
        let db = Database::open_in_memory().unwrap();
        let service = IngestService::new(&db);
        let owner = OwnerId::new("o");

        service
            .ingest(
                &owner,
                &IngestBatch::new(
                    "/p",
                    vec![
                        message("m-1", "s-1", Some(0.1)),
                        message("m-2", "s-1", Some(0.2)),
                        message("m-3", "s-2", None),
                    ],
                ),
            )
            .unwrap();

        let drifts = reconcile(&db, false).unwrap();
        assert!(drifts.is_empty(), "unexpected drift: {:?}", drifts);
    }

    #[test]
    fn test_corrupted_counter_detected_and_repaired() {
        let db = Database::open_in_memory().unwrap();
        let service = IngestService::new(&db);
        let owner = OwnerId::new("o");

        service
            .ingest(
                &owner,
                &IngestBatch::new(
                    "/p",
                    vec![message("m-1", "s-1", Some(0.5)), message("m-2", "s-1", None)],
                ),
            )
            .unwrap();

        // Corrupt the session counter behind the service's back
        session::set_counters(&db.conn, &owner, "s-1", 99, 42.0).unwrap();

        let drifts = reconcile(&db, true).unwrap();
        assert_eq!(drifts.len(), 1);
        assert_eq!(drifts[0].entity, "session");
        assert_eq!(drifts[0].stored_count, 99);
        assert_eq!(drifts[0].actual_count, 2);

        // Repaired: a second pass is clean
        assert!(reconcile(&db, false).unwrap().is_empty());
    }
}
