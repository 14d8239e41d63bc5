// crates/claudex-db/src/queries/consensus.rs
use super::{from_json_array, to_json_array};
use crate::Database;
use claudex_types::{ConsensusDecision, DecisionStatus};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

fn row_to_consensus(row: &sqlx::sqlite::SqliteRow) -> Option<ConsensusDecision> {
    let status_str: String = row.try_get("status").ok()?;
    Some(ConsensusDecision {
        id: row.try_get("id").ok()?,
        session_id: row.try_get("session_id").ok()?,
        project: row.try_get("project").ok()?,
        timestamp_epoch_ms: row.try_get("timestamp_epoch_ms").ok()?,
        title: row.try_get("title").ok()?,
        description: row.try_get("description").ok()?,
        status: DecisionStatus::from_str(&status_str).ok()?,
        positions: row.try_get("positions").ok()?,
        verdict: row.try_get("verdict").ok()?,
        tags: from_json_array(row.try_get::<String, _>("tags").ok()?.as_str()),
        files_affected: from_json_array(row.try_get::<String, _>("files_affected").ok()?.as_str()),
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_consensus(
    db: &Database,
    session_id: &str,
    project: Option<&str>,
    timestamp_epoch_ms: i64,
    title: &str,
    description: &str,
    status: DecisionStatus,
    positions: Option<&str>,
    verdict: Option<&str>,
    tags: &[String],
    files_affected: &[String],
) -> i64 {
    let result = sqlx::query(
        "INSERT INTO consensus_decisions
            (session_id, project, timestamp_epoch_ms, title, description, status, positions, verdict, tags, files_affected)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(project)
    .bind(timestamp_epoch_ms)
    .bind(title)
    .bind(description)
    .bind(status.as_str())
    .bind(positions)
    .bind(verdict)
    .bind(to_json_array(tags))
    .bind(to_json_array(files_affected))
    .execute(db.pool())
    .await;

    match result {
        Ok(r) => r.last_insert_rowid(),
        Err(e) => {
            warn!("insert_consensus failed: {e}");
            -1
        }
    }
}

pub async fn get_recent_consensus(db: &Database, limit: u32, project: Option<&str>) -> Vec<ConsensusDecision> {
    let rows = match project {
        Some(p) => {
            sqlx::query("SELECT * FROM consensus_decisions WHERE project = ? ORDER BY timestamp_epoch_ms DESC LIMIT ?")
                .bind(p)
                .bind(limit as i64)
                .fetch_all(db.pool())
                .await
        }
        None => {
            sqlx::query("SELECT * FROM consensus_decisions ORDER BY timestamp_epoch_ms DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(db.pool())
                .await
        }
    };
    rows.unwrap_or_else(|e| {
        warn!("get_recent_consensus failed: {e}");
        Vec::new()
    })
    .iter()
    .filter_map(row_to_consensus)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_recent_consensus() {
        let db = Database::new_in_memory().await.unwrap();
        insert_consensus(
            &db,
            "s1",
            None,
            1000,
            "use sqlite fts5",
            "chosen over tantivy for embedded simplicity",
            DecisionStatus::Agreed,
            None,
            Some("agreed"),
            &["store".to_string()],
            &[],
        )
        .await;
        let recent = get_recent_consensus(&db, 10, None).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, DecisionStatus::Agreed);
    }
}
