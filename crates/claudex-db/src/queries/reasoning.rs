// crates/claudex-db/src/queries/reasoning.rs
use super::{from_json_array, to_json_array};
use crate::Database;
use claudex_types::{ReasoningChain, ReasoningTrigger};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

fn row_to_reasoning(row: &sqlx::sqlite::SqliteRow) -> Option<ReasoningChain> {
    let trigger_str: String = row.try_get("trigger").ok()?;
    Some(ReasoningChain {
        id: row.try_get("id").ok()?,
        session_id: row.try_get("session_id").ok()?,
        project: row.try_get("project").ok()?,
        timestamp_epoch_ms: row.try_get("timestamp_epoch_ms").ok()?,
        trigger: ReasoningTrigger::from_str(&trigger_str).ok()?,
        title: row.try_get("title").ok()?,
        reasoning: row.try_get("reasoning").ok()?,
        importance: row.try_get::<i64, _>("importance").ok()? as u8,
        decisions: from_json_array(row.try_get::<String, _>("decisions").ok()?.as_str()),
        files_involved: from_json_array(row.try_get::<String, _>("files_involved").ok()?.as_str()),
    })
}

/// Append-only insert, returning the new row id (or `-1` on failure).
#[allow(clippy::too_many_arguments)]
pub async fn insert_reasoning(
    db: &Database,
    session_id: &str,
    project: Option<&str>,
    timestamp_epoch_ms: i64,
    trigger: ReasoningTrigger,
    title: &str,
    reasoning: &str,
    importance: u8,
    decisions: &[String],
    files_involved: &[String],
) -> i64 {
    let result = sqlx::query(
        "INSERT INTO reasoning_chains
            (session_id, project, timestamp_epoch_ms, trigger, title, reasoning, importance, decisions, files_involved)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(project)
    .bind(timestamp_epoch_ms)
    .bind(trigger.as_str())
    .bind(title)
    .bind(reasoning)
    .bind(importance as i64)
    .bind(to_json_array(decisions))
    .bind(to_json_array(files_involved))
    .execute(db.pool())
    .await;

    match result {
        Ok(r) => r.last_insert_rowid(),
        Err(e) => {
            warn!("insert_reasoning failed: {e}");
            -1
        }
    }
}

pub async fn get_recent_reasoning(db: &Database, limit: u32, project: Option<&str>) -> Vec<ReasoningChain> {
    let rows = match project {
        Some(p) => {
            sqlx::query("SELECT * FROM reasoning_chains WHERE project = ? ORDER BY timestamp_epoch_ms DESC LIMIT ?")
                .bind(p)
                .bind(limit as i64)
                .fetch_all(db.pool())
                .await
        }
        None => {
            sqlx::query("SELECT * FROM reasoning_chains ORDER BY timestamp_epoch_ms DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(db.pool())
                .await
        }
    };
    rows.unwrap_or_else(|e| {
        warn!("get_recent_reasoning failed: {e}");
        Vec::new()
    })
    .iter()
    .filter_map(row_to_reasoning)
    .collect()
}

pub async fn get_reasoning_by_session(db: &Database, session_id: &str) -> Vec<ReasoningChain> {
    let rows = sqlx::query("SELECT * FROM reasoning_chains WHERE session_id = ? ORDER BY timestamp_epoch_ms ASC")
        .bind(session_id)
        .fetch_all(db.pool())
        .await
        .unwrap_or_else(|e| {
            warn!("get_reasoning_by_session failed for {session_id}: {e}");
            Vec::new()
        });
    rows.iter().filter_map(row_to_reasoning).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_recent() {
        let db = Database::new_in_memory().await.unwrap();
        let id = insert_reasoning(
            &db,
            "s1",
            Some("crate-x"),
            1000,
            ReasoningTrigger::PreCompact,
            "why we picked sqlite",
            "because it's embedded",
            4,
            &["use sqlite".to_string()],
            &["src/lib.rs".to_string()],
        )
        .await;
        assert!(id > 0);
        let recent = get_recent_reasoning(&db, 10, Some("crate-x")).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].trigger, ReasoningTrigger::PreCompact);
        assert_eq!(recent[0].decisions, vec!["use sqlite".to_string()]);
    }
}
