// crates/claudex-db/src/queries/checkpoint.rs
use super::{from_json_array, to_json_array};
use crate::Database;
use claudex_types::CheckpointState;
use sqlx::Row;
use tracing::warn;

fn row_to_checkpoint(row: &sqlx::sqlite::SqliteRow) -> Option<CheckpointState> {
    Some(CheckpointState {
        session_id: row.try_get("session_id").ok()?,
        active_files: from_json_array(row.try_get::<String, _>("active_files").ok()?.as_str()),
        last_epoch: row.try_get("last_epoch").ok()?,
        boost_applied_at: row.try_get("boost_applied_at").ok()?,
        boost_turn_count: row.try_get::<i64, _>("boost_turn_count").ok()? as u8,
    })
}

pub async fn upsert_checkpoint_state(db: &Database, state: &CheckpointState) {
    let result = sqlx::query(
        "INSERT INTO checkpoint_state (session_id, active_files, last_epoch, boost_applied_at, boost_turn_count)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(session_id) DO UPDATE SET
            active_files = excluded.active_files,
            last_epoch = excluded.last_epoch,
            boost_applied_at = excluded.boost_applied_at,
            boost_turn_count = excluded.boost_turn_count",
    )
    .bind(&state.session_id)
    .bind(to_json_array(&state.active_files))
    .bind(state.last_epoch)
    .bind(state.boost_applied_at)
    .bind(state.boost_turn_count as i64)
    .execute(db.pool())
    .await;
    if let Err(e) = result {
        warn!("upsert_checkpoint_state failed for {}: {e}", state.session_id);
    }
}

pub async fn get_checkpoint_state(db: &Database, session_id: &str) -> Option<CheckpointState> {
    let row = sqlx::query("SELECT * FROM checkpoint_state WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(db.pool())
        .await
        .unwrap_or_else(|e| {
            warn!("get_checkpoint_state failed for {session_id}: {e}");
            None
        })?;
    row_to_checkpoint(&row)
}

/// Commit a spent boost turn after the sidecar has *actually responded*
/// with `source = "hologram"` (§4.6) — fallback sources never call this.
pub async fn update_boost_state(db: &Database, session_id: &str, boost_applied_at: i64, boost_turn_count: u8) {
    let result = sqlx::query(
        "UPDATE checkpoint_state SET boost_applied_at = ?, boost_turn_count = ? WHERE session_id = ?",
    )
    .bind(boost_applied_at)
    .bind(boost_turn_count as i64)
    .bind(session_id)
    .execute(db.pool())
    .await;
    if let Err(e) = result {
        warn!("update_boost_state failed for {session_id}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_fetch() {
        let db = Database::new_in_memory().await.unwrap();
        let state = CheckpointState {
            session_id: "s1".to_string(),
            active_files: vec!["a.rs".to_string()],
            last_epoch: 1000,
            boost_applied_at: None,
            boost_turn_count: 0,
        };
        upsert_checkpoint_state(&db, &state).await;
        let fetched = get_checkpoint_state(&db, "s1").await.unwrap();
        assert_eq!(fetched.active_files, vec!["a.rs".to_string()]);
    }

    #[tokio::test]
    async fn update_boost_state_increments_turn_count() {
        let db = Database::new_in_memory().await.unwrap();
        let state = CheckpointState {
            session_id: "s1".to_string(),
            active_files: vec!["a.rs".to_string()],
            last_epoch: 1000,
            boost_applied_at: None,
            boost_turn_count: 0,
        };
        upsert_checkpoint_state(&db, &state).await;
        update_boost_state(&db, "s1", 2000, 1).await;
        let fetched = get_checkpoint_state(&db, "s1").await.unwrap();
        assert_eq!(fetched.boost_turn_count, 1);
        assert_eq!(fetched.boost_applied_at, Some(2000));
    }
}
