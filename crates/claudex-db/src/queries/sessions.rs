// crates/claudex-db/src/queries/sessions.rs
use crate::Database;
use claudex_types::{Session, SessionScope, SessionStatus};
use sqlx::Row;
use tracing::warn;

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Option<Session> {
    let session_id: String = row.try_get("session_id").ok()?;
    let project: Option<String> = row.try_get("project").ok()?;
    let cwd: String = row.try_get("cwd").ok()?;
    let started_at_epoch: i64 = row.try_get("started_at_epoch").ok()?;
    let ended_at_epoch: Option<i64> = row.try_get("ended_at_epoch").ok()?;
    let status_str: String = row.try_get("status").ok()?;
    let observation_count: i64 = row.try_get("observation_count").ok()?;

    let status = match status_str.as_str() {
        "active" => SessionStatus::Active,
        "completed" => SessionStatus::Completed,
        _ => SessionStatus::Failed,
    };
    let scope = match project {
        Some(p) => SessionScope::Project(p),
        None => SessionScope::Global,
    };

    Some(Session {
        session_id,
        scope,
        cwd,
        started_at_epoch,
        ended_at_epoch,
        status,
        observation_count: observation_count.max(0) as u32,
    })
}

/// Insert a new session row, or no-op if `session_id` already has a row
/// (a hook can be invoked more than once for the same session).
pub async fn create_session(db: &Database, session_id: &str, scope: &SessionScope, cwd: &str, started_at_epoch: i64) {
    let result = sqlx::query(
        "INSERT INTO sessions (session_id, project, cwd, started_at_epoch, status, observation_count)
         VALUES (?, ?, ?, ?, 'active', 0)
         ON CONFLICT(session_id) DO NOTHING",
    )
    .bind(session_id)
    .bind(scope.project())
    .bind(cwd)
    .bind(started_at_epoch)
    .execute(db.pool())
    .await;

    if let Err(e) = result {
        warn!("create_session failed for {session_id}: {e}");
    }
}

/// Update a session's status and, when transitioning out of `active`, its
/// `ended_at_epoch`.
pub async fn update_session_status(db: &Database, session_id: &str, status: SessionStatus, ended_at_epoch: Option<i64>) {
    let result = sqlx::query(
        "UPDATE sessions SET status = ?, ended_at_epoch = COALESCE(?, ended_at_epoch) WHERE session_id = ?",
    )
    .bind(status.as_str())
    .bind(ended_at_epoch)
    .bind(session_id)
    .execute(db.pool())
    .await;

    if let Err(e) = result {
        warn!("update_session_status failed for {session_id}: {e}");
    }
}

/// The single `active` row for `session_id`, if any.
pub async fn get_active_session(db: &Database, session_id: &str) -> Option<Session> {
    let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ? AND status = 'active'")
        .bind(session_id)
        .fetch_optional(db.pool())
        .await
        .unwrap_or_else(|e| {
            warn!("get_active_session failed for {session_id}: {e}");
            None
        })?;
    row_to_session(&row)
}

/// Sessions left `active` with no matching `SessionEnd` — used by the
/// Recovery Pass (§4.9 "orphan-session close").
pub async fn get_orphaned_sessions(db: &Database, older_than_epoch: i64) -> Vec<Session> {
    let rows = sqlx::query("SELECT * FROM sessions WHERE status = 'active' AND started_at_epoch < ?")
        .bind(older_than_epoch)
        .fetch_all(db.pool())
        .await
        .unwrap_or_else(|e| {
            warn!("get_orphaned_sessions failed: {e}");
            Vec::new()
        });
    rows.iter().filter_map(row_to_session).collect()
}

pub async fn increment_observation_count(db: &Database, session_id: &str) {
    let result = sqlx::query("UPDATE sessions SET observation_count = observation_count + 1 WHERE session_id = ?")
        .bind(session_id)
        .execute(db.pool())
        .await;
    if let Err(e) = result {
        warn!("increment_observation_count failed for {session_id}: {e}");
    }
}
