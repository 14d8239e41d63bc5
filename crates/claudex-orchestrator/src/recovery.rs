// crates/claudex-orchestrator/src/recovery.rs
//! Recovery Pass (§4.9, C9): five independent self-heal checks run once per
//! session start. One check failing never blocks another — each is wrapped
//! in its own error boundary and contributes one `RecoveryCheck` to the
//! report.

use crate::util::file_mtime_epoch_ms;
use claudex_db::Database;
use claudex_sidecar::client::ping_port_marker;
use claudex_types::SessionStatus;
use std::path::Path;
use std::time::Duration;

const STALE_PORT_MARKER_MS: i64 = 24 * 60 * 60 * 1000;
const STALE_COOLDOWN_MARKER_MS: i64 = 60 * 60 * 1000;
const ORPHAN_SESSION_MS: i64 = 12 * 60 * 60 * 1000;
const PORT_PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    Ok,
    Warning,
    Recovered,
    Failed,
}

impl RecoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Recovered => "recovered",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryCheck {
    pub name: &'static str,
    pub status: RecoveryStatus,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub checks: Vec<RecoveryCheck>,
}

/// Check 1: `PRAGMA integrity_check` — report only, never mutates (§4.9 step 1).
async fn check_db_integrity(db: &Database) -> RecoveryCheck {
    match claudex_db::integrity::integrity_check(db).await {
        Ok(()) => RecoveryCheck { name: "db_integrity", status: RecoveryStatus::Ok, message: "ok".to_string() },
        Err(message) => RecoveryCheck { name: "db_integrity", status: RecoveryStatus::Failed, message },
    }
}

/// Check 2: delete the sidecar port marker only when it's stale *and*
/// unreachable — a live sidecar that simply hasn't rotated its marker
/// recently must survive this check (§4.9 step 2).
async fn check_sidecar_port_marker(marker_path: &Path, now_epoch_ms: i64) -> RecoveryCheck {
    let Some(mtime) = file_mtime_epoch_ms(marker_path) else {
        return RecoveryCheck { name: "sidecar_port_marker", status: RecoveryStatus::Ok, message: "no marker present".to_string() };
    };
    if now_epoch_ms - mtime < STALE_PORT_MARKER_MS {
        return RecoveryCheck { name: "sidecar_port_marker", status: RecoveryStatus::Ok, message: "fresh".to_string() };
    }
    if ping_port_marker(marker_path, PORT_PING_TIMEOUT).await {
        return RecoveryCheck {
            name: "sidecar_port_marker",
            status: RecoveryStatus::Warning,
            message: "marker stale but port still answers".to_string(),
        };
    }
    match std::fs::remove_file(marker_path) {
        Ok(()) => RecoveryCheck {
            name: "sidecar_port_marker",
            status: RecoveryStatus::Recovered,
            message: "removed stale unreachable marker".to_string(),
        },
        Err(e) => RecoveryCheck { name: "sidecar_port_marker", status: RecoveryStatus::Failed, message: e.to_string() },
    }
}

/// Check 3: the flush cooldown marker is deleted when stale, in the far
/// future, or not a finite non-negative integer (§4.9 step 3).
fn check_flush_cooldown_marker(marker_path: &Path, now_epoch_ms: i64) -> RecoveryCheck {
    let contents = match std::fs::read_to_string(marker_path) {
        Ok(c) => c,
        Err(_) => {
            return RecoveryCheck {
                name: "flush_cooldown_marker",
                status: RecoveryStatus::Ok,
                message: "no marker present".to_string(),
            }
        }
    };
    let parsed = contents.trim().parse::<i64>();
    let is_stale = match parsed {
        Err(_) => true,
        Ok(epoch) => {
            let age = now_epoch_ms - epoch;
            age > STALE_COOLDOWN_MARKER_MS || age < -STALE_COOLDOWN_MARKER_MS
        }
    };
    if !is_stale {
        return RecoveryCheck { name: "flush_cooldown_marker", status: RecoveryStatus::Ok, message: "fresh".to_string() };
    }
    match std::fs::remove_file(marker_path) {
        Ok(()) => RecoveryCheck {
            name: "flush_cooldown_marker",
            status: RecoveryStatus::Recovered,
            message: "removed stale or malformed cooldown marker".to_string(),
        },
        Err(e) => RecoveryCheck { name: "flush_cooldown_marker", status: RecoveryStatus::Failed, message: e.to_string() },
    }
}

/// Check 4: close sessions left `active` for more than 12 hours (§4.9 step 4).
async fn check_orphan_sessions(db: &Database, now_epoch_ms: i64) -> RecoveryCheck {
    let orphans = claudex_db::sessions::get_orphaned_sessions(db, now_epoch_ms - ORPHAN_SESSION_MS).await;
    if orphans.is_empty() {
        return RecoveryCheck { name: "orphan_sessions", status: RecoveryStatus::Ok, message: "none found".to_string() };
    }
    for session in &orphans {
        claudex_db::sessions::update_session_status(db, &session.session_id, SessionStatus::Failed, Some(now_epoch_ms))
            .await;
    }
    RecoveryCheck {
        name: "orphan_sessions",
        status: RecoveryStatus::Recovered,
        message: format!("closed {} orphaned session(s)", orphans.len()),
    }
}

/// Check 5: verify each FTS5 table answers a trivial MATCH; rebuild on
/// failure; mark failed only if the rebuild itself fails (§4.9 step 5).
async fn check_fts_health(db: &Database) -> RecoveryCheck {
    let mut rebuilt = Vec::new();
    for (fts_table, _content_table) in claudex_db::integrity::FTS_TABLES {
        if claudex_db::integrity::fts_table_healthy(db, fts_table).await {
            continue;
        }
        if let Err(e) = claudex_db::integrity::rebuild_fts(db, fts_table).await {
            return RecoveryCheck {
                name: "fts_health",
                status: RecoveryStatus::Failed,
                message: format!("rebuild of {fts_table} failed: {e}"),
            };
        }
        rebuilt.push(*fts_table);
    }
    if rebuilt.is_empty() {
        RecoveryCheck { name: "fts_health", status: RecoveryStatus::Ok, message: "all tables healthy".to_string() }
    } else {
        RecoveryCheck {
            name: "fts_health",
            status: RecoveryStatus::Recovered,
            message: format!("rebuilt: {}", rebuilt.join(", ")),
        }
    }
}

/// Run all five checks. None can block another — each is independently
/// caught inside its own function.
pub async fn run_recovery(
    db: &Database,
    sidecar_port_marker: &Path,
    flush_cooldown_marker: &Path,
    now_epoch_ms: i64,
) -> RecoveryReport {
    let checks = vec![
        check_db_integrity(db).await,
        check_sidecar_port_marker(sidecar_port_marker, now_epoch_ms).await,
        check_flush_cooldown_marker(flush_cooldown_marker, now_epoch_ms),
        check_orphan_sessions(db, now_epoch_ms).await,
        check_fts_health(db).await,
    ];
    RecoveryReport { checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claudex_types::SessionScope;

    #[tokio::test]
    async fn integrity_check_ok_on_fresh_db() {
        let db = Database::new_in_memory().await.unwrap();
        let check = check_db_integrity(&db).await;
        assert_eq!(check.status, RecoveryStatus::Ok);
    }

    #[tokio::test]
    async fn missing_port_marker_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("port");
        let check = check_sidecar_port_marker(&marker, 1_000).await;
        assert_eq!(check.status, RecoveryStatus::Ok);
    }

    #[tokio::test]
    async fn fresh_port_marker_survives() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("port");
        std::fs::write(&marker, "12345").unwrap();
        let check = check_sidecar_port_marker(&marker, 1_000).await;
        assert_eq!(check.status, RecoveryStatus::Ok);
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn stale_unreachable_port_marker_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("port");
        std::fs::write(&marker, "59999").unwrap();
        let far_future = STALE_PORT_MARKER_MS + 1_000;
        let check = check_sidecar_port_marker(&marker, far_future).await;
        assert_eq!(check.status, RecoveryStatus::Recovered);
        assert!(!marker.exists());
    }

    #[test]
    fn fresh_cooldown_marker_survives() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        std::fs::write(&marker, "1000").unwrap();
        let check = check_flush_cooldown_marker(&marker, 1_000 + 1_000);
        assert_eq!(check.status, RecoveryStatus::Ok);
    }

    #[test]
    fn stale_cooldown_marker_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        std::fs::write(&marker, "1000").unwrap();
        let check = check_flush_cooldown_marker(&marker, 1_000 + STALE_COOLDOWN_MARKER_MS + 1);
        assert_eq!(check.status, RecoveryStatus::Recovered);
        assert!(!marker.exists());
    }

    #[test]
    fn far_future_cooldown_marker_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        std::fs::write(&marker, (2_000 + STALE_COOLDOWN_MARKER_MS + 1).to_string()).unwrap();
        let check = check_flush_cooldown_marker(&marker, 1_000);
        assert_eq!(check.status, RecoveryStatus::Recovered);
    }

    #[test]
    fn non_numeric_cooldown_marker_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        std::fs::write(&marker, "not-a-number").unwrap();
        let check = check_flush_cooldown_marker(&marker, 1_000);
        assert_eq!(check.status, RecoveryStatus::Recovered);
    }

    #[tokio::test]
    async fn orphan_sessions_are_closed() {
        let db = Database::new_in_memory().await.unwrap();
        claudex_db::sessions::create_session(&db, "old", &SessionScope::Global, "/repo", 0).await;
        let check = check_orphan_sessions(&db, ORPHAN_SESSION_MS + 1).await;
        assert_eq!(check.status, RecoveryStatus::Recovered);
        assert!(claudex_db::sessions::get_active_session(&db, "old").await.is_none());
    }

    #[tokio::test]
    async fn fts_health_reports_ok_on_fresh_db() {
        let db = Database::new_in_memory().await.unwrap();
        let check = check_fts_health(&db).await;
        assert_eq!(check.status, RecoveryStatus::Ok);
    }

    #[tokio::test]
    async fn run_recovery_produces_five_checks() {
        let db = Database::new_in_memory().await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let report =
            run_recovery(&db, &tmp.path().join("port"), &tmp.path().join(".flush_cooldown"), 1_000).await;
        assert_eq!(report.checks.len(), 5);
    }
}
