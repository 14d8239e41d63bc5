// crates/claudex-db/src/queries/audit.rs
use crate::Database;
use tracing::warn;

const RETENTION_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Append an audit-log row. Audit logging is best-effort: failures are
/// logged, never propagated (§7 — never blocks a hook invocation).
pub async fn log_audit(db: &Database, epoch_ms: i64, operation: &str, detail: &str, outcome: &str) {
    let result = sqlx::query("INSERT INTO audit_log (epoch_ms, operation, detail, outcome) VALUES (?, ?, ?, ?)")
        .bind(epoch_ms)
        .bind(operation)
        .bind(detail)
        .bind(outcome)
        .execute(db.pool())
        .await;
    if let Err(e) = result {
        warn!("log_audit failed for operation {operation:?}: {e}");
    }
}

/// Delete audit rows older than the 30-day retention window. Returns the
/// number of rows removed.
pub async fn clean_old_audit_logs(db: &Database, now_epoch_ms: i64) -> u64 {
    let result = sqlx::query("DELETE FROM audit_log WHERE epoch_ms < ?")
        .bind(now_epoch_ms - RETENTION_MS)
        .execute(db.pool())
        .await;
    match result {
        Ok(r) => r.rows_affected(),
        Err(e) => {
            warn!("clean_old_audit_logs failed: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retention_sweep_drops_old_rows_only() {
        let db = Database::new_in_memory().await.unwrap();
        log_audit(&db, 1000, "store_observation", "id=1", "ok").await;
        let now = 1000 + RETENTION_MS + 1;
        log_audit(&db, now, "store_observation", "id=2", "ok").await;

        let removed = clean_old_audit_logs(&db, now).await;
        assert_eq!(removed, 1);

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining.0, 1);
    }
}
