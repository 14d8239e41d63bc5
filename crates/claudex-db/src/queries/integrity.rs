// crates/claudex-db/src/queries/integrity.rs
//! Store-level health checks used by the Recovery Pass (§4.9): a SQLite
//! integrity check and a per-table FTS5 MATCH probe with rebuild fallback.

use crate::Database;

/// `PRAGMA integrity_check`. SQLite reports `"ok"` on a healthy database and
/// otherwise a list of problems, one per row — this collapses that into a
/// single pass/fail plus the first reported problem, which is all the
/// Recovery Pass's "report only" check needs (§4.9 step 1).
pub async fn integrity_check(db: &Database) -> Result<(), String> {
    let rows: Vec<(String,)> = sqlx::query_as("PRAGMA integrity_check")
        .fetch_all(db.pool())
        .await
        .map_err(|e| e.to_string())?;
    match rows.first() {
        Some((msg,)) if msg == "ok" => Ok(()),
        Some((msg,)) => Err(msg.clone()),
        None => Ok(()),
    }
}

/// The FTS5 virtual tables backing observations/reasoning/consensus search
/// (§6 "Store schema"), in the order the Recovery Pass checks them.
pub const FTS_TABLES: &[(&str, &str)] = &[
    ("observations_fts", "observations"),
    ("reasoning_fts", "reasoning_chains"),
    ("consensus_fts", "consensus_decisions"),
];

/// Whether `table` exists and answers a trivial MATCH query without error
/// (§4.9 step 5).
pub async fn fts_table_healthy(db: &Database, table: &str) -> bool {
    let query = format!("SELECT rowid FROM {table} WHERE {table} MATCH ? LIMIT 1");
    sqlx::query(&query).bind("healthcheck").fetch_all(db.pool()).await.is_ok()
}

/// Rebuild an FTS5 index from its backing content table via the `'rebuild'`
/// special command (§4.9 "issue the store's rebuild directive").
pub async fn rebuild_fts(db: &Database, fts_table: &str) -> Result<(), sqlx::Error> {
    let query = format!("INSERT INTO {fts_table}({fts_table}) VALUES('rebuild')");
    sqlx::query(&query).execute(db.pool()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn integrity_check_passes_on_fresh_db() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(integrity_check(&db).await.is_ok());
    }

    #[tokio::test]
    async fn fts_tables_are_healthy_after_migration() {
        let db = Database::new_in_memory().await.unwrap();
        for (fts_table, _) in FTS_TABLES {
            assert!(fts_table_healthy(&db, fts_table).await, "{fts_table} should be healthy");
        }
    }

    #[tokio::test]
    async fn rebuild_fts_succeeds_on_healthy_table() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(rebuild_fts(&db, "observations_fts").await.is_ok());
    }
}
