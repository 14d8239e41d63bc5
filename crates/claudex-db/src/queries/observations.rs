// crates/claudex-db/src/queries/observations.rs
use super::{from_json_array, to_json_array};
use crate::Database;
use claudex_types::{NewObservation, Observation, ObservationCategory};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

fn row_to_observation(row: &sqlx::sqlite::SqliteRow) -> Option<Observation> {
    let category_str: String = row.try_get("category").ok()?;
    Some(Observation {
        id: row.try_get("id").ok()?,
        session_id: row.try_get("session_id").ok()?,
        project: row.try_get("project").ok()?,
        timestamp_epoch_ms: row.try_get("timestamp_epoch_ms").ok()?,
        tool_name: row.try_get("tool_name").ok()?,
        category: ObservationCategory::from_str(&category_str).ok()?,
        title: row.try_get("title").ok()?,
        content: row.try_get("content").ok()?,
        files_read: from_json_array(row.try_get::<String, _>("files_read").ok()?.as_str()),
        files_modified: from_json_array(row.try_get::<String, _>("files_modified").ok()?.as_str()),
        importance: row.try_get::<i64, _>("importance").ok()? as u8,
        access_count: row.try_get::<i64, _>("access_count").ok()?.max(0) as u32,
        last_accessed_epoch: row.try_get("last_accessed_epoch").ok()?,
        deleted_at_epoch: row.try_get("deleted_at_epoch").ok()?,
    })
}

/// Persist a new observation. Returns the row id, or `-1` on failure — store
/// functions never panic (§4.3).
pub async fn store_observation(db: &Database, obs: &NewObservation) -> i64 {
    let result = sqlx::query(
        "INSERT INTO observations
            (session_id, project, timestamp_epoch_ms, tool_name, category, title, content,
             files_read, files_modified, importance, access_count)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&obs.session_id)
    .bind(&obs.project)
    .bind(obs.timestamp_epoch_ms)
    .bind(&obs.tool_name)
    .bind(obs.category.as_str())
    .bind(&obs.title)
    .bind(&obs.content)
    .bind(to_json_array(&obs.files_read))
    .bind(to_json_array(&obs.files_modified))
    .bind(obs.importance as i64)
    .execute(db.pool())
    .await;

    match result {
        Ok(r) => r.last_insert_rowid(),
        Err(e) => {
            warn!("store_observation failed: {e}");
            -1
        }
    }
}

/// Most recent non-deleted observations, optionally scoped to a project.
pub async fn get_recent_observations(db: &Database, limit: u32, project: Option<&str>) -> Vec<Observation> {
    let rows = match project {
        Some(p) => {
            sqlx::query(
                "SELECT * FROM observations WHERE deleted_at_epoch IS NULL AND project = ?
                 ORDER BY timestamp_epoch_ms DESC LIMIT ?",
            )
            .bind(p)
            .bind(limit as i64)
            .fetch_all(db.pool())
            .await
        }
        None => {
            sqlx::query(
                "SELECT * FROM observations WHERE deleted_at_epoch IS NULL
                 ORDER BY timestamp_epoch_ms DESC LIMIT ?",
            )
            .bind(limit as i64)
            .fetch_all(db.pool())
            .await
        }
    };

    rows.unwrap_or_else(|e| {
        warn!("get_recent_observations failed: {e}");
        Vec::new()
    })
    .iter()
    .filter_map(row_to_observation)
    .collect()
}

pub async fn get_observations_by_session(db: &Database, session_id: &str) -> Vec<Observation> {
    let rows = sqlx::query(
        "SELECT * FROM observations WHERE session_id = ? AND deleted_at_epoch IS NULL
         ORDER BY timestamp_epoch_ms ASC",
    )
    .bind(session_id)
    .fetch_all(db.pool())
    .await
    .unwrap_or_else(|e| {
        warn!("get_observations_by_session failed for {session_id}: {e}");
        Vec::new()
    });
    rows.iter().filter_map(row_to_observation).collect()
}

/// All non-deleted observations, optionally scoped to a project — the
/// pruner's raw input before it scores and ranks them (§4.5).
pub async fn get_all_non_deleted(db: &Database, project: Option<&str>) -> Vec<Observation> {
    let rows = match project {
        Some(p) => {
            sqlx::query("SELECT * FROM observations WHERE deleted_at_epoch IS NULL AND project = ?")
                .bind(p)
                .fetch_all(db.pool())
                .await
        }
        None => {
            sqlx::query("SELECT * FROM observations WHERE deleted_at_epoch IS NULL")
                .fetch_all(db.pool())
                .await
        }
    };
    rows.unwrap_or_else(|e| {
        warn!("get_all_non_deleted failed: {e}");
        Vec::new()
    })
    .iter()
    .filter_map(row_to_observation)
    .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions<'a> {
    pub project: Option<&'a str>,
    pub limit: u32,
    pub min_importance: Option<u8>,
}

/// FTS5 search over `(title, content)`, most-relevant first.
pub async fn search_observations(db: &Database, query: &str, opts: &SearchOptions<'_>) -> Vec<Observation> {
    let min_importance = opts.min_importance.unwrap_or(0) as i64;
    let rows = match opts.project {
        Some(p) => {
            sqlx::query(
                "SELECT o.* FROM observations o
                 JOIN observations_fts fts ON fts.rowid = o.id
                 WHERE observations_fts MATCH ? AND o.deleted_at_epoch IS NULL
                   AND o.project = ? AND o.importance >= ?
                 ORDER BY rank LIMIT ?",
            )
            .bind(query)
            .bind(p)
            .bind(min_importance)
            .bind(opts.limit as i64)
            .fetch_all(db.pool())
            .await
        }
        None => {
            sqlx::query(
                "SELECT o.* FROM observations o
                 JOIN observations_fts fts ON fts.rowid = o.id
                 WHERE observations_fts MATCH ? AND o.deleted_at_epoch IS NULL
                   AND o.importance >= ?
                 ORDER BY rank LIMIT ?",
            )
            .bind(query)
            .bind(min_importance)
            .bind(opts.limit as i64)
            .fetch_all(db.pool())
            .await
        }
    };

    match rows {
        Ok(rows) => rows.iter().filter_map(row_to_observation).collect(),
        Err(e) => {
            warn!("search_observations failed for query {query:?}: {e}");
            Vec::new()
        }
    }
}

/// One hit from `search_all`, tagged by source table so the assembler can
/// render it under the right section.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchAllHit {
    pub source: &'static str,
    pub title: String,
    pub timestamp_epoch_ms: i64,
}

/// Search across observations, reasoning, and consensus FTS tables in one
/// call, merged by recency. Used by the assembler's "Related Observations"
/// section when a broader sweep is wanted than `search_observations` alone.
pub async fn search_all(db: &Database, query: &str, limit: u32) -> Vec<SearchAllHit> {
    let obs_rows = sqlx::query(
        "SELECT o.title, o.timestamp_epoch_ms FROM observations o
         JOIN observations_fts fts ON fts.rowid = o.id
         WHERE observations_fts MATCH ? AND o.deleted_at_epoch IS NULL
         ORDER BY rank LIMIT ?",
    )
    .bind(query)
    .bind(limit as i64)
    .fetch_all(db.pool())
    .await
    .unwrap_or_else(|e| {
        warn!("search_all (observations) failed: {e}");
        Vec::new()
    });

    let reasoning_rows = sqlx::query(
        "SELECT r.title, r.timestamp_epoch_ms FROM reasoning_chains r
         JOIN reasoning_fts fts ON fts.rowid = r.id
         WHERE reasoning_fts MATCH ? ORDER BY rank LIMIT ?",
    )
    .bind(query)
    .bind(limit as i64)
    .fetch_all(db.pool())
    .await
    .unwrap_or_else(|e| {
        warn!("search_all (reasoning) failed: {e}");
        Vec::new()
    });

    let consensus_rows = sqlx::query(
        "SELECT c.title, c.timestamp_epoch_ms FROM consensus_decisions c
         JOIN consensus_fts fts ON fts.rowid = c.id
         WHERE consensus_fts MATCH ? ORDER BY rank LIMIT ?",
    )
    .bind(query)
    .bind(limit as i64)
    .fetch_all(db.pool())
    .await
    .unwrap_or_else(|e| {
        warn!("search_all (consensus) failed: {e}");
        Vec::new()
    });

    let mut hits = Vec::new();
    for row in &obs_rows {
        if let (Ok(title), Ok(ts)) = (row.try_get("title"), row.try_get("timestamp_epoch_ms")) {
            hits.push(SearchAllHit { source: "observation", title, timestamp_epoch_ms: ts });
        }
    }
    for row in &reasoning_rows {
        if let (Ok(title), Ok(ts)) = (row.try_get("title"), row.try_get("timestamp_epoch_ms")) {
            hits.push(SearchAllHit { source: "reasoning", title, timestamp_epoch_ms: ts });
        }
    }
    for row in &consensus_rows {
        if let (Ok(title), Ok(ts)) = (row.try_get("title"), row.try_get("timestamp_epoch_ms")) {
            hits.push(SearchAllHit { source: "consensus", title, timestamp_epoch_ms: ts });
        }
    }
    hits.sort_by(|a, b| b.timestamp_epoch_ms.cmp(&a.timestamp_epoch_ms));
    hits.truncate(limit as usize);
    hits
}

/// Mark an observation as accessed: `access_count += 1`, `last_accessed_epoch := now`.
/// `access_count` is monotonic non-decreasing per the data-model invariant.
pub async fn touch_observation(db: &Database, id: i64, now_epoch_ms: i64) {
    let result = sqlx::query(
        "UPDATE observations SET access_count = access_count + 1, last_accessed_epoch = ? WHERE id = ?",
    )
    .bind(now_epoch_ms)
    .bind(id)
    .execute(db.pool())
    .await;
    if let Err(e) = result {
        warn!("touch_observation failed for id {id}: {e}");
    }
}

/// Soft-delete a batch of observation ids (used by the pruner).
pub async fn soft_delete(db: &Database, ids: &[i64], now_epoch_ms: i64) {
    for id in ids {
        let result = sqlx::query("UPDATE observations SET deleted_at_epoch = ? WHERE id = ?")
            .bind(now_epoch_ms)
            .bind(id)
            .execute(db.pool())
            .await;
        if let Err(e) = result {
            warn!("soft_delete failed for id {id}: {e}");
        }
    }
}

/// Count of non-deleted observations, optionally scoped to a project. Used
/// by the pruner to decide whether the >1000 threshold is crossed.
pub async fn count_active(db: &Database, project: Option<&str>) -> i64 {
    let result = match project {
        Some(p) => {
            sqlx::query_as::<_, (i64,)>(
                "SELECT COUNT(*) FROM observations WHERE deleted_at_epoch IS NULL AND project = ?",
            )
            .bind(p)
            .fetch_one(db.pool())
            .await
        }
        None => {
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM observations WHERE deleted_at_epoch IS NULL")
                .fetch_one(db.pool())
                .await
        }
    };
    result.map(|(n,)| n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(project: Option<&str>) -> NewObservation {
        NewObservation {
            session_id: "s1".to_string(),
            project: project.map(str::to_string),
            timestamp_epoch_ms: 1000,
            tool_name: "Read".to_string(),
            category: ObservationCategory::Discovery,
            title: "Read main.rs".to_string(),
            content: "fn main() {}".to_string(),
            files_read: vec!["main.rs".to_string()],
            files_modified: vec![],
            importance: 2,
        }
    }

    #[tokio::test]
    async fn store_and_retrieve_recent() {
        let db = Database::new_in_memory().await.unwrap();
        let id = store_observation(&db, &sample(Some("crate-x"))).await;
        assert!(id > 0);
        let recent = get_recent_observations(&db, 10, Some("crate-x")).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].files_read, vec!["main.rs".to_string()]);
    }

    #[tokio::test]
    async fn project_scoping_excludes_other_projects() {
        let db = Database::new_in_memory().await.unwrap();
        store_observation(&db, &sample(Some("crate-x"))).await;
        store_observation(&db, &sample(Some("crate-y"))).await;
        let recent = get_recent_observations(&db, 10, Some("crate-x")).await;
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn fts_search_finds_by_title() {
        let db = Database::new_in_memory().await.unwrap();
        store_observation(&db, &sample(None)).await;
        let hits = search_observations(&db, "main", &SearchOptions { limit: 10, ..Default::default() }).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn touch_increments_access_count_monotonically() {
        let db = Database::new_in_memory().await.unwrap();
        let id = store_observation(&db, &sample(None)).await;
        touch_observation(&db, id, 2000).await;
        touch_observation(&db, id, 3000).await;
        let obs = get_observations_by_session(&db, "s1").await;
        assert_eq!(obs[0].access_count, 2);
        assert_eq!(obs[0].last_accessed_epoch, Some(3000));
    }

    #[tokio::test]
    async fn soft_deleted_rows_excluded_from_recent_and_count() {
        let db = Database::new_in_memory().await.unwrap();
        let id = store_observation(&db, &sample(None)).await;
        soft_delete(&db, &[id], 5000).await;
        assert!(get_recent_observations(&db, 10, None).await.is_empty());
        assert_eq!(count_active(&db, None).await, 0);
    }
}
