// crates/claudex-db/src/migrations.rs
//! Inline, numbered SQL migrations for the claudex store (§6 "Store schema").
//!
//! Applied in order at startup, tracked in `_migrations` (see `lib.rs`).
//! Each statement is self-contained; multi-statement migrations are executed
//! with `sqlx::raw_sql` so `BEGIN`/`COMMIT` blocks run atomically.

pub const MIGRATIONS: &[&str] = &[
    // 1. sessions
    r#"CREATE TABLE IF NOT EXISTS sessions (
        session_id TEXT PRIMARY KEY,
        project TEXT,
        cwd TEXT NOT NULL,
        started_at_epoch INTEGER NOT NULL,
        ended_at_epoch INTEGER,
        status TEXT NOT NULL DEFAULT 'active',
        observation_count INTEGER NOT NULL DEFAULT 0
    )"#,
    // 2. observations
    r#"CREATE TABLE IF NOT EXISTS observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        project TEXT,
        timestamp_epoch_ms INTEGER NOT NULL,
        tool_name TEXT NOT NULL,
        category TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        files_read TEXT NOT NULL DEFAULT '[]',
        files_modified TEXT NOT NULL DEFAULT '[]',
        importance INTEGER NOT NULL,
        access_count INTEGER NOT NULL DEFAULT 0,
        last_accessed_epoch INTEGER,
        deleted_at_epoch INTEGER
    )"#,
    // 3. observations indexes
    r#"CREATE INDEX IF NOT EXISTS idx_observations_deleted ON observations(deleted_at_epoch)"#,
    // 4. observations project/timestamp index
    r#"CREATE INDEX IF NOT EXISTS idx_observations_project_ts ON observations(project, timestamp_epoch_ms)"#,
    // 5. observations session index
    r#"CREATE INDEX IF NOT EXISTS idx_observations_session ON observations(session_id)"#,
    // 6. observations FTS5
    r#"CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
        title, content, content='observations', content_rowid='id'
    )"#,
    // 7. observations FTS sync triggers
    r#"
    BEGIN;
    CREATE TRIGGER IF NOT EXISTS observations_fts_insert AFTER INSERT ON observations BEGIN
        INSERT INTO observations_fts(rowid, title, content) VALUES (new.id, new.title, new.content);
    END;
    CREATE TRIGGER IF NOT EXISTS observations_fts_delete AFTER DELETE ON observations BEGIN
        INSERT INTO observations_fts(observations_fts, rowid, title, content) VALUES ('delete', old.id, old.title, old.content);
    END;
    CREATE TRIGGER IF NOT EXISTS observations_fts_update AFTER UPDATE ON observations BEGIN
        INSERT INTO observations_fts(observations_fts, rowid, title, content) VALUES ('delete', old.id, old.title, old.content);
        INSERT INTO observations_fts(rowid, title, content) VALUES (new.id, new.title, new.content);
    END;
    COMMIT;
    "#,
    // 8. reasoning_chains
    r#"CREATE TABLE IF NOT EXISTS reasoning_chains (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        project TEXT,
        timestamp_epoch_ms INTEGER NOT NULL,
        trigger TEXT NOT NULL,
        title TEXT NOT NULL,
        reasoning TEXT NOT NULL,
        importance INTEGER NOT NULL,
        decisions TEXT NOT NULL DEFAULT '[]',
        files_involved TEXT NOT NULL DEFAULT '[]'
    )"#,
    // 9. reasoning_chains FTS5
    r#"CREATE VIRTUAL TABLE IF NOT EXISTS reasoning_fts USING fts5(
        title, reasoning, content='reasoning_chains', content_rowid='id'
    )"#,
    // 10. reasoning_chains FTS sync triggers
    r#"
    BEGIN;
    CREATE TRIGGER IF NOT EXISTS reasoning_fts_insert AFTER INSERT ON reasoning_chains BEGIN
        INSERT INTO reasoning_fts(rowid, title, reasoning) VALUES (new.id, new.title, new.reasoning);
    END;
    CREATE TRIGGER IF NOT EXISTS reasoning_fts_delete AFTER DELETE ON reasoning_chains BEGIN
        INSERT INTO reasoning_fts(reasoning_fts, rowid, title, reasoning) VALUES ('delete', old.id, old.title, old.reasoning);
    END;
    COMMIT;
    "#,
    // 11. consensus_decisions
    r#"CREATE TABLE IF NOT EXISTS consensus_decisions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        project TEXT,
        timestamp_epoch_ms INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        positions TEXT NOT NULL DEFAULT '[]',
        verdict TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        files_affected TEXT NOT NULL DEFAULT '[]'
    )"#,
    // 12. consensus FTS5
    r#"CREATE VIRTUAL TABLE IF NOT EXISTS consensus_fts USING fts5(
        title, description, content='consensus_decisions', content_rowid='id'
    )"#,
    // 13. consensus FTS sync triggers
    r#"
    BEGIN;
    CREATE TRIGGER IF NOT EXISTS consensus_fts_insert AFTER INSERT ON consensus_decisions BEGIN
        INSERT INTO consensus_fts(rowid, title, description) VALUES (new.id, new.title, new.description);
    END;
    CREATE TRIGGER IF NOT EXISTS consensus_fts_delete AFTER DELETE ON consensus_decisions BEGIN
        INSERT INTO consensus_fts(consensus_fts, rowid, title, description) VALUES ('delete', old.id, old.title, old.description);
    END;
    COMMIT;
    "#,
    // 14. pressure_scores
    r#"CREATE TABLE IF NOT EXISTS pressure_scores (
        file_path TEXT NOT NULL,
        project TEXT NOT NULL,
        raw_pressure REAL NOT NULL,
        temperature TEXT NOT NULL,
        decay_rate REAL NOT NULL DEFAULT 0.05,
        last_accessed_epoch INTEGER NOT NULL,
        last_decay_epoch INTEGER,
        PRIMARY KEY (file_path, project)
    )"#,
    // 15. pressure_scores decay index
    r#"CREATE INDEX IF NOT EXISTS idx_pressure_last_decay ON pressure_scores(last_decay_epoch)"#,
    // 16. checkpoint_state
    r#"CREATE TABLE IF NOT EXISTS checkpoint_state (
        session_id TEXT PRIMARY KEY,
        active_files TEXT NOT NULL DEFAULT '[]',
        last_epoch INTEGER NOT NULL,
        boost_applied_at INTEGER,
        boost_turn_count INTEGER NOT NULL DEFAULT 0
    )"#,
    // 17. audit_log
    r#"CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        epoch_ms INTEGER NOT NULL,
        operation TEXT NOT NULL,
        detail TEXT NOT NULL DEFAULT '',
        outcome TEXT NOT NULL
    )"#,
    // 18. audit_log timestamp index, used by the 30-day retention sweep
    r#"CREATE INDEX IF NOT EXISTS idx_audit_log_epoch ON audit_log(epoch_ms)"#,
    // 19. schema_versions — human-readable mirror of `_migrations`, kept for
    // external tooling that inspects the schema without knowing about the
    // tracker table's internal numbering.
    r#"CREATE TABLE IF NOT EXISTS schema_versions (
        version INTEGER PRIMARY KEY,
        applied_at_epoch INTEGER NOT NULL,
        description TEXT NOT NULL
    )"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_migration_is_nonempty() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert!(!m.trim().is_empty(), "migration {} is empty", i + 1);
        }
    }
}
