// crates/claudex-db/src/queries/pressure.rs
use crate::Database;
use claudex_types::{clamp_pressure, PressureScore, ProjectScope, Temperature};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

fn row_to_pressure(row: &sqlx::sqlite::SqliteRow) -> Option<PressureScore> {
    let temperature_str: String = row.try_get("temperature").ok()?;
    Some(PressureScore {
        file_path: row.try_get("file_path").ok()?,
        project: row.try_get("project").ok()?,
        raw_pressure: row.try_get("raw_pressure").ok()?,
        temperature: Temperature::from_str(&temperature_str).ok()?,
        decay_rate: row.try_get("decay_rate").ok()?,
        last_accessed_epoch: row.try_get("last_accessed_epoch").ok()?,
        last_decay_epoch: row.try_get("last_decay_epoch").ok()?,
        phase_boosted: false,
    })
}

/// Insert or fully overwrite a pressure row (used when the sidecar returns
/// an authoritative score for a file).
pub async fn upsert_pressure_score(db: &Database, score: &PressureScore) {
    let result = sqlx::query(
        "INSERT INTO pressure_scores
            (file_path, project, raw_pressure, temperature, decay_rate, last_accessed_epoch, last_decay_epoch)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(file_path, project) DO UPDATE SET
            raw_pressure = excluded.raw_pressure,
            temperature = excluded.temperature,
            decay_rate = excluded.decay_rate,
            last_accessed_epoch = excluded.last_accessed_epoch,
            last_decay_epoch = excluded.last_decay_epoch",
    )
    .bind(&score.file_path)
    .bind(&score.project)
    .bind(score.raw_pressure)
    .bind(score.temperature.as_str())
    .bind(score.decay_rate)
    .bind(score.last_accessed_epoch)
    .bind(score.last_decay_epoch)
    .execute(db.pool())
    .await;
    if let Err(e) = result {
        warn!("upsert_pressure_score failed for {}: {e}", score.file_path);
    }
}

/// `accumulatePressureScore(path, project, delta)` (§4.3): clamp-add `delta`
/// to the existing (or zero) raw pressure, reclassify temperature, touch
/// `last_accessed_epoch`. Inserts the row if missing.
pub async fn accumulate_pressure_score(db: &Database, file_path: &str, scope: &ProjectScope, delta: f64, now_epoch_ms: i64) {
    let project = scope.pressure_column_value();

    let existing: Option<(f64,)> =
        sqlx::query_as("SELECT raw_pressure FROM pressure_scores WHERE file_path = ? AND project = ?")
            .bind(file_path)
            .bind(project)
            .fetch_optional(db.pool())
            .await
            .unwrap_or_else(|e| {
                warn!("accumulate_pressure_score read failed for {file_path}: {e}");
                None
            });

    let raw = clamp_pressure(existing.map(|(r,)| r).unwrap_or(0.0) + delta);
    let temperature = Temperature::classify(raw);
    let decay_rate = temperature.default_decay_rate();

    let result = sqlx::query(
        "INSERT INTO pressure_scores (file_path, project, raw_pressure, temperature, decay_rate, last_accessed_epoch)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(file_path, project) DO UPDATE SET
            raw_pressure = excluded.raw_pressure,
            temperature = excluded.temperature,
            decay_rate = excluded.decay_rate,
            last_accessed_epoch = excluded.last_accessed_epoch",
    )
    .bind(file_path)
    .bind(project)
    .bind(raw)
    .bind(temperature.as_str())
    .bind(decay_rate)
    .bind(now_epoch_ms)
    .execute(db.pool())
    .await;
    if let Err(e) = result {
        warn!("accumulate_pressure_score write failed for {file_path}: {e}");
    }
}

/// All pressure rows for a project scope (or the global sentinel bucket).
pub async fn get_pressure_scores(db: &Database, scope: &ProjectScope) -> Vec<PressureScore> {
    let rows = sqlx::query("SELECT * FROM pressure_scores WHERE project = ? ORDER BY raw_pressure DESC")
        .bind(scope.pressure_column_value())
        .fetch_all(db.pool())
        .await
        .unwrap_or_else(|e| {
            warn!("get_pressure_scores failed: {e}");
            Vec::new()
        });
    rows.iter().filter_map(row_to_pressure).collect()
}

pub async fn get_hot_files(db: &Database, scope: &ProjectScope) -> Vec<PressureScore> {
    let rows = sqlx::query(
        "SELECT * FROM pressure_scores WHERE project = ? AND temperature = 'HOT' ORDER BY raw_pressure DESC",
    )
    .bind(scope.pressure_column_value())
    .fetch_all(db.pool())
    .await
    .unwrap_or_else(|e| {
        warn!("get_hot_files failed: {e}");
        Vec::new()
    });
    rows.iter().filter_map(row_to_pressure).collect()
}

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Stratified decay is only re-applied once this many ms have passed since
/// the row's last decay — the idempotency guard named in §4.4.
const MIN_DECAY_INTERVAL_MS: i64 = 60 * 60 * 1000;

/// `decayAllScores(project?)` (§4.4 "Stratified decay"): for every score with
/// `(now - last_decay_epoch) >= minimum_interval`, apply
/// `raw' := raw * exp(-decay_rate * Δdays)`, reclassify, persist
/// `last_decay_epoch := now`. Returns the number of rows updated.
pub async fn decay_all_scores(db: &Database, scope: Option<&ProjectScope>, now_epoch_ms: i64) -> u32 {
    let rows: Vec<(String, String, f64, f64, i64, Option<i64>)> = match scope {
        Some(s) => sqlx::query_as(
            "SELECT file_path, project, raw_pressure, decay_rate, last_accessed_epoch, last_decay_epoch
             FROM pressure_scores WHERE project = ?",
        )
        .bind(s.pressure_column_value())
        .fetch_all(db.pool())
        .await,
        None => sqlx::query_as(
            "SELECT file_path, project, raw_pressure, decay_rate, last_accessed_epoch, last_decay_epoch
             FROM pressure_scores",
        )
        .fetch_all(db.pool())
        .await,
    }
    .unwrap_or_else(|e| {
        warn!("decay_all_scores read failed: {e}");
        Vec::new()
    });

    let mut updated = 0u32;
    for (file_path, project, raw_pressure, decay_rate, last_accessed_epoch, last_decay_epoch) in rows {
        let reference_epoch = last_decay_epoch.unwrap_or(last_accessed_epoch);
        if now_epoch_ms - reference_epoch < MIN_DECAY_INTERVAL_MS {
            continue;
        }
        let delta_days = (now_epoch_ms - reference_epoch).max(0) as f64 / 1000.0 / SECONDS_PER_DAY;
        let decayed = clamp_pressure(raw_pressure * (-decay_rate * delta_days).exp());
        let temperature = Temperature::classify(decayed);
        let new_decay_rate = temperature.default_decay_rate();

        let result = sqlx::query(
            "UPDATE pressure_scores SET raw_pressure = ?, temperature = ?, decay_rate = ?, last_decay_epoch = ?
             WHERE file_path = ? AND project = ?",
        )
        .bind(decayed)
        .bind(temperature.as_str())
        .bind(new_decay_rate)
        .bind(now_epoch_ms)
        .bind(&file_path)
        .bind(&project)
        .execute(db.pool())
        .await;

        match result {
            Ok(_) => updated += 1,
            Err(e) => warn!("decay_all_scores write failed for {file_path}: {e}"),
        }
    }
    updated
}
