// crates/claudex-db/src/pruner.rs
//! Selection-Pressure Pruner (§4.5, component C5): eviction-importance
//! scoring, immunity rules, and the bounded soft-delete batch.
//!
//! Scoring and immunity are pure functions over `Observation` — the only I/O
//! here is the read of all non-deleted rows and the final soft-delete batch,
//! both of which already exist on `queries::observations`.

use crate::queries::observations;
use crate::Database;
use claudex_types::Observation;

/// `|non-deleted observations| > PRUNE_THRESHOLD` triggers a pruning pass.
pub const PRUNE_THRESHOLD: usize = 1000;
/// At most this many lowest-EI non-immune rows are soft-deleted per pass.
pub const MAX_PRUNE_BATCH: usize = 50;
/// `access_count >= 3 && age < IMMUNITY_AGE_MS` grants immunity regardless
/// of eviction-importance.
const IMMUNITY_ACCESS_COUNT: u32 = 3;
const IMMUNITY_AGE_MS: i64 = 180 * 24 * 60 * 60 * 1000;

const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// `baseWeight(importance)` — 0.2, 0.4, 0.6, 0.8, 1.0 for importance 1..5.
fn base_weight(importance: u8) -> f64 {
    (importance.clamp(1, 5) as f64) * 0.2
}

/// `halfLife(importance)` in days — shorter for low-importance rows.
fn half_life_days(importance: u8) -> f64 {
    match importance {
        1 => 7.0,
        2 => 14.0,
        3 => 60.0,
        4 => 90.0,
        _ => 365.0,
    }
}

/// Whether an observation is immune from pruning regardless of its EI score.
pub fn is_immune(obs: &Observation, now_epoch_ms: i64) -> bool {
    if obs.importance >= 5 {
        return true;
    }
    if obs.access_count >= IMMUNITY_ACCESS_COUNT {
        if let Some(last) = obs.last_accessed_epoch {
            if now_epoch_ms - last < IMMUNITY_AGE_MS {
                return true;
            }
        }
    }
    false
}

/// Number of other non-deleted observations sharing at least one modified
/// file with `obs` (`files_modified ⋈ files_modified`).
fn co_occurrence_count(obs: &Observation, all: &[Observation]) -> usize {
    if obs.files_modified.is_empty() {
        return 0;
    }
    all.iter()
        .filter(|other| other.id != obs.id)
        .filter(|other| {
            other
                .files_modified
                .iter()
                .any(|f| obs.files_modified.contains(f))
        })
        .count()
}

/// `EI := base * access * decay * conn` (§4.5).
pub fn eviction_importance(obs: &Observation, all: &[Observation], now_epoch_ms: i64) -> f64 {
    let base = base_weight(obs.importance);
    let access = (1.0 + obs.access_count as f64).ln().max(1.0);

    let reference_epoch = obs.last_accessed_epoch.unwrap_or(obs.timestamp_epoch_ms);
    let age_days = (now_epoch_ms - reference_epoch).max(0) as f64 / DAY_MS;
    let decay = 2f64.powf(-age_days / half_life_days(obs.importance));

    let conn = 1.0 + 0.1 * (co_occurrence_count(obs, all).min(5) as f64);

    base * access * decay * conn
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub pruned: usize,
    pub remaining: usize,
}

/// Run one pruning pass, scoped to `project` when given. Soft-deletes at
/// most `MAX_PRUNE_BATCH` lowest-EI non-immune rows when the active count
/// exceeds `PRUNE_THRESHOLD` (§4.5 "Pruning policy").
pub async fn prune(db: &Database, project: Option<&str>, now_epoch_ms: i64) -> PruneOutcome {
    let all = observations::get_all_non_deleted(db, project).await;
    let total = all.len();

    if total <= PRUNE_THRESHOLD {
        return PruneOutcome { pruned: 0, remaining: total };
    }

    let mut scored: Vec<(i64, f64)> = all
        .iter()
        .filter(|obs| !is_immune(obs, now_epoch_ms))
        .map(|obs| (obs.id, eviction_importance(obs, &all, now_epoch_ms)))
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_PRUNE_BATCH);

    let ids: Vec<i64> = scored.into_iter().map(|(id, _)| id).collect();
    observations::soft_delete(db, &ids, now_epoch_ms).await;

    PruneOutcome {
        pruned: ids.len(),
        remaining: total - ids.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claudex_types::ObservationCategory;

    fn obs(id: i64, importance: u8, access_count: u32, last_accessed_epoch: Option<i64>, files_modified: Vec<String>) -> Observation {
        Observation {
            id,
            session_id: "s1".to_string(),
            project: None,
            timestamp_epoch_ms: 0,
            tool_name: "Edit".to_string(),
            category: ObservationCategory::Change,
            title: "t".to_string(),
            content: "c".to_string(),
            files_read: vec![],
            files_modified,
            importance,
            access_count,
            last_accessed_epoch,
            deleted_at_epoch: None,
        }
    }

    #[test]
    fn importance_five_is_always_immune() {
        let o = obs(1, 5, 0, None, vec![]);
        assert!(is_immune(&o, 1_000_000_000));
    }

    #[test]
    fn heavily_accessed_recent_row_is_immune() {
        let o = obs(1, 2, 3, Some(1000), vec![]);
        assert!(is_immune(&o, 1000 + 1000));
    }

    #[test]
    fn heavily_accessed_but_old_row_loses_immunity() {
        let o = obs(1, 2, 3, Some(0), vec![]);
        assert!(!is_immune(&o, IMMUNITY_AGE_MS + 1));
    }

    #[test]
    fn co_occurrence_counts_shared_files_only() {
        let all = vec![
            obs(1, 3, 0, None, vec!["a.rs".to_string()]),
            obs(2, 3, 0, None, vec!["a.rs".to_string()]),
            obs(3, 3, 0, None, vec!["b.rs".to_string()]),
        ];
        assert_eq!(co_occurrence_count(&all[0], &all), 1);
        assert_eq!(co_occurrence_count(&all[2], &all), 0);
    }

    #[test]
    fn higher_importance_yields_higher_eviction_importance() {
        let all = vec![obs(1, 5, 0, None, vec![]), obs(2, 1, 0, None, vec![])];
        let hi = eviction_importance(&all[0], &all, 0);
        let lo = eviction_importance(&all[1], &all, 0);
        assert!(hi > lo);
    }

    #[tokio::test]
    async fn below_threshold_prunes_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let outcome = prune(&db, None, 1000).await;
        assert_eq!(outcome, PruneOutcome { pruned: 0, remaining: 0 });
    }

    #[tokio::test]
    async fn prunes_lowest_ei_rows_up_to_batch_cap() {
        let db = Database::new_in_memory().await.unwrap();
        for i in 0..1010 {
            let new_obs = claudex_types::NewObservation {
                session_id: "s1".to_string(),
                project: None,
                timestamp_epoch_ms: i,
                tool_name: "Edit".to_string(),
                category: ObservationCategory::Change,
                title: format!("obs {i}"),
                content: String::new(),
                files_read: vec![],
                files_modified: vec![],
                importance: 1,
            };
            observations::store_observation(&db, &new_obs).await;
        }
        let outcome = prune(&db, None, 1_000_000_000_000).await;
        assert_eq!(outcome.pruned, 50);
        assert_eq!(outcome.remaining, 960);
    }

    #[tokio::test]
    async fn immune_rows_are_never_pruned() {
        let db = Database::new_in_memory().await.unwrap();
        for i in 0..1010 {
            let importance = if i < 20 { 5 } else { 1 };
            let new_obs = claudex_types::NewObservation {
                session_id: "s1".to_string(),
                project: None,
                timestamp_epoch_ms: i,
                tool_name: "Edit".to_string(),
                category: ObservationCategory::Change,
                title: format!("obs {i}"),
                content: String::new(),
                files_read: vec![],
                files_modified: vec![],
                importance,
            };
            observations::store_observation(&db, &new_obs).await;
        }
        prune(&db, None, 1_000_000_000_000).await;
        let remaining = observations::get_all_non_deleted(&db, None).await;
        assert!(remaining.iter().filter(|o| o.importance == 5).count() == 20);
    }
}
