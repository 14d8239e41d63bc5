// crates/claudex-db/src/pressure_engine.rs
//! Pressure/Decay Engine (§4.4, component C4): the two operations layered on
//! top of the store's pressure primitives.
//!
//! Stratified decay is a thin wrapper over `queries::pressure::decay_all_scores`
//! (the idempotency guard lives there, next to the rows it reads). Phase
//! boost is pure — it never touches the store, since a boost is recomputed
//! per query and never persisted (`PressureScore::phase_boosted` says so).

use claudex_types::{clamp_pressure, PressureScore, Temperature};

const ACTIVE_PLAN_MULTIPLIER: f64 = 1.4;
const OTHER_PLAN_MULTIPLIER: f64 = 1.2;

/// `mult := 1.4 if active, 1.2 if other-plan, 1.0 otherwise` (§4.4 "Phase boost").
fn multiplier_for(path: &str, active_plan_files: &[String], other_plan_files: &[String]) -> f64 {
    if active_plan_files.iter().any(|f| f == path) {
        ACTIVE_PLAN_MULTIPLIER
    } else if other_plan_files.iter().any(|f| f == path) {
        OTHER_PLAN_MULTIPLIER
    } else {
        1.0
    }
}

/// Apply phase-boost multipliers to a batch of scored files, reclassify
/// temperature, and return them sorted by `raw_pressure` descending — a
/// boost can promote a file across temperature tiers, so ranking has to be
/// recomputed after boosting, not before.
pub fn apply_phase_boost(
    mut scores: Vec<PressureScore>,
    active_plan_files: &[String],
    other_plan_files: &[String],
) -> Vec<PressureScore> {
    for score in &mut scores {
        let mult = multiplier_for(&score.file_path, active_plan_files, other_plan_files);
        if mult > 1.0 {
            score.raw_pressure = clamp_pressure(score.raw_pressure * mult);
            score.temperature = Temperature::classify(score.raw_pressure);
            score.phase_boosted = true;
        }
    }
    scores.sort_by(|a, b| b.raw_pressure.partial_cmp(&a.raw_pressure).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(path: &str, raw: f64) -> PressureScore {
        PressureScore {
            file_path: path.to_string(),
            project: "x".to_string(),
            raw_pressure: raw,
            temperature: Temperature::classify(raw),
            decay_rate: 0.05,
            last_accessed_epoch: 0,
            last_decay_epoch: None,
            phase_boosted: false,
        }
    }

    #[test]
    fn active_plan_file_gets_larger_boost_than_other_plan() {
        let scores = vec![score("a.rs", 0.5), score("b.rs", 0.5), score("c.rs", 0.5)];
        let boosted = apply_phase_boost(scores, &["a.rs".to_string()], &["b.rs".to_string()]);
        let by_path = |p: &str| boosted.iter().find(|s| s.file_path == p).unwrap();
        assert_eq!(by_path("a.rs").raw_pressure, 0.7);
        assert_eq!(by_path("b.rs").raw_pressure, 0.6);
        assert_eq!(by_path("c.rs").raw_pressure, 0.5);
    }

    #[test]
    fn boost_can_promote_across_temperature_tiers() {
        let scores = vec![score("a.rs", 0.6)];
        let boosted = apply_phase_boost(scores, &["a.rs".to_string()], &[]);
        assert_eq!(boosted[0].temperature, Temperature::Hot);
        assert!(boosted[0].phase_boosted);
    }

    #[test]
    fn results_sorted_by_raw_pressure_descending() {
        let scores = vec![score("low.rs", 0.2), score("high.rs", 0.4)];
        let boosted = apply_phase_boost(scores, &[], &[]);
        assert_eq!(boosted[0].file_path, "high.rs");
        assert_eq!(boosted[1].file_path, "low.rs");
    }

    #[test]
    fn boost_clamps_at_one() {
        let scores = vec![score("a.rs", 0.9)];
        let boosted = apply_phase_boost(scores, &["a.rs".to_string()], &[]);
        assert_eq!(boosted[0].raw_pressure, 1.0);
    }
}
