// crates/claudex-sidecar/src/resilient.rs
//! The tiered resilient query (§4.6 "Resilient query") and the post-compact
//! active-file boost eligibility check.
//!
//! Tier 1 (sidecar reachable) is handled entirely by `SidecarClient`. Tiers
//! 2 and 3 never touch the store directly — the caller supplies the
//! persisted pressure rows via `fetch_pressure`, keeping this crate free of
//! a `claudex-db` dependency.

use crate::client::SidecarClient;
use claudex_types::{
    boost_pressure_defaults, CheckpointState, PressureScore, QueryResult, QuerySource, ScoredFile,
    SidecarRequestKind, SidecarRequestPayload, Temperature,
};

/// Input to `query_with_fallback`, mirroring the sidecar request shape plus
/// the caller's own fallback material (§4.6).
pub struct ResilientQueryRequest<'a> {
    pub prompt: Option<&'a str>,
    pub session: &'a str,
    pub recent_files: &'a [String],
    pub project: Option<&'a str>,
    pub boost_files: Vec<String>,
}

fn pressure_score_to_scored_file(score: &PressureScore) -> ScoredFile {
    ScoredFile {
        path: score.file_path.clone(),
        raw_pressure: score.raw_pressure,
        temperature: score.temperature.as_str().to_string(),
        system_bucket: None,
        pressure_bucket: None,
        phase_boosted: score.phase_boosted,
    }
}

/// Tier 2: synthesize `{hot, warm, cold}` from persisted pressure rows when
/// the sidecar is unreachable (§4.6 step 2).
fn db_pressure_result(scores: &[PressureScore]) -> QueryResult {
    let mut hot = Vec::new();
    let mut warm = Vec::new();
    let mut cold = Vec::new();
    for score in scores {
        let scored = pressure_score_to_scored_file(score);
        match score.temperature {
            Temperature::Hot => hot.push(scored),
            Temperature::Warm => warm.push(scored),
            Temperature::Cold => cold.push(scored),
        }
    }
    QueryResult { hot, warm, cold, source: QuerySource::DbPressure }
}

/// Tier 3: recent files with no pressure signal at all (§4.6 step 3).
fn recency_fallback_result(recent_files: &[String]) -> QueryResult {
    let cold = recent_files
        .iter()
        .map(|path| ScoredFile {
            path: path.clone(),
            raw_pressure: boost_pressure_defaults::COLD,
            temperature: Temperature::Cold.as_str().to_string(),
            system_bucket: None,
            pressure_bucket: None,
            phase_boosted: false,
        })
        .collect();
    QueryResult { hot: vec![], warm: vec![], cold, source: QuerySource::RecencyFallback }
}

/// `queryWithFallback` (§4.6): try the sidecar; on failure, fall back to
/// persisted pressure; on empty persisted pressure, fall back to recency.
///
/// `fetch_pressure` is only invoked when the sidecar tier fails — the
/// caller wires it to `claudex_db::queries::pressure::get_pressure_scores`.
pub async fn query_with_fallback<F, Fut>(
    client: &SidecarClient,
    request: ResilientQueryRequest<'_>,
    fetch_pressure: F,
) -> QueryResult
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Vec<PressureScore>>,
{
    let payload = SidecarRequestPayload {
        prompt: request.prompt.map(str::to_string),
        session: request.session.to_string(),
        recent_files: request.recent_files.to_vec(),
        boost_files: request.boost_files,
        project: request.project.map(str::to_string),
    };

    match client.query(SidecarRequestKind::Query, payload).await {
        Ok(result) => QueryResult {
            hot: result.hot,
            warm: result.warm,
            cold: result.cold,
            source: QuerySource::Hologram,
        },
        Err(e) => {
            tracing::warn!("sidecar query failed, degrading to db-pressure tier: {e}");
            let scores = fetch_pressure().await;
            if scores.is_empty() {
                recency_fallback_result(request.recent_files)
            } else {
                db_pressure_result(&scores)
            }
        }
    }
}

/// Resolve which files to attach as `boost_files` on the outgoing request,
/// per the post-compact active-file boost rule (§4.6): eligible only within
/// 30 minutes of the last checkpoint and with fewer than 3 boost turns spent.
/// The caller commits `boost_turn_count += 1` only after a `source =
/// "hologram"` response actually arrives (§4.6, §8 "Boost-accounting").
pub fn resolve_boost_files(checkpoint: Option<&CheckpointState>, now_epoch_ms: i64) -> Vec<String> {
    match checkpoint {
        Some(state) if state.is_boost_eligible(now_epoch_ms) => state.active_files.clone(),
        _ => Vec::new(),
    }
}
