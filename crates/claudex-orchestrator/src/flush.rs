// crates/claudex-orchestrator/src/flush.rs
//! `executeFlush` (§4.8, C8): the cooldown-gated drain of transient reasoning
//! and pressure state into the store, flat-file mirrors, and a sidecar
//! rescore attempt. Each of the five steps runs in its own error boundary —
//! one subsystem's failure never stops the others from running, and the
//! returned counts reflect only what actually succeeded.

use crate::cooldown::FlushCooldown;
use crate::mirrors;
use claudex_db::Database;
use claudex_sidecar::{query_with_fallback, ResilientQueryRequest, SidecarClient};
use claudex_types::{PressureScore, ProjectScope, QuerySource, ReasoningTrigger};
use std::path::Path;
use std::time::Instant;
use tracing::warn;

/// Input to `execute_flush`. Borrowed for the duration of the call — the
/// orchestrator never owns the session's working state.
pub struct FlushInput<'a> {
    pub session_id: &'a str,
    pub scope: &'a ProjectScope,
    pub project_root: &'a Path,
    pub reasoning_text: Option<&'a str>,
    pub reasoning_title: &'a str,
    pub reasoning_importance: u8,
    pub reasoning_decisions: &'a [String],
    pub reasoning_files_involved: &'a [String],
    pub pressure_scores: &'a [PressureScore],
}

/// `{durationMs, reasoningCaptured, pressureScoresFlushed, mirrorFilesWritten,
/// hologramRescored}` (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct FlushOutcome {
    pub duration_ms: i64,
    pub reasoning_captured: bool,
    pub pressure_scores_flushed: u32,
    pub mirror_files_written: u32,
    pub hologram_rescored: bool,
}

/// Tier 2 ("db-pressure") counts as a successful rescore alongside tier 1
/// ("hologram") — only the tier-3 recency fallback means rescoring did not
/// actually happen (§4.8 step 4).
async fn attempt_rescore(sidecar: &SidecarClient, db: &Database, scope: &ProjectScope, session_id: &str) -> bool {
    let request = ResilientQueryRequest {
        prompt: None,
        session: session_id,
        recent_files: &[],
        project: scope.observation_column_value(),
        boost_files: Vec::new(),
    };
    let result =
        query_with_fallback(sidecar, request, || async { claudex_db::pressure::get_pressure_scores(db, scope).await })
            .await;
    !matches!(result.source, QuerySource::RecencyFallback)
}

pub async fn execute_flush(
    db: &Database,
    sidecar: &SidecarClient,
    cooldown: &mut FlushCooldown,
    input: FlushInput<'_>,
    now_epoch_ms: i64,
) -> FlushOutcome {
    let start = Instant::now();
    let mut reasoning_captured = false;
    let mut pressure_scores_flushed = 0u32;
    let mut mirror_files_written = 0u32;

    // Step 1: reasoning capture.
    if let Some(text) = input.reasoning_text {
        let id = claudex_db::reasoning::insert_reasoning(
            db,
            input.session_id,
            input.scope.observation_column_value(),
            now_epoch_ms,
            ReasoningTrigger::PreCompact,
            input.reasoning_title,
            text,
            input.reasoning_importance,
            input.reasoning_decisions,
            input.reasoning_files_involved,
        )
        .await;
        if id > 0 {
            reasoning_captured = true;
            match mirrors::write_reasoning_mirror(input.project_root, input.session_id, input.reasoning_title, text, now_epoch_ms) {
                Ok(_) => mirror_files_written += 1,
                Err(e) => warn!("reasoning mirror write failed: {e}"),
            }
        }
    }

    // Step 2: pressure persist.
    for score in input.pressure_scores {
        claudex_db::pressure::upsert_pressure_score(db, score).await;
        pressure_scores_flushed += 1;
    }

    // Step 3: pressure snapshot mirror — always refreshed, overwrite not append.
    match mirrors::write_pressure_mirror(input.project_root, input.pressure_scores) {
        Ok(_) => mirror_files_written += 1,
        Err(e) => warn!("pressure mirror write failed: {e}"),
    }

    // Step 4: sidecar rescore attempt.
    let hologram_rescored = attempt_rescore(sidecar, db, input.scope, input.session_id).await;

    // Step 5: cooldown.
    cooldown.mark_flushed(now_epoch_ms);

    FlushOutcome {
        duration_ms: start.elapsed().as_millis() as i64,
        reasoning_captured,
        pressure_scores_flushed,
        mirror_files_written,
        hologram_rescored,
    }
}
