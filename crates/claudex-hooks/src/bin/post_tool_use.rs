// crates/claudex-hooks/src/bin/post_tool_use.rs
//! `PostToolUse` hook (§6): normalize one tool invocation into an
//! observation and accumulate pressure for the files it touched. Never
//! injects context — this event only writes.

use claudex_core::observation_extractor::{self, ExtractContext};
use claudex_types::PostToolUseInput;

/// `accumulatePressureScore` deltas (§4.4) for a file a tool only read
/// versus one it actually changed — a read signals relevance, a write or
/// edit signals active work, so it earns a larger nudge toward HOT.
const READ_PRESSURE_DELTA: f64 = 0.15;
const MODIFY_PRESSURE_DELTA: f64 = 0.25;

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("post-tool-use");

    let Some(input) = claudex_hooks::read_stdin::<PostToolUseInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let now = claudex_hooks::now_epoch_ms();
    let scope = claudex_hooks::determine_scope(&input.cwd);

    let Ok(db) = claudex_db::Database::open_default().await else {
        tracing::warn!("post_tool_use: failed to open store");
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    let ctx = ExtractContext {
        session_id: &input.session_id,
        project: scope.observation_column_value(),
        project_root: claudex_hooks::project_root_tuple(&scope, &input.cwd),
        timestamp_epoch_ms: now,
    };

    match observation_extractor::extract(&ctx, &input.tool_name, &input.tool_input, &input.tool_response) {
        Ok(Some(obs)) => {
            for path in &obs.files_read {
                claudex_db::pressure::accumulate_pressure_score(&db, path, &scope, READ_PRESSURE_DELTA, now).await;
            }
            for path in &obs.files_modified {
                claudex_db::pressure::accumulate_pressure_score(&db, path, &scope, MODIFY_PRESSURE_DELTA, now).await;
            }
            let id = claudex_db::observations::store_observation(&db, &obs).await;
            if id > 0 {
                claudex_db::sessions::increment_observation_count(&db, &input.session_id).await;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(tool = %input.tool_name, error = %e, "observation extraction failed"),
    }

    claudex_hooks::finish(claudex_types::HookOutput::empty())
}
