// crates/claudex-hooks/src/bin/pre_compact.rs
//! `PreCompact` hook (§6): the safety net fired just before the host
//! compacts the transcript. Captures reasoning/pressure into the store
//! (cooldown-gated) and writes a structured checkpoint (separately
//! debounced) so `SessionStart` has something to resume from afterward.

use claudex_core::decision;
use claudex_orchestrator::checkpoint::{
    read_latest_checkpoint, write_checkpoint_debounced, Checkpoint, CheckpointFiles, CheckpointGsd, CheckpointMeta,
    CheckpointThread,
};
use claudex_orchestrator::flush::{execute_flush, FlushInput};
use claudex_orchestrator::cooldown::FlushCooldown;
use claudex_sidecar::SidecarClient;
use claudex_types::{PreCompactInput, ProjectScope};

const FLUSH_COOLDOWN_WINDOW_MS: i64 = 30_000;
const REASONING_IMPORTANCE: u8 = 3;

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("pre-compact");

    let Some(input) = claudex_hooks::read_stdin::<PreCompactInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let now = claudex_hooks::now_epoch_ms();
    let scope = claudex_hooks::determine_scope(&input.cwd);
    let project_root = std::path::Path::new(&input.cwd);

    let Ok(db) = claudex_db::Database::open_default().await else {
        tracing::warn!("pre_compact: failed to open store");
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    let signals = input
        .transcript_path
        .as_deref()
        .and_then(claudex_hooks::read_transcript_tail)
        .map(|tail| decision::parse_transcript_tail(&tail))
        .unwrap_or_default();
    let gist = decision::extract_assistant_gist(&signals);

    let changed_files: Vec<String> = signals
        .tool_actions
        .iter()
        .filter(|a| matches!(a.name.as_str(), "Edit" | "Write"))
        .filter_map(|a| a.target.clone())
        .collect();
    let read_files: Vec<String> = signals
        .tool_actions
        .iter()
        .filter(|a| a.name == "Read")
        .filter_map(|a| a.target.clone())
        .collect();

    let flush_cooldown_marker = claudex_core::paths::flush_cooldown_marker().unwrap_or_default();
    let mut cooldown = FlushCooldown::load(flush_cooldown_marker);

    if !cooldown.is_active(now, FLUSH_COOLDOWN_WINDOW_MS) {
        let sidecar = SidecarClient::new(claudex_core::paths::sidecar_port_marker().unwrap_or_default());
        let pressure_scores = claudex_db::pressure::get_pressure_scores(&db, &scope).await;
        let outcome = execute_flush(
            &db,
            &sidecar,
            &mut cooldown,
            FlushInput {
                session_id: &input.session_id,
                scope: &scope,
                project_root,
                reasoning_text: if gist.is_empty() { None } else { Some(gist.as_str()) },
                reasoning_title: "pre-compact checkpoint",
                reasoning_importance: REASONING_IMPORTANCE,
                reasoning_decisions: &[],
                reasoning_files_involved: &changed_files,
                pressure_scores: &pressure_scores,
            },
            now,
        )
        .await;
        tracing::info!(
            reasoning_captured = outcome.reasoning_captured,
            pressure_scores_flushed = outcome.pressure_scores_flushed,
            hologram_rescored = outcome.hologram_rescored,
            "pre_compact flush"
        );
    }

    if matches!(scope, ProjectScope::Project(_)) {
        write_project_checkpoint(&db, project_root, &input, &scope, &gist, changed_files, read_files, now).await;
    }

    claudex_hooks::finish(claudex_types::HookOutput::empty())
}

async fn write_project_checkpoint(
    db: &claudex_db::Database,
    project_root: &std::path::Path,
    input: &PreCompactInput,
    scope: &ProjectScope,
    gist: &str,
    changed_files: Vec<String>,
    read_files: Vec<String>,
    now: i64,
) {
    let previous = read_latest_checkpoint(project_root);
    let gsd_state = claudex_core::gsd::read_gsd_state(project_root).unwrap_or(None);
    let created_at = chrono::DateTime::from_timestamp_millis(now)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    let checkpoint = Checkpoint {
        schema: Checkpoint::SCHEMA.to_string(),
        version: Checkpoint::VERSION,
        meta: CheckpointMeta {
            checkpoint_id: uuid::Uuid::new_v4().to_string(),
            session_id: input.session_id.clone(),
            scope: scope.observation_column_value().unwrap_or("global").to_string(),
            created_at,
            trigger: input.trigger.clone().unwrap_or_else(|| "auto".to_string()),
            token_usage: None,
            previous_checkpoint: previous.map(|cp| cp.meta.checkpoint_id),
        },
        working: if gist.is_empty() { None } else { Some(gist.to_string()) },
        decisions: Vec::new(),
        files: CheckpointFiles { changed: changed_files, read: read_files, hot: Vec::new() },
        open_questions: Vec::new(),
        learnings: Vec::new(),
        gsd: gsd_state.map(|g| CheckpointGsd {
            phase: g.active_phase.to_string(),
            plan: if g.active_plan == 0 { None } else { Some(g.active_plan.to_string()) },
        }),
        thread: CheckpointThread { summary: gist.to_string(), key_exchanges: Vec::new() },
    };

    match write_checkpoint_debounced(project_root, &checkpoint, now) {
        Ok(Some(path)) => {
            tracing::info!(path = %path.display(), "wrote checkpoint");
            reset_boost_state(db, &input.session_id).await;
        }
        Ok(None) => tracing::debug!("checkpoint write debounced"),
        Err(e) => tracing::warn!(error = %e, "checkpoint write failed"),
    }
}

/// Reset `boost_turn_count` to 0 after a fresh checkpoint — a new
/// checkpoint means a new set of active files, so the spent-turn budget
/// from the previous checkpoint no longer applies (§4.6, §8
/// "Boost-accounting").
async fn reset_boost_state(db: &claudex_db::Database, session_id: &str) {
    if let Some(mut state) = claudex_db::checkpoint::get_checkpoint_state(db, session_id).await {
        state.boost_turn_count = 0;
        claudex_db::checkpoint::upsert_checkpoint_state(db, &state).await;
    }
}
