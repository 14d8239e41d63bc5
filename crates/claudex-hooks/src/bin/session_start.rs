// crates/claudex-hooks/src/bin/session_start.rs
//! `SessionStart` hook (§6): open the store, run the Recovery Pass, and
//! assemble the fullest context this system ever produces in one call —
//! the session has no working state yet, so everything comes from what
//! was persisted last time.

use claudex_assembler::sources::{ContextSources, PostCompactionContext};
use claudex_core::gsd;
use claudex_types::{ProjectScope, SessionStartInput};

/// Generous relative to the other hooks — a fresh session has no other
/// source of context yet, so this call can afford the full budget.
const TOKEN_BUDGET: usize = 8000;

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("session-start");

    let Some(input) = claudex_hooks::read_stdin::<SessionStartInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let now = claudex_hooks::now_epoch_ms();
    let scope = claudex_hooks::determine_scope(&input.cwd);

    let Ok(db) = claudex_db::Database::open_default().await else {
        tracing::warn!("session_start: failed to open store, degrading to empty context");
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    claudex_db::sessions::create_session(&db, &input.session_id, &claudex_hooks::session_scope(&scope), &input.cwd, now)
        .await;

    let sidecar_port_marker = claudex_core::paths::sidecar_port_marker().unwrap_or_default();
    let flush_cooldown_marker = claudex_core::paths::flush_cooldown_marker().unwrap_or_default();
    let report = claudex_orchestrator::run_recovery(&db, &sidecar_port_marker, &flush_cooldown_marker, now).await;
    for check in &report.checks {
        if check.status == claudex_orchestrator::RecoveryStatus::Failed {
            tracing::warn!(check = check.name, message = %check.message, "recovery check failed");
        } else {
            tracing::info!(check = check.name, status = check.status.as_str(), message = %check.message, "recovery check");
        }
    }
    claudex_db::audit::log_audit(
        &db,
        now,
        "session_start",
        &format!("session {} recovery: {}/5 ok", input.session_id, report.checks.iter().filter(|c| c.status == claudex_orchestrator::RecoveryStatus::Ok).count()),
        "ok",
    )
    .await;

    let project_root = std::path::Path::new(&input.cwd);
    let project_name = project_root_name(&scope);

    let gsd_state = if project_name.is_some() {
        gsd::read_gsd_state(project_root).unwrap_or(None)
    } else {
        None
    };
    let gsd_plan_must_haves = gsd_state
        .as_ref()
        .and_then(|g| gsd::read_active_plan_text(project_root, g.active_phase, g.active_plan))
        .map(|text| gsd::parse_must_haves(&text))
        .unwrap_or_default();
    let gsd_requirement_status = gsd::read_requirement_status(project_root);

    let checkpoint_state = claudex_db::checkpoint::get_checkpoint_state(&db, &input.session_id).await;
    let hologram = query_hot_files(&db, &input, &scope, gsd_state.as_ref(), project_root, checkpoint_state.as_ref(), now).await;

    let post_compaction = claudex_orchestrator::checkpoint::read_latest_checkpoint(project_root).map(|cp| PostCompactionContext {
        summary: cp.thread.summary,
        key_exchanges: cp.thread.key_exchanges.into_iter().map(|k| (k.role, k.gist)).collect(),
    });

    let sources = ContextSources {
        identity: claudex_hooks::read_identity(),
        project_context: project_name.and_then(|_| claudex_hooks::read_project_context(&input.cwd)),
        hologram: Some(hologram),
        search_results: Vec::new(),
        recent_observations: claudex_db::observations::get_recent_observations(&db, 10, scope.observation_column_value()).await,
        reasoning_chains: claudex_db::reasoning::get_recent_reasoning(&db, 5, scope.observation_column_value()).await,
        consensus_decisions: claudex_db::consensus::get_recent_consensus(&db, 5, scope.observation_column_value()).await,
        gsd_state,
        gsd_plan_must_haves,
        gsd_requirement_status,
        scope,
        post_compaction,
    };

    let assembled = claudex_assembler::assemble(&sources, TOKEN_BUDGET, now);
    claudex_hooks::finish(claudex_types::HookOutput::with_context("SessionStart", assembled.markdown))
}

fn project_root_name(scope: &ProjectScope) -> Option<&str> {
    match scope {
        ProjectScope::Project(name) => Some(name.as_str()),
        ProjectScope::Global => None,
    }
}

/// Query the resilient tier chain for hot files, applying the phase boost
/// only to the db-pressure fallback tier — a real hologram response already
/// reflects phase relevance on the sidecar's own side.
async fn query_hot_files(
    db: &claudex_db::Database,
    input: &SessionStartInput,
    scope: &ProjectScope,
    gsd_state: Option<&claudex_core::gsd::GsdState>,
    project_root: &std::path::Path,
    checkpoint: Option<&claudex_types::CheckpointState>,
    now: i64,
) -> claudex_types::QueryResult {
    let sidecar = claudex_sidecar::SidecarClient::new(claudex_core::paths::sidecar_port_marker().unwrap_or_default());
    let boost_files = claudex_sidecar::resolve_boost_files(checkpoint, now);
    let recent_files: Vec<String> = checkpoint.map(|c| c.active_files.clone()).unwrap_or_default();
    let request = claudex_sidecar::ResilientQueryRequest {
        prompt: None,
        session: &input.session_id,
        recent_files: &recent_files,
        project: scope.observation_column_value(),
        boost_files,
    };

    let (active_plan_files, other_plan_files) = match gsd_state {
        Some(g) => gsd::get_phase_relevance_set(&claudex_core::paths::phases_dir(project_root), g.active_phase, g.active_plan)
            .unwrap_or_default(),
        None => (Vec::new(), Vec::new()),
    };

    let result = claudex_sidecar::query_with_fallback(&sidecar, request, || async {
        let scores = claudex_db::pressure::get_pressure_scores(db, scope).await;
        claudex_db::pressure_engine::apply_phase_boost(scores, &active_plan_files, &other_plan_files)
    })
    .await;

    if matches!(result.source, claudex_types::QuerySource::Hologram) {
        if let Some(state) = checkpoint {
            if state.is_boost_eligible(now) {
                claudex_db::checkpoint::update_boost_state(db, &input.session_id, now, state.boost_turn_count + 1).await;
            }
        }
    }
    result
}
