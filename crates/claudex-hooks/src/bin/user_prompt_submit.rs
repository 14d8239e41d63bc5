// crates/claudex-hooks/src/bin/user_prompt_submit.rs
//! `UserPromptSubmit` hook (§6): a lighter, prompt-focused assembly than
//! `SessionStart` — the session already has context, this just surfaces
//! what's relevant to the new prompt.

use claudex_assembler::sources::{ContextSources, SearchHit};
use claudex_types::{ProjectScope, QuerySource, UserPromptSubmitInput};

const TOKEN_BUDGET: usize = 3000;
const SEARCH_LIMIT: u32 = 8;

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("user-prompt-submit");

    let Some(input) = claudex_hooks::read_stdin::<UserPromptSubmitInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let now = claudex_hooks::now_epoch_ms();
    let scope = claudex_hooks::determine_scope(&input.cwd);

    let Ok(db) = claudex_db::Database::open_default().await else {
        tracing::warn!("user_prompt_submit: failed to open store, degrading to empty context");
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    let search_results = match claudex_hooks::fts_query_from_prompt(&input.prompt) {
        Some(query) => claudex_db::observations::search_all(&db, &query, SEARCH_LIMIT)
            .await
            .into_iter()
            .map(|hit| SearchHit { source: hit.source, title: hit.title, timestamp_epoch_ms: hit.timestamp_epoch_ms })
            .collect(),
        None => Vec::new(),
    };

    let checkpoint_state = claudex_db::checkpoint::get_checkpoint_state(&db, &input.session_id).await;
    let hologram = query_hot_files(&db, &input, &scope, checkpoint_state.as_ref(), now).await;

    let project_root = std::path::Path::new(&input.cwd);
    let gsd_state = match &scope {
        ProjectScope::Project(_) => claudex_core::gsd::read_gsd_state(project_root).unwrap_or(None),
        ProjectScope::Global => None,
    };

    let sources = ContextSources {
        identity: None,
        project_context: None,
        hologram: Some(hologram),
        search_results,
        recent_observations: Vec::new(),
        reasoning_chains: Vec::new(),
        consensus_decisions: Vec::new(),
        gsd_state,
        gsd_plan_must_haves: Vec::new(),
        gsd_requirement_status: None,
        scope,
        post_compaction: None,
    };

    let assembled = claudex_assembler::assemble(&sources, TOKEN_BUDGET, now);
    claudex_hooks::finish(claudex_types::HookOutput::with_context("UserPromptSubmit", assembled.markdown))
}

async fn query_hot_files(
    db: &claudex_db::Database,
    input: &UserPromptSubmitInput,
    scope: &ProjectScope,
    checkpoint: Option<&claudex_types::CheckpointState>,
    now: i64,
) -> claudex_types::QueryResult {
    let sidecar = claudex_sidecar::SidecarClient::new(claudex_core::paths::sidecar_port_marker().unwrap_or_default());
    let boost_files = claudex_sidecar::resolve_boost_files(checkpoint, now);
    let recent_files: Vec<String> = checkpoint.map(|c| c.active_files.clone()).unwrap_or_default();
    let request = claudex_sidecar::ResilientQueryRequest {
        prompt: Some(&input.prompt),
        session: &input.session_id,
        recent_files: &recent_files,
        project: scope.observation_column_value(),
        boost_files,
    };

    let result = claudex_sidecar::query_with_fallback(&sidecar, request, || async {
        claudex_db::pressure::get_pressure_scores(db, scope).await
    })
    .await;

    if matches!(result.source, QuerySource::Hologram) {
        if let Some(state) = checkpoint {
            if state.is_boost_eligible(now) {
                claudex_db::checkpoint::update_boost_state(db, &input.session_id, now, state.boost_turn_count + 1).await;
            }
        }
    }
    result
}
