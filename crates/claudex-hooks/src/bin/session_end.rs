// crates/claudex-hooks/src/bin/session_end.rs
//! `SessionEnd` hook (§6): close the session row and run the two
//! store-maintenance passes that are only safe between sessions — pruning
//! and stratified decay — plus the audit-log retention sweep.

use claudex_types::{SessionEndInput, SessionStatus};

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("session-end");

    let Some(input) = claudex_hooks::read_stdin::<SessionEndInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let now = claudex_hooks::now_epoch_ms();
    let scope = claudex_hooks::determine_scope(&input.cwd);

    let Ok(db) = claudex_db::Database::open_default().await else {
        tracing::warn!("session_end: failed to open store");
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    claudex_db::sessions::update_session_status(&db, &input.session_id, SessionStatus::Completed, Some(now)).await;

    let prune_outcome = claudex_db::pruner::prune(&db, scope.observation_column_value(), now).await;
    if prune_outcome.pruned > 0 {
        tracing::info!(pruned = prune_outcome.pruned, remaining = prune_outcome.remaining, "pruned observations");
    }

    let decayed = claudex_db::pressure::decay_all_scores(&db, Some(&scope), now).await;
    tracing::info!(decayed, "decayed pressure scores");

    let removed_audit_rows = claudex_db::audit::clean_old_audit_logs(&db, now).await;
    claudex_db::audit::log_audit(
        &db,
        now,
        "session_end",
        &format!(
            "session {} ended: pruned={} decayed={} audit_swept={}",
            input.session_id, prune_outcome.pruned, decayed, removed_audit_rows
        ),
        "ok",
    )
    .await;

    claudex_hooks::finish(claudex_types::HookOutput::empty())
}
