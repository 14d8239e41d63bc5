// crates/claudex-hooks/src/bin/stop.rs
//! `Stop` hook (§6, §4.10): re-read the transcript tail, update the
//! per-session nudge state, and surface a nudge message when the policy
//! fires.

use claudex_core::decision;
use claudex_types::{NudgeState, StopInput};

/// Count assistant free-text blocks in the transcript tail that trip
/// `detect_decision_signal` — `parse_transcript_tail` only tracks tool
/// calls, so the nudge policy's "did a decision get made" input is read
/// separately here.
fn count_decision_signals(tail: &str) -> u32 {
    let mut count = 0u32;
    let mut lines = tail.lines();
    lines.next(); // first line may be partial, same convention as parse_transcript_tail

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        let Some(content) = entry.pointer("/message/content").and_then(|v| v.as_array()) else {
            continue;
        };
        for item in content {
            if item.get("type").and_then(|t| t.as_str()) != Some("text") {
                continue;
            }
            let Some(text) = item.get("text").and_then(|t| t.as_str()) else {
                continue;
            };
            if decision::detect_decision_signal(text).is_some() {
                count += 1;
            }
        }
    }
    count
}

fn load_nudge_state(path: &std::path::Path) -> NudgeState {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn save_nudge_state(path: &std::path::Path, state: NudgeState) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(error = %e, "failed to create nudge state directory");
            return;
        }
    }
    match serde_json::to_string(&state) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                tracing::warn!(error = %e, "failed to persist nudge state");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to serialize nudge state"),
    }
}

#[tokio::main]
async fn main() {
    let _guard = claudex_observability::init("stop");

    let Some(input) = claudex_hooks::read_stdin::<StopInput>() else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };

    let signals = input
        .transcript_path
        .as_deref()
        .and_then(claudex_hooks::read_transcript_tail)
        .map(|tail| (decision::parse_transcript_tail(&tail), count_decision_signals(&tail)))
        .unwrap_or_default();
    let (transcript_signals, decision_count) = signals;

    let Some(state_path) = claudex_core::paths::nudge_state_path(&input.session_id) else {
        claudex_hooks::finish(claudex_types::HookOutput::empty());
    };
    let state = load_nudge_state(&state_path);

    let (new_state, nudge) = decision::apply_nudge_policy(state, transcript_signals.file_modify_count, decision_count);
    save_nudge_state(&state_path, new_state);

    match nudge {
        Some(message) => claudex_hooks::finish(claudex_types::HookOutput::with_context("Stop", message)),
        None => claudex_hooks::finish(claudex_types::HookOutput::empty()),
    }
}
