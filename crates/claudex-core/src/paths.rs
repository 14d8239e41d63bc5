// crates/claudex-core/src/paths.rs
//! Centralized path functions for the `~/.claudex` home layout (§6).
//!
//! Single source of truth — eliminates ad-hoc `dirs::home_dir().join(...)`
//! scattered across crates. Every path honors the `CLAUDEX_HOME` override.

use std::path::PathBuf;

/// `~/.claudex`, or `$CLAUDEX_HOME` when set — the only environment
/// variable this system reads (§6).
pub fn home_dir() -> Option<PathBuf> {
    if let Ok(override_dir) = std::env::var("CLAUDEX_HOME") {
        if !override_dir.is_empty() {
            return Some(PathBuf::from(override_dir));
        }
    }
    dirs::home_dir().map(|d| d.join(".claudex"))
}

/// `~/.claudex/db/claudex.db` — the single embedded SQL store.
pub fn db_path() -> Option<PathBuf> {
    home_dir().map(|d| d.join("db").join("claudex.db"))
}

/// `~/.claudex/db/.flush_cooldown` — cross-process flush cooldown marker
/// (§4.8, §5).
pub fn flush_cooldown_marker() -> Option<PathBuf> {
    home_dir().map(|d| d.join("db").join(".flush_cooldown"))
}

/// `~/.claudex/hologram/port` — sidecar port marker (§6).
pub fn sidecar_port_marker() -> Option<PathBuf> {
    home_dir().map(|d| d.join("hologram").join("port"))
}

/// `~/.claudex/hooks/logs/` — per-hook append-only log directory.
pub fn hook_logs_dir() -> Option<PathBuf> {
    home_dir().map(|d| d.join("hooks").join("logs"))
}

/// `~/.claudex/identity` — user-profile identity file (bootstrap-owned,
/// read-only from this crate's perspective).
pub fn identity_path() -> Option<PathBuf> {
    home_dir().map(|d| d.join("identity"))
}

/// `~/.claudex/sessions/` — per-session nudge-state and misc session files.
pub fn sessions_dir() -> Option<PathBuf> {
    home_dir().map(|d| d.join("sessions"))
}

/// `~/.claudex/sessions/<session_id>/nudge_state.json`.
pub fn nudge_state_path(session_id: &str) -> Option<PathBuf> {
    sessions_dir().map(|d| d.join(session_id).join("nudge_state.json"))
}

/// Per-project `.planning/` root, given the project's working directory.
pub fn planning_dir(project_root: &std::path::Path) -> PathBuf {
    project_root.join(".planning")
}

/// Per-project `.planning/phases/` root.
pub fn phases_dir(project_root: &std::path::Path) -> PathBuf {
    planning_dir(project_root).join("phases")
}

/// Per-project `context/checkpoints/` root.
pub fn checkpoints_dir(project_root: &std::path::Path) -> PathBuf {
    project_root.join("context").join("checkpoints")
}

/// Per-project `context/checkpoints/latest.yaml`.
pub fn latest_checkpoint_ref(project_root: &std::path::Path) -> PathBuf {
    checkpoints_dir(project_root).join("latest.yaml")
}

/// Per-project `context/pressure/scores.md` mirror snapshot.
pub fn pressure_mirror_path(project_root: &std::path::Path) -> PathBuf {
    project_root.join("context").join("pressure").join("scores.md")
}

/// Per-project `context/reasoning/<session>/<slug>.md` mirror.
pub fn reasoning_mirror_path(project_root: &std::path::Path, session_id: &str, slug: &str) -> PathBuf {
    project_root
        .join("context")
        .join("reasoning")
        .join(session_id)
        .join(format!("{slug}.md"))
}
