// crates/claudex-hooks/src/lib.rs
//! Shared stdio glue for the hook binaries (§6, external interface; not a
//! spec.md component in its own right — thin entry points are explicitly
//! out of scope of the core, but the plumbing has to live somewhere so the
//! six binaries don't each reinvent it).
//!
//! Every binary in this crate follows the same shape: read one JSON object
//! from stdin, do core work through `claudex-core`/`claudex-db`/etc., write
//! one JSON object to stdout, exit 0. Nothing here ever panics or returns a
//! non-zero exit code — a hook that can't do its job degrades to `{}`.

use claudex_types::{HookOutput, ProjectScope, SessionScope};
use std::path::{Path, PathBuf};

/// Read all of stdin and deserialize it as `T`. A hook is handed exactly
/// one JSON object (§6) — malformed input is not a panic, just a `None`
/// the caller treats as "nothing to do".
pub fn read_stdin<T: serde::de::DeserializeOwned>() -> Option<T> {
    let mut buf = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

/// Write `output` as a single JSON object followed by a newline (§6), then
/// exit 0. This is the only permitted point of termination for a hook
/// binary — callers reach it via `finish`, never `std::process::exit`
/// directly elsewhere.
pub fn finish(output: HookOutput) -> ! {
    let json = serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string());
    println!("{json}");
    std::process::exit(0);
}

/// Current wall-clock time in epoch milliseconds. Centralized so a future
/// test double only has one place to inject a clock.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Decide whether `cwd` is inside a GSD-aware project (a `.planning`
/// directory is present) or should be treated as global scope. The project
/// name is the working directory's final path component — the host never
/// sends an explicit project identifier (§6 stdin fields), so this is the
/// one piece of project detection a hook binary has to do itself.
pub fn determine_scope(cwd: &str) -> ProjectScope {
    let cwd_path = Path::new(cwd);
    if cwd_path.join(".planning").is_dir() || cwd_path.join(".git").exists() {
        match cwd_path.file_name().and_then(|n| n.to_str()) {
            Some(name) if !name.is_empty() => return ProjectScope::Project(name.to_string()),
            _ => {}
        }
    }
    ProjectScope::Global
}

/// `(project_name, project_root)` for `claudex_core::redactor::sanitize_path`
/// and the observation extractor's `ExtractContext`, or `None` for global
/// scope (nothing to make paths relative to).
pub fn project_root_tuple<'a>(scope: &'a ProjectScope, cwd: &'a str) -> Option<(&'a str, &'a str)> {
    match scope {
        ProjectScope::Project(name) => Some((name.as_str(), cwd)),
        ProjectScope::Global => None,
    }
}

/// Read the last `claudex_core::decision::TRANSCRIPT_TAIL_BYTES` of the
/// transcript file at `path`, tolerating absence or a file shorter than the
/// window (§4.10). Returns `None` when the path is unreadable — transcript
/// access is always best-effort.
pub fn read_transcript_tail(path: &str) -> Option<String> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = std::fs::File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    let window = claudex_core::decision::TRANSCRIPT_TAIL_BYTES as u64;
    let start = len.saturating_sub(window);
    file.seek(SeekFrom::Start(start)).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    Some(buf)
}

/// Build a permissive FTS5 `MATCH` query from a free-text prompt: keep
/// alphanumeric words of at least 3 characters, OR them together, and cap
/// the term count so a long prompt doesn't turn into an unbounded query.
/// Returns `None` when the prompt yields no usable terms.
pub fn fts_query_from_prompt(prompt: &str) -> Option<String> {
    const MAX_TERMS: usize = 8;
    let terms: Vec<String> = prompt
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| w.chars().count() >= 3)
        .take(MAX_TERMS)
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// `~/.claudex/hooks/logs/` defaults to empty when the home dir can't be
/// resolved; every path-returning helper in `claudex_core::paths` already
/// tolerates that, so hook binaries just unwrap-or-default through `PathBuf`.
pub fn fallback_path(resolved: Option<PathBuf>, leaf: &str) -> PathBuf {
    resolved.unwrap_or_else(|| PathBuf::from(leaf))
}

/// `ProjectScope` and `SessionScope` carry the same two cases but serve
/// different tables (§3) — this is the one conversion point so a hook never
/// hand-matches it inline.
pub fn session_scope(scope: &ProjectScope) -> SessionScope {
    match scope {
        ProjectScope::Global => SessionScope::Global,
        ProjectScope::Project(name) => SessionScope::Project(name.clone()),
    }
}

/// `~/.claudex/identity` — best-effort; absence just means no identity
/// section gets assembled (§4.7).
pub fn read_identity() -> Option<String> {
    let path = claudex_core::paths::identity_path()?;
    std::fs::read_to_string(path).ok()
}

/// `<project_root>/CLAUDE.md`, when present — the closest thing this system
/// has to a per-project context file, read the same way a host would hand
/// it to a fresh session.
pub fn read_project_context(project_root: &str) -> Option<String> {
    std::fs::read_to_string(Path::new(project_root).join("CLAUDE.md")).ok()
}
