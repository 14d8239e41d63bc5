// crates/claudex-orchestrator/src/checkpoint.rs
//! Structured YAML checkpoint (§4.8 "safety net on pre-compact"): a
//! schema-typed document written before host compaction, with a debounced
//! `latest.yaml` ref pointing at the most recent file.

use crate::error::OrchestratorError;
use crate::util::file_mtime_epoch_ms;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Skip writing a new checkpoint when `latest.yaml` was touched this
/// recently (§4.8 "Debounce").
const DEBOUNCE_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema: String,
    pub version: u32,
    pub meta: CheckpointMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working: Option<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    pub files: CheckpointFiles,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsd: Option<CheckpointGsd>,
    pub thread: CheckpointThread,
}

impl Checkpoint {
    pub const SCHEMA: &'static str = "claudex/checkpoint";
    pub const VERSION: u32 = 1;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub checkpoint_id: String,
    pub session_id: String,
    pub scope: String,
    pub created_at: String,
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_checkpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointFiles {
    #[serde(default)]
    pub changed: Vec<String>,
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub hot: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointGsd {
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointThread {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_exchanges: Vec<KeyExchange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyExchange {
    pub role: String,
    pub gist: String,
}

/// `context/checkpoints/latest.yaml` (§4.8): names the most recent file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

fn normalize_crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn next_sequence(checkpoints_dir: &Path, date: &str) -> u32 {
    let prefix = format!("{date}_cp");
    let mut max_n = 0u32;
    if let Ok(entries) = std::fs::read_dir(checkpoints_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(rest) = name.strip_prefix(&prefix) {
                if let Some(num_str) = rest.strip_suffix(".yaml") {
                    if let Ok(n) = num_str.parse::<u32>() {
                        max_n = max_n.max(n);
                    }
                }
            }
        }
    }
    max_n + 1
}

/// Write a checkpoint file and update `latest.yaml`, unless the debounce
/// window is still open. Returns the written file's path, or `None` when
/// debounced.
pub fn write_checkpoint_debounced(
    project_root: &Path,
    checkpoint: &Checkpoint,
    now_epoch_ms: i64,
) -> Result<Option<PathBuf>, OrchestratorError> {
    let checkpoints_dir = claudex_core::paths::checkpoints_dir(project_root);
    let latest_path = claudex_core::paths::latest_checkpoint_ref(project_root);

    if let Some(mtime) = file_mtime_epoch_ms(&latest_path) {
        if now_epoch_ms - mtime < DEBOUNCE_WINDOW_MS {
            return Ok(None);
        }
    }

    std::fs::create_dir_all(&checkpoints_dir)
        .map_err(|source| OrchestratorError::CheckpointWrite { path: checkpoints_dir.clone(), source })?;

    let date = chrono::DateTime::from_timestamp_millis(now_epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string());
    let sequence = next_sequence(&checkpoints_dir, &date);
    let file_name = format!("{date}_cp{sequence}.yaml");
    let file_path = checkpoints_dir.join(&file_name);

    let yaml = serde_yaml::to_string(checkpoint)?;
    std::fs::write(&file_path, yaml)
        .map_err(|source| OrchestratorError::CheckpointWrite { path: file_path.clone(), source })?;

    let latest_yaml = serde_yaml::to_string(&LatestRef { reference: file_name })?;
    std::fs::write(&latest_path, latest_yaml)
        .map_err(|source| OrchestratorError::CheckpointWrite { path: latest_path.clone(), source })?;

    Ok(Some(file_path))
}

/// Read the most recent checkpoint via `latest.yaml`. Per §9 "File-backed
/// YAML state": a read that fails validation at any step returns `None`,
/// never an error.
pub fn read_latest_checkpoint(project_root: &Path) -> Option<Checkpoint> {
    let latest_path = claudex_core::paths::latest_checkpoint_ref(project_root);
    let latest_text = std::fs::read_to_string(&latest_path).ok()?;
    let latest: LatestRef = serde_yaml::from_str(&normalize_crlf(&latest_text)).ok()?;
    let checkpoint_path = claudex_core::paths::checkpoints_dir(project_root).join(&latest.reference);
    let checkpoint_text = std::fs::read_to_string(&checkpoint_path).ok()?;
    serde_yaml::from_str(&normalize_crlf(&checkpoint_text)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(session_id: &str) -> Checkpoint {
        Checkpoint {
            schema: Checkpoint::SCHEMA.to_string(),
            version: Checkpoint::VERSION,
            meta: CheckpointMeta {
                checkpoint_id: "cp1".to_string(),
                session_id: session_id.to_string(),
                scope: "global".to_string(),
                created_at: "2026-07-27T00:00:00Z".to_string(),
                trigger: "pre_compact".to_string(),
                token_usage: Some(12_000),
                previous_checkpoint: None,
            },
            working: Some("implementing the checkpoint writer".to_string()),
            decisions: vec!["use yaml".to_string()],
            files: CheckpointFiles {
                changed: vec!["src/checkpoint.rs".to_string()],
                read: vec![],
                hot: vec![],
            },
            open_questions: vec![],
            learnings: vec![],
            gsd: None,
            thread: CheckpointThread {
                summary: "writing the checkpoint orchestrator".to_string(),
                key_exchanges: vec![KeyExchange { role: "user".to_string(), gist: "go ahead".to_string() }],
            },
        }
    }

    #[test]
    fn writes_file_and_latest_ref() {
        let tmp = tempfile::tempdir().unwrap();
        let written = write_checkpoint_debounced(tmp.path(), &sample("s1"), 1_000).unwrap();
        assert!(written.is_some());
        let path = written.unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().contains("_cp1.yaml"));

        let restored = read_latest_checkpoint(tmp.path()).unwrap();
        assert_eq!(restored.meta.session_id, "s1");
        assert_eq!(restored.decisions, vec!["use yaml".to_string()]);
    }

    #[test]
    fn second_write_within_debounce_window_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write_checkpoint_debounced(tmp.path(), &sample("s1"), 1_000).unwrap();
        let second = write_checkpoint_debounced(tmp.path(), &sample("s1"), 1_000 + 30_000).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn write_after_debounce_window_increments_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        write_checkpoint_debounced(tmp.path(), &sample("s1"), 1_000).unwrap();
        let second = write_checkpoint_debounced(tmp.path(), &sample("s1"), 1_000 + 60_000).unwrap();
        assert!(second.unwrap().file_name().unwrap().to_string_lossy().contains("_cp2.yaml"));
    }

    #[test]
    fn read_latest_returns_none_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_latest_checkpoint(tmp.path()).is_none());
    }

    #[test]
    fn read_latest_returns_none_on_malformed_ref() {
        let tmp = tempfile::tempdir().unwrap();
        let checkpoints_dir = claudex_core::paths::checkpoints_dir(tmp.path());
        std::fs::create_dir_all(&checkpoints_dir).unwrap();
        std::fs::write(claudex_core::paths::latest_checkpoint_ref(tmp.path()), "not: [valid yaml").unwrap();
        assert!(read_latest_checkpoint(tmp.path()).is_none());
    }
}
