// crates/claudex-orchestrator/src/mirrors.rs
//! Flat-file markdown mirrors written by `executeFlush` (§4.8 step 3):
//! one reasoning file per flush (new file, never overwritten) and a single
//! pressure snapshot that is overwritten in place every flush.

use crate::error::OrchestratorError;
use claudex_types::PressureScore;
use std::path::{Path, PathBuf};

fn slugify(title: &str, fallback_epoch_ms: i64) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let slug = slug.trim_matches('-');
    let slug: String = slug.chars().take(60).collect();
    if slug.is_empty() {
        format!("entry-{fallback_epoch_ms}")
    } else {
        slug
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), OrchestratorError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| OrchestratorError::MirrorWrite { path: path.to_owned(), source })?;
    }
    std::fs::write(path, contents).map_err(|source| OrchestratorError::MirrorWrite { path: path.to_owned(), source })
}

/// Append-style reasoning mirror: one markdown file per capture, named from
/// a slug of its title, under `context/reasoning/<session>/<slug>.md`.
pub fn write_reasoning_mirror(
    project_root: &Path,
    session_id: &str,
    title: &str,
    reasoning: &str,
    now_epoch_ms: i64,
) -> Result<PathBuf, OrchestratorError> {
    let slug = slugify(title, now_epoch_ms);
    let path = claudex_core::paths::reasoning_mirror_path(project_root, session_id, &slug);
    let contents = format!("# {title}\n\n_captured at epoch {now_epoch_ms}_\n\n{reasoning}\n");
    write_file(&path, &contents)?;
    Ok(path)
}

/// Snapshot-overwrite pressure mirror: a single markdown table at
/// `context/pressure/scores.md`, replaced wholesale on every flush.
pub fn write_pressure_mirror(project_root: &Path, scores: &[PressureScore]) -> Result<PathBuf, OrchestratorError> {
    let path = claudex_core::paths::pressure_mirror_path(project_root);
    let mut out = String::from("# Pressure Scores\n\n| file | project | pressure | temperature |\n|---|---|---|---|\n");
    for score in scores {
        out.push_str(&format!(
            "| `{}` | {} | {:.3} | {} |\n",
            score.file_path,
            score.project,
            score.raw_pressure,
            score.temperature.as_str()
        ));
    }
    write_file(&path, &out)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claudex_types::Temperature;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Why we picked SQLite!!", 0), "why-we-picked-sqlite");
        assert_eq!(slugify("   ", 42), "entry-42");
    }

    #[test]
    fn reasoning_mirror_writes_under_session_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_reasoning_mirror(tmp.path(), "s1", "Pick sqlite", "because embedded", 1000).unwrap();
        assert!(path.starts_with(tmp.path().join("context").join("reasoning").join("s1")));
        assert!(path.exists());
        assert!(std::fs::read_to_string(&path).unwrap().contains("because embedded"));
    }

    #[test]
    fn pressure_mirror_overwrites_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let score = PressureScore {
            file_path: "a.rs".to_string(),
            project: "x".to_string(),
            raw_pressure: 0.8,
            temperature: Temperature::Hot,
            decay_rate: 0.05,
            last_accessed_epoch: 0,
            last_decay_epoch: None,
            phase_boosted: false,
        };
        let path1 = write_pressure_mirror(tmp.path(), &[score.clone()]).unwrap();
        let path2 = write_pressure_mirror(tmp.path(), &[]).unwrap();
        assert_eq!(path1, path2);
        let contents = std::fs::read_to_string(&path2).unwrap();
        assert!(!contents.contains("a.rs"));
    }
}
