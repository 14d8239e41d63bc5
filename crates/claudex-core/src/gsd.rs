// crates/claudex-core/src/gsd.rs
//! GSD (get-stuff-done) project-plan reader and phase relevance computation
//! (§4.11, component C11).
//!
//! Parses `.planning/STATE.md`, `.planning/ROADMAP.md`, and
//! `.planning/phases/<NN[.M]-slug>/<NN-MM-{PLAN,SUMMARY}.md`. Two tolerant
//! parser forms exist because plan files in the wild are written by hand:
//! a bold-field form (`**Phase:** 3`) and a free-text fallback
//! (`Phase: 3` or `phase 3`).

use crate::error::ParseFailure;
use regex_lite::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GsdState {
    pub active_phase: f64,
    pub active_plan: u32,
    pub total_phases: Option<u32>,
    pub phase_goal: Option<String>,
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanFile {
    pub phase: f64,
    pub plan: u32,
    pub files_modified: Vec<String>,
    pub completed: bool,
}

fn bold_field_pattern(field: &str) -> Regex {
    Regex::new(&format!(r"(?im)^\*\*{field}:?\*\*\s*(.+)$")).expect("valid regex")
}

fn free_text_field_pattern(field: &str) -> Regex {
    Regex::new(&format!(r"(?im)^{field}:?\s+(.+)$")).expect("valid regex")
}

/// Try the bold-field form first, then the free-text fallback. CRLF line
/// endings are normalized before matching.
fn extract_field(text: &str, field: &str) -> Option<String> {
    let normalized = text.replace("\r\n", "\n");
    if let Some(caps) = bold_field_pattern(field).captures(&normalized) {
        return Some(caps[1].trim().to_string());
    }
    if let Some(caps) = free_text_field_pattern(field).captures(&normalized) {
        return Some(caps[1].trim().to_string());
    }
    None
}

fn is_filtered_requirement(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "none" | "tbd" | "n/a" | ""
    )
}

/// Parse `.planning/STATE.md` for the active phase/plan pointer.
pub fn parse_state(text: &str) -> Option<(f64, u32)> {
    let phase = extract_field(text, "Phase")?.parse::<f64>().ok()?;
    let plan = extract_field(text, "Plan")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    Some((phase, plan))
}

/// Parse one `NN-MM-PLAN.md` body for its declared phase/plan number and
/// the files it touches, filtering "None/TBD/N/A" sentinel entries.
pub fn parse_plan_file(text: &str, phase: f64, plan: u32) -> PlanFile {
    static FILE_LINE: OnceLock<Regex> = OnceLock::new();
    let file_pattern =
        FILE_LINE.get_or_init(|| Regex::new(r"(?m)^[-*]\s*`?([^`\n]+?)`?\s*$").expect("valid regex"));

    let files_modified = extract_field(text, "Files Modified")
        .map(|block| {
            file_pattern
                .captures_iter(&block)
                .map(|c| c[1].trim().to_string())
                .filter(|f| !is_filtered_requirement(f))
                .collect()
        })
        .unwrap_or_else(|| {
            file_pattern
                .captures_iter(text)
                .map(|c| c[1].trim().to_string())
                .filter(|f| !is_filtered_requirement(f))
                .collect()
        });

    PlanFile {
        phase,
        plan,
        files_modified,
        completed: false,
    }
}

/// Directory name format: `NN[.M]-slug`. Extracts the leading phase number.
fn phase_number_from_dir_name(name: &str) -> Option<f64> {
    static DIR_PREFIX: OnceLock<Regex> = OnceLock::new();
    let pattern = DIR_PREFIX.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)-").expect("valid regex"));
    pattern
        .captures(name)
        .and_then(|c| c[1].parse::<f64>().ok())
}

/// File name format: `NN-MM-PLAN.md` / `NN-MM-SUMMARY.md`.
fn parse_plan_file_name(name: &str) -> Option<(u32, &'static str)> {
    static PLAN_NAME: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PLAN_NAME.get_or_init(|| Regex::new(r"^\d+-(\d+)-(PLAN|SUMMARY)\.md$").expect("valid regex"));
    let caps = pattern.captures(name)?;
    let plan_num = caps[1].parse::<u32>().ok()?;
    let kind = if &caps[2] == "PLAN" { "PLAN" } else { "SUMMARY" };
    Some((plan_num, kind))
}

/// Compute `{activePlanFiles, otherPlanFiles}` for the given phases
/// directory, active phase, and active plan number (§4.11).
///
/// Files named in both sets resolve to `activePlanFiles` only. When
/// `active_plan == 0`, every eligible file goes to `otherPlanFiles`.
pub fn get_phase_relevance_set(
    phases_dir: &Path,
    active_phase: f64,
    active_plan: u32,
) -> Result<(Vec<String>, Vec<String>), ParseFailure> {
    let mut active_plan_files: HashSet<String> = HashSet::new();
    let mut other_plan_files: HashSet<String> = HashSet::new();

    let entries = match std::fs::read_dir(phases_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), Vec::new()))
        }
        Err(e) => return Err(ParseFailure::io(phases_dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| ParseFailure::io(phases_dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(dir_phase) = phase_number_from_dir_name(dir_name) else {
            continue;
        };
        if (dir_phase - active_phase).abs() > f64::EPSILON {
            continue;
        }

        for file_entry in std::fs::read_dir(&path).map_err(|e| ParseFailure::io(&path, e))? {
            let file_entry = file_entry.map_err(|e| ParseFailure::io(&path, e))?;
            let file_path = file_entry.path();
            let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((plan_num, "PLAN")) = parse_plan_file_name(file_name) else {
                continue;
            };

            let summary_sibling = plan_summary_sibling(&path, plan_num);
            if summary_sibling.exists() {
                continue; // plan already completed
            }

            let text = std::fs::read_to_string(&file_path).map_err(|e| ParseFailure::io(&file_path, e))?;
            let plan_file = parse_plan_file(&text, dir_phase, plan_num);

            let target = if active_plan != 0 && plan_num == active_plan {
                &mut active_plan_files
            } else {
                &mut other_plan_files
            };
            target.extend(plan_file.files_modified);
        }
    }

    // Dedup: active wins over other.
    other_plan_files.retain(|f| !active_plan_files.contains(f));

    let mut active: Vec<String> = active_plan_files.into_iter().collect();
    let mut other: Vec<String> = other_plan_files.into_iter().collect();
    active.sort();
    other.sort();
    Ok((active, other))
}

fn bullet_list_under_field(text: &str, field: &str) -> Vec<String> {
    static FILE_LINE: OnceLock<Regex> = OnceLock::new();
    let file_pattern =
        FILE_LINE.get_or_init(|| Regex::new(r"(?m)^[-*]\s*(.+?)\s*$").expect("valid regex"));

    extract_field(text, field)
        .map(|block| {
            file_pattern
                .captures_iter(&block)
                .map(|c| c[1].trim().trim_matches('`').to_string())
                .filter(|f| !is_filtered_requirement(f))
                .collect()
        })
        .unwrap_or_default()
}

/// Up to 4 success criteria declared under a `**Success Criteria:**` /
/// `Success Criteria:` field in `STATE.md` (§4.7 "GSD section").
pub fn parse_success_criteria(text: &str) -> Vec<String> {
    bullet_list_under_field(text, "Success Criteria").into_iter().take(4).collect()
}

/// Up to 4 "must have" items declared under a `**Must Haves:**` field in the
/// active plan file.
pub fn parse_must_haves(text: &str) -> Vec<String> {
    bullet_list_under_field(text, "Must Haves").into_iter().take(4).collect()
}

/// Requirement completion `(complete, total)` from `REQUIREMENTS.md`'s
/// GitHub-style checkbox list (`- [x] ...` / `- [ ] ...`).
pub fn parse_requirement_status(text: &str) -> (u32, u32) {
    static CHECKBOX: OnceLock<Regex> = OnceLock::new();
    let pattern = CHECKBOX.get_or_init(|| Regex::new(r"(?mi)^[-*]\s*\[( |x|X)\]").expect("valid regex"));

    let mut complete = 0u32;
    let mut total = 0u32;
    for caps in pattern.captures_iter(text) {
        total += 1;
        if caps[1].eq_ignore_ascii_case("x") {
            complete += 1;
        }
    }
    (complete, total)
}

/// Total phase count declared in `ROADMAP.md`, read from the highest
/// `## Phase N` (or `**Phase N**`) heading found.
pub fn parse_total_phases(roadmap_text: &str) -> Option<u32> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    let pattern =
        HEADING.get_or_init(|| Regex::new(r"(?im)^#{1,3}\s*\*{0,2}Phase\s+(\d+)").expect("valid regex"));
    pattern
        .captures_iter(roadmap_text)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
}

/// Read `.planning/STATE.md` (and `.planning/ROADMAP.md` for `total_phases`)
/// into a `GsdState`. Returns `Ok(None)` when `STATE.md` is absent or
/// declares no parseable phase — GSD awareness is opportunistic, never
/// required (§1 Non-goals).
pub fn read_gsd_state(project_root: &Path) -> Result<Option<GsdState>, ParseFailure> {
    let state_path = crate::paths::planning_dir(project_root).join("STATE.md");
    let state_text = match std::fs::read_to_string(&state_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ParseFailure::io(&state_path, e)),
    };

    let Some((active_phase, active_plan)) = parse_state(&state_text) else {
        return Ok(None);
    };

    let roadmap_path = crate::paths::planning_dir(project_root).join("ROADMAP.md");
    let total_phases = std::fs::read_to_string(&roadmap_path).ok().and_then(|t| parse_total_phases(&t));

    Ok(Some(GsdState {
        active_phase,
        active_plan,
        total_phases,
        phase_goal: extract_field(&state_text, "Phase Goal").or_else(|| extract_field(&state_text, "Goal")),
        success_criteria: parse_success_criteria(&state_text),
    }))
}

/// Locate and read the active plan file's raw text, for `parse_must_haves`
/// (§4.7 "GSD section"). `None` when no phase directory or plan file
/// matches, or the plan is already complete.
pub fn read_active_plan_text(project_root: &Path, active_phase: f64, active_plan: u32) -> Option<String> {
    if active_plan == 0 {
        return None;
    }
    let phases_dir = crate::paths::phases_dir(project_root);
    let entries = std::fs::read_dir(&phases_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(dir_phase) = phase_number_from_dir_name(dir_name) else { continue };
        if (dir_phase - active_phase).abs() > f64::EPSILON {
            continue;
        }
        for file_entry in std::fs::read_dir(&path).ok()?.flatten() {
            let file_path = file_entry.path();
            let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some((plan_num, "PLAN")) = parse_plan_file_name(file_name) else { continue };
            if plan_num != active_plan {
                continue;
            }
            if plan_summary_sibling(&path, plan_num).exists() {
                return None;
            }
            return std::fs::read_to_string(&file_path).ok();
        }
    }
    None
}

/// `(complete, total)` from `.planning/REQUIREMENTS.md`, tolerating absence
/// (§4.11 "Requirement status").
pub fn read_requirement_status(project_root: &Path) -> Option<(u32, u32)> {
    let path = crate::paths::planning_dir(project_root).join("REQUIREMENTS.md");
    let text = std::fs::read_to_string(path).ok()?;
    Some(parse_requirement_status(&text))
}

fn plan_summary_sibling(phase_dir: &Path, plan_num: u32) -> PathBuf {
    // The summary file shares the plan file's `NN-` phase prefix; since we
    // only have the plan number here, scan for any matching `*-MM-SUMMARY.md`.
    if let Ok(entries) = std::fs::read_dir(phase_dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Some((num, "SUMMARY")) = parse_plan_file_name(name) {
                    if num == plan_num {
                        return entry.path();
                    }
                }
            }
        }
    }
    phase_dir.join(format!("__no-summary-{plan_num}__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_state_bold_field_form() {
        let text = "**Phase:** 3\n**Plan:** 2\n";
        assert_eq!(parse_state(text), Some((3.0, 2)));
    }

    #[test]
    fn parse_state_free_text_form() {
        let text = "Phase: 2.1\nPlan: 1\n";
        assert_eq!(parse_state(text), Some((2.1, 1)));
    }

    #[test]
    fn parse_state_handles_crlf() {
        let text = "**Phase:** 1\r\n**Plan:** 1\r\n";
        assert_eq!(parse_state(text), Some((1.0, 1)));
    }

    #[test]
    fn filters_none_tbd_na_requirements() {
        assert!(is_filtered_requirement("None"));
        assert!(is_filtered_requirement("TBD"));
        assert!(is_filtered_requirement("N/A"));
        assert!(!is_filtered_requirement("src/main.rs"));
    }

    #[test]
    fn phase_relevance_set_splits_active_and_other_and_dedups() {
        let tmp = tempfile::tempdir().unwrap();
        let phases = tmp.path().join("phases");
        let phase_dir = phases.join("3-add-feature");
        fs::create_dir_all(&phase_dir).unwrap();

        fs::write(
            phase_dir.join("03-01-PLAN.md"),
            "**Files Modified:**\n- `src/a.rs`\n- `src/shared.rs`\n",
        )
        .unwrap();
        fs::write(
            phase_dir.join("03-02-PLAN.md"),
            "**Files Modified:**\n- `src/b.rs`\n- `src/shared.rs`\n",
        )
        .unwrap();

        let (active, other) = get_phase_relevance_set(&phases, 3.0, 1).unwrap();
        assert!(active.contains(&"src/a.rs".to_string()));
        assert!(active.contains(&"src/shared.rs".to_string()));
        assert!(other.contains(&"src/b.rs".to_string()));
        assert!(!other.contains(&"src/shared.rs".to_string()));
    }

    #[test]
    fn completed_plan_is_excluded_via_summary_sibling() {
        let tmp = tempfile::tempdir().unwrap();
        let phases = tmp.path().join("phases");
        let phase_dir = phases.join("1-setup");
        fs::create_dir_all(&phase_dir).unwrap();
        fs::write(phase_dir.join("01-01-PLAN.md"), "**Files Modified:**\n- `src/done.rs`\n").unwrap();
        fs::write(phase_dir.join("01-01-SUMMARY.md"), "done").unwrap();

        let (active, other) = get_phase_relevance_set(&phases, 1.0, 1).unwrap();
        assert!(active.is_empty());
        assert!(other.is_empty());
    }

    #[test]
    fn active_plan_zero_routes_everything_to_other() {
        let tmp = tempfile::tempdir().unwrap();
        let phases = tmp.path().join("phases");
        let phase_dir = phases.join("2-x");
        fs::create_dir_all(&phase_dir).unwrap();
        fs::write(phase_dir.join("02-01-PLAN.md"), "**Files Modified:**\n- `src/x.rs`\n").unwrap();

        let (active, other) = get_phase_relevance_set(&phases, 2.0, 0).unwrap();
        assert!(active.is_empty());
        assert!(other.contains(&"src/x.rs".to_string()));
    }

    #[test]
    fn missing_phases_dir_returns_empty_sets() {
        let tmp = tempfile::tempdir().unwrap();
        let phases = tmp.path().join("does-not-exist");
        let (active, other) = get_phase_relevance_set(&phases, 1.0, 1).unwrap();
        assert!(active.is_empty());
        assert!(other.is_empty());
    }

    #[test]
    fn parse_success_criteria_caps_at_four() {
        let text = "**Success Criteria:**\n- one\n- two\n- three\n- four\n- five\n";
        let criteria = parse_success_criteria(text);
        assert_eq!(criteria.len(), 4);
        assert_eq!(criteria[0], "one");
        assert_eq!(criteria[3], "four");
    }

    #[test]
    fn parse_must_haves_reads_bullet_list() {
        let text = "**Must Haves:**\n- ship the thing\n- write tests\n";
        assert_eq!(parse_must_haves(text), vec!["ship the thing", "write tests"]);
    }

    #[test]
    fn parse_requirement_status_counts_checked_boxes() {
        let text = "- [x] done one\n- [X] done two\n- [ ] not yet\n- not a checkbox\n";
        assert_eq!(parse_requirement_status(text), (2, 3));
    }

    #[test]
    fn parse_total_phases_takes_max_heading() {
        let text = "## Phase 1: Setup\nsome text\n## Phase 3: Ship\nmore\n### Phase 2: Build\n";
        assert_eq!(parse_total_phases(text), Some(3));
    }

    #[test]
    fn parse_total_phases_none_when_no_headings() {
        assert_eq!(parse_total_phases("just some notes"), None);
    }

    #[test]
    fn read_gsd_state_none_when_state_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(read_gsd_state(tmp.path()).unwrap(), None);
    }

    #[test]
    fn read_gsd_state_assembles_full_struct() {
        let tmp = tempfile::tempdir().unwrap();
        let planning = tmp.path().join(".planning");
        fs::create_dir_all(&planning).unwrap();
        fs::write(
            planning.join("STATE.md"),
            "**Phase:** 2\n**Plan:** 1\n**Phase Goal:** ship the assembler\n**Success Criteria:**\n- builds context\n- stays under budget\n",
        )
        .unwrap();
        fs::write(
            planning.join("ROADMAP.md"),
            "## Phase 1: Setup\n## Phase 2: Build\n## Phase 4: Polish\n",
        )
        .unwrap();

        let state = read_gsd_state(tmp.path()).unwrap().unwrap();
        assert_eq!(state.active_phase, 2.0);
        assert_eq!(state.active_plan, 1);
        assert_eq!(state.total_phases, Some(4));
        assert_eq!(state.phase_goal.as_deref(), Some("ship the assembler"));
        assert_eq!(state.success_criteria, vec!["builds context", "stays under budget"]);
    }

    #[test]
    fn read_active_plan_text_finds_matching_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let phase_dir = tmp.path().join(".planning").join("phases").join("3-ship");
        fs::create_dir_all(&phase_dir).unwrap();
        fs::write(phase_dir.join("03-01-PLAN.md"), "**Must Haves:**\n- ship it\n").unwrap();

        let text = read_active_plan_text(tmp.path(), 3.0, 1).unwrap();
        assert!(text.contains("ship it"));
    }

    #[test]
    fn read_active_plan_text_none_for_completed_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let phase_dir = tmp.path().join(".planning").join("phases").join("1-setup");
        fs::create_dir_all(&phase_dir).unwrap();
        fs::write(phase_dir.join("01-01-PLAN.md"), "**Must Haves:**\n- done\n").unwrap();
        fs::write(phase_dir.join("01-01-SUMMARY.md"), "done").unwrap();

        assert!(read_active_plan_text(tmp.path(), 1.0, 1).is_none());
    }

    #[test]
    fn read_active_plan_text_none_when_plan_zero() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_active_plan_text(tmp.path(), 1.0, 0).is_none());
    }

    #[test]
    fn read_requirement_status_counts_checkboxes() {
        let tmp = tempfile::tempdir().unwrap();
        let planning = tmp.path().join(".planning");
        fs::create_dir_all(&planning).unwrap();
        fs::write(planning.join("REQUIREMENTS.md"), "- [x] one\n- [ ] two\n").unwrap();
        assert_eq!(read_requirement_status(tmp.path()), Some((1, 2)));
    }

    #[test]
    fn read_requirement_status_none_when_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(read_requirement_status(tmp.path()), None);
    }
}
