// crates/claudex-core/src/decision.rs
//! Transcript tail parsing, approval/choice/rejection detection, and the
//! Stop-event nudge policy (§4.10, component C10).

use claudex_types::NudgeState;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Tail bytes read from the transcript file before parsing. The first line
/// of that window may be a partial JSON object (cut mid-line) and is
/// silently skipped.
pub const TRANSCRIPT_TAIL_BYTES: usize = 10 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptSignals {
    pub file_modify_count: u32,
    pub tool_actions: Vec<ToolAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolAction {
    pub name: String,
    pub target: Option<String>,
}

/// Parse the tail window of a line-buffered JSON transcript into signals.
/// Lines that fail to parse as JSON (including a truncated first line) are
/// skipped rather than treated as an error — transcript tails are always
/// best-effort input.
pub fn parse_transcript_tail(tail: &str) -> TranscriptSignals {
    let mut signals = TranscriptSignals::default();
    let mut lines = tail.lines();
    lines.next(); // first line may be partial; always skip

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
            if item.get("type").and_then(|t| t.as_str()) != Some("tool_use") {
                continue;
            }
            let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            let target = item
                .pointer("/input/file_path")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            if matches!(name, "Write" | "Edit" | "Bash") {
                signals.file_modify_count += 1;
            }
            signals.tool_actions.push(ToolAction {
                name: name.to_string(),
                target,
            });
        }
    }
    signals
}

fn test_command_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)test|jest|vitest|pytest").expect("valid regex"))
}

/// `extractAssistantGist` — ≤100 char summary, priority edits > writes >
/// reads > bash > other, deduped by target file name.
pub fn extract_assistant_gist(signals: &TranscriptSignals) -> String {
    let mut parts = Vec::new();

    let mut edited: Vec<&str> = Vec::new();
    let mut written: Vec<&str> = Vec::new();
    let mut read: Vec<&str> = Vec::new();
    let mut bash_count = 0usize;
    let mut bash_is_test = false;
    let mut other_count = 0usize;

    for action in &signals.tool_actions {
        match action.name.as_str() {
            "Edit" => {
                if let Some(t) = &action.target {
                    if !edited.contains(&t.as_str()) {
                        edited.push(t);
                    }
                }
            }
            "Write" => {
                if let Some(t) = &action.target {
                    if !written.contains(&t.as_str()) {
                        written.push(t);
                    }
                }
            }
            "Read" => {
                if let Some(t) = &action.target {
                    if !read.contains(&t.as_str()) {
                        read.push(t);
                    }
                }
            }
            "Bash" => {
                bash_count += 1;
                if let Some(t) = &action.target {
                    if test_command_pattern().is_match(t) {
                        bash_is_test = true;
                    }
                }
            }
            _ => other_count += 1,
        }
    }

    if !edited.is_empty() {
        parts.push(format!("Edited {}", edited.join(", ")));
    }
    if !written.is_empty() {
        parts.push(format!("Wrote {}", written.join(", ")));
    }
    if !read.is_empty() {
        parts.push(format!("Read {}", read.join(", ")));
    }
    if bash_count > 0 {
        parts.push(if bash_is_test {
            "Ran tests".to_string()
        } else {
            format!("Ran {bash_count} commands")
        });
    }
    if other_count > 0 {
        parts.push(format!("{other_count} other actions"));
    }

    let joined = parts.join("; ");
    truncate_with_ellipsis(&joined, 100)
}

fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn approval_allowlist() -> &'static [&'static str] {
    &[
        "yes", "ok", "okay", "lgtm", "goahead", "soundsgood", "approved", "yep", "yeah", "sure",
        "correct", "perfect", "great", "doit", "shipit", "confirmed",
    ]
}

fn normalize_for_approval(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
}

/// `detectApproval` — whitespace/punctuation-stripped, lowercased text must
/// be exactly one of a small closed allowlist.
pub fn detect_approval(text: &str) -> bool {
    let normalized = normalize_for_approval(text);
    approval_allowlist().contains(&normalized.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSignalType {
    Approval,
    Choice,
    Rejection,
}

fn choice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(let's go with|i'll choose|option [a-z0-9]+|instead of|rather than)\b")
            .expect("valid regex")
    })
}

fn rejection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(no[,.]|nope|don't|stop|undo that|revert|not that|wrong)\b").expect("valid regex")
    })
}

/// `detectDecisionSignal` — tiered regex: approval check first (exact-match,
/// cheapest), then rejection, then choice.
pub fn detect_decision_signal(text: &str) -> Option<DecisionSignalType> {
    if detect_approval(text) {
        return Some(DecisionSignalType::Approval);
    }
    if rejection_pattern().is_match(text) {
        return Some(DecisionSignalType::Rejection);
    }
    if choice_pattern().is_match(text) {
        return Some(DecisionSignalType::Choice);
    }
    None
}

const NUDGE_RATE_LIMIT_TURNS: u32 = 5;
const NUDGE_FILE_MODIFY_THRESHOLD: u32 = 2;

/// Stop-event nudge policy (§4.10). Returns the nudge message when one
/// should fire, along with the updated state the caller must persist.
pub fn apply_nudge_policy(
    mut state: NudgeState,
    file_modify_count: u32,
    decision_count: u32,
) -> (NudgeState, Option<&'static str>) {
    state.turn_count += 1;

    let rate_limited = state.last_nudge_turn > 0
        && (state.turn_count - state.last_nudge_turn) < NUDGE_RATE_LIMIT_TURNS;

    let mut nudge = None;
    if !rate_limited
        && file_modify_count >= NUDGE_FILE_MODIFY_THRESHOLD
        && decision_count <= state.last_known_decision_count
    {
        nudge = Some("Consider recording the decisions behind these changes.");
        state.last_nudge_turn = state.turn_count;
    }

    state.last_known_decision_count = decision_count;
    (state, nudge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_partial_first_line() {
        let tail = "{broken\n{\"message\":{\"content\":[{\"type\":\"tool_use\",\"name\":\"Read\",\"input\":{\"file_path\":\"a.rs\"}}]}}\n";
        let signals = parse_transcript_tail(tail);
        assert_eq!(signals.tool_actions.len(), 1);
    }

    #[test]
    fn counts_file_modify_tools() {
        let tail = "partial\n{\"message\":{\"content\":[{\"type\":\"tool_use\",\"name\":\"Write\",\"input\":{\"file_path\":\"a.rs\"}},{\"type\":\"tool_use\",\"name\":\"Bash\",\"input\":{}}]}}\n";
        let signals = parse_transcript_tail(tail);
        assert_eq!(signals.file_modify_count, 2);
    }

    #[test]
    fn gist_prioritizes_edits_over_reads() {
        let signals = TranscriptSignals {
            file_modify_count: 1,
            tool_actions: vec![
                ToolAction { name: "Read".to_string(), target: Some("a.rs".to_string()) },
                ToolAction { name: "Edit".to_string(), target: Some("b.rs".to_string()) },
            ],
        };
        let gist = extract_assistant_gist(&signals);
        assert!(gist.starts_with("Edited b.rs"));
    }

    #[test]
    fn gist_detects_test_commands() {
        let signals = TranscriptSignals {
            file_modify_count: 1,
            tool_actions: vec![ToolAction {
                name: "Bash".to_string(),
                target: Some("pytest tests/".to_string()),
            }],
        };
        assert_eq!(extract_assistant_gist(&signals), "Ran tests");
    }

    #[test]
    fn detect_approval_exact_match_only() {
        assert!(detect_approval("LGTM!"));
        assert!(detect_approval("sounds good"));
        assert!(!detect_approval("yes but wait"));
    }

    #[test]
    fn detect_decision_signal_tiers() {
        assert_eq!(detect_decision_signal("lgtm"), Some(DecisionSignalType::Approval));
        assert_eq!(detect_decision_signal("no, don't do that"), Some(DecisionSignalType::Rejection));
        assert_eq!(detect_decision_signal("let's go with option a"), Some(DecisionSignalType::Choice));
        assert_eq!(detect_decision_signal("the sky is blue"), None);
    }

    #[test]
    fn nudge_policy_rate_limits_within_five_turns() {
        let state = NudgeState::default();
        let (state, nudge) = apply_nudge_policy(state, 3, 0);
        assert!(nudge.is_some());
        assert_eq!(state.last_nudge_turn, 1);

        let (state2, nudge2) = apply_nudge_policy(state, 3, 0);
        assert!(nudge2.is_none());
        assert_eq!(state2.turn_count, 2);
    }

    #[test]
    fn nudge_policy_skips_when_decisions_keep_pace() {
        let state = NudgeState::default();
        let (_, nudge) = apply_nudge_policy(state, 3, 1);
        assert!(nudge.is_none());
    }
}
