// crates/claudex-assembler/src/sections.rs
//! Pure section renderers (§4.7). Each function turns already-fetched
//! source data into markdown; none of them touch the budget — that's
//! `assemble`'s job.

use crate::sources::{PostCompactionContext, RequirementStatus, SearchHit};
use crate::time::relative;
use claudex_core::gsd::GsdState;
use claudex_types::{ConsensusDecision, Observation, ProjectScope, ReasoningChain, ScoredFile};

/// Which collaborator a rendered section's content came from (§4.7 "Output").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Identity,
    Project,
    Hologram,
    Fts5,
    Recency,
    Reasoning,
    Consensus,
    Session,
    Gsd,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Project => "project",
            Self::Hologram => "hologram",
            Self::Fts5 => "fts5",
            Self::Recency => "recency",
            Self::Reasoning => "reasoning",
            Self::Consensus => "consensus",
            Self::Session => "session",
            Self::Gsd => "gsd",
        }
    }
}

fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_chars).collect();
    truncated.push('\u{2026}');
    truncated
}

pub fn render_header(scope: &ProjectScope) -> String {
    let scope_label = match scope {
        ProjectScope::Global => "global".to_string(),
        ProjectScope::Project(name) => name.clone(),
    };
    format!("# Context Memory\n_scope: {scope_label}_")
}

pub fn render_identity(identity: &str) -> String {
    format!("## Identity\n{identity}")
}

pub fn render_project(project_context: &str) -> String {
    format!("## Project\n{project_context}")
}

fn render_scored_file_line(file: &ScoredFile) -> String {
    let phase_marker = if file.phase_boosted { " [phase]" } else { "" };
    format!(
        "`{}` — {} (pressure: {:.2}){phase_marker}",
        file.path, file.temperature, file.raw_pressure
    )
}

/// Active Focus (§4.7 "HOT rendering") — always inline.
pub fn render_hot_section(hot: &[ScoredFile]) -> Option<String> {
    if hot.is_empty() {
        return None;
    }
    let mut out = String::from("## Active Focus\n");
    for file in hot {
        out.push_str(&render_scored_file_line(file));
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    Some(out)
}

/// GSD Project Phase (§4.7 "GSD section") — always inline.
pub fn render_gsd_section(
    state: &GsdState,
    must_haves: &[String],
    requirement_status: Option<RequirementStatus>,
) -> String {
    let mut out = String::from("## GSD Project Phase\n");

    match state.total_phases {
        Some(total) if total > 0 => {
            let percent = (state.active_phase / total as f64 * 100.0).round() as i64;
            out.push_str(&format!(
                "Phase {} of {total}, {percent}% complete\n",
                format_phase_number(state.active_phase)
            ));
        }
        _ => out.push_str(&format!("Phase {}\n", format_phase_number(state.active_phase))),
    }

    if let Some(goal) = &state.phase_goal {
        out.push_str(&format!("Goal: {goal}\n"));
    }

    if !state.success_criteria.is_empty() {
        out.push_str("Success criteria:\n");
        for criterion in state.success_criteria.iter().take(4) {
            out.push_str(&format!("- {}\n", truncate_with_ellipsis(criterion, 100)));
        }
    }

    if !must_haves.is_empty() {
        out.push_str("Must haves:\n");
        for item in must_haves.iter().take(4) {
            out.push_str(&format!("- {item}\n"));
        }
    }

    if let Some((complete, total)) = requirement_status {
        out.push_str(&format!("Requirements: {complete}/{total} complete\n"));
    }

    out.truncate(out.trim_end().len());
    out
}

fn format_phase_number(phase: f64) -> String {
    if (phase.fract()).abs() < f64::EPSILON {
        format!("{}", phase as i64)
    } else {
        format!("{phase}")
    }
}

/// Flow Reasoning — ref-eligible. `None` when there is nothing to show.
pub fn render_reasoning_section(chains: &[ReasoningChain], now_ms: i64) -> Option<(String, String)> {
    if chains.is_empty() {
        return None;
    }
    let mut inline = String::from("## Flow Reasoning\n");
    for chain in chains.iter().take(5) {
        inline.push_str(&format!(
            "- **{}** ({}): {}\n",
            chain.title,
            relative(now_ms, chain.timestamp_epoch_ms),
            truncate_with_ellipsis(&chain.reasoning, 200)
        ));
    }
    inline.truncate(inline.trim_end().len());

    let latest = &chains[0];
    let reference = format!(
        "## Flow Reasoning\n{} entries, latest: \"{}\" ({})",
        chains.len(),
        latest.title,
        relative(now_ms, latest.timestamp_epoch_ms)
    );
    Some((inline, reference))
}

/// Related Observations (FTS) — ref-eligible.
pub fn render_fts_section(hits: &[SearchHit], now_ms: i64) -> Option<(String, String)> {
    if hits.is_empty() {
        return None;
    }
    let mut inline = String::from("## Related Observations\n");
    for hit in hits.iter().take(8) {
        inline.push_str(&format!(
            "- [{}] {} ({})\n",
            hit.source,
            hit.title,
            relative(now_ms, hit.timestamp_epoch_ms)
        ));
    }
    inline.truncate(inline.trim_end().len());

    let latest = &hits[0];
    let reference = format!(
        "## Related Observations\n{} matches, latest: \"{}\" ({})",
        hits.len(),
        latest.title,
        relative(now_ms, latest.timestamp_epoch_ms)
    );
    Some((inline, reference))
}

/// Recent Activity — ref-eligible.
pub fn render_recent_activity_section(observations: &[Observation], now_ms: i64) -> Option<(String, String)> {
    if observations.is_empty() {
        return None;
    }
    let mut inline = String::from("## Recent Activity\n");
    for obs in observations.iter().take(8) {
        inline.push_str(&format!(
            "- [{}] {} ({})\n",
            obs.category.as_str(),
            obs.title,
            relative(now_ms, obs.timestamp_epoch_ms)
        ));
    }
    inline.truncate(inline.trim_end().len());

    let latest = &observations[0];
    let reference = format!(
        "## Recent Activity\n{} observations, latest: \"{}\" ({})",
        observations.len(),
        latest.title,
        relative(now_ms, latest.timestamp_epoch_ms)
    );
    Some((inline, reference))
}

/// Warm Context — ref-eligible. "warm ref lists the top file with pressure".
pub fn render_warm_section(warm: &[ScoredFile]) -> Option<(String, String)> {
    if warm.is_empty() {
        return None;
    }
    let mut inline = String::from("## Warm Context\n");
    for file in warm {
        inline.push_str(&render_scored_file_line(file));
        inline.push('\n');
    }
    inline.truncate(inline.trim_end().len());

    let top = &warm[0];
    let reference = if warm.len() > 1 {
        format!(
            "## Warm Context\ntop: `{}` (pressure: {:.2}), {} others",
            top.path,
            top.raw_pressure,
            warm.len() - 1
        )
    } else {
        format!("## Warm Context\ntop: `{}` (pressure: {:.2})", top.path, top.raw_pressure)
    };
    Some((inline, reference))
}

/// Consensus Decisions — ref-eligible.
pub fn render_consensus_section(decisions: &[ConsensusDecision], now_ms: i64) -> Option<(String, String)> {
    if decisions.is_empty() {
        return None;
    }
    let mut inline = String::from("## Consensus Decisions\n");
    for decision in decisions.iter().take(5) {
        inline.push_str(&format!(
            "- [{}] {} ({})\n",
            decision.status.as_str(),
            decision.title,
            relative(now_ms, decision.timestamp_epoch_ms)
        ));
    }
    inline.truncate(inline.trim_end().len());

    let latest = &decisions[0];
    let reference = format!(
        "## Consensus Decisions\n{} decisions, latest: \"{}\" ({})",
        decisions.len(),
        latest.title,
        relative(now_ms, latest.timestamp_epoch_ms)
    );
    Some((inline, reference))
}

/// Session Continuity — post-compact only, always inline.
pub fn render_session_continuity(ctx: &PostCompactionContext) -> String {
    let mut out = format!("## Session Continuity\n{}\n", ctx.summary);
    if !ctx.key_exchanges.is_empty() {
        out.push_str("Key exchanges:\n");
        for (role, gist) in &ctx.key_exchanges {
            out.push_str(&format!("- **{role}**: {gist}\n"));
        }
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_with_ellipsis_respects_boundary() {
        assert_eq!(truncate_with_ellipsis("short", 100), "short");
        let long = "a".repeat(150);
        let truncated = truncate_with_ellipsis(&long, 100);
        assert_eq!(truncated.chars().count(), 101);
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn hot_section_renders_phase_marker_only_when_boosted() {
        let files = vec![ScoredFile {
            path: "src/a.rs".to_string(),
            raw_pressure: 0.91,
            temperature: "HOT".to_string(),
            system_bucket: None,
            pressure_bucket: None,
            phase_boosted: true,
        }];
        let section = render_hot_section(&files).unwrap();
        assert!(section.contains("[phase]"));
        assert!(section.contains("0.91"));
    }

    #[test]
    fn hot_section_none_when_empty() {
        assert!(render_hot_section(&[]).is_none());
    }

    #[test]
    fn gsd_section_renders_percent_and_criteria() {
        let state = GsdState {
            active_phase: 2.0,
            active_plan: 1,
            total_phases: Some(4),
            phase_goal: Some("ship it".to_string()),
            success_criteria: vec!["one".to_string(), "two".to_string()],
        };
        let rendered = render_gsd_section(&state, &[], None);
        assert!(rendered.contains("Phase 2 of 4, 50% complete"));
        assert!(rendered.contains("ship it"));
        assert!(rendered.contains("- one"));
    }

    #[test]
    fn warm_reference_lists_only_top_file() {
        let warm = vec![
            ScoredFile {
                path: "a.rs".to_string(),
                raw_pressure: 0.5,
                temperature: "WARM".to_string(),
                system_bucket: None,
                pressure_bucket: None,
                phase_boosted: false,
            },
            ScoredFile {
                path: "b.rs".to_string(),
                raw_pressure: 0.4,
                temperature: "WARM".to_string(),
                system_bucket: None,
                pressure_bucket: None,
                phase_boosted: false,
            },
        ];
        let (_, reference) = render_warm_section(&warm).unwrap();
        assert!(reference.contains("a.rs"));
        assert!(!reference.contains("b.rs"));
        assert!(reference.contains("1 others"));
    }
}
