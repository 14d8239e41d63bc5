// crates/claudex-assembler/src/assemble.rs
//! The priority-ordered, token-budgeted assembly pass (§4.7).

use crate::sections::{self, SourceTag};
use crate::sources::ContextSources;
use crate::tokens;
use claudex_core::redactor::redact_assembly_output;
use claudex_types::QuerySource;
use serde::Serialize;

/// Below this many tokens of remaining budget, a ref-eligible section (and
/// every later ref-eligible section) switches to its compact reference form
/// instead of its full inline rendering (§4.7 "Two-mode rendering").
const REFERENCE_SWITCH_THRESHOLD: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    pub markdown: String,
    pub token_estimate: usize,
    pub sources: Vec<String>,
}

/// One rendered section.
#[derive(Debug, Clone)]
struct Slot {
    tag: Option<SourceTag>,
    text: String,
    cost: usize,
}

impl Slot {
    fn new(tag: Option<SourceTag>, text: String) -> Self {
        let cost = tokens::estimate(&text);
        Self { tag, text, cost }
    }

    fn empty() -> Self {
        Self { tag: None, text: String::new(), cost: 0 }
    }
}

/// Which tag a hologram-derived section should be attributed to, per the
/// tier that actually produced the data (§4.7 "Output").
fn hologram_tag(source: QuerySource) -> SourceTag {
    match source {
        QuerySource::Hologram | QuerySource::DbPressure => SourceTag::Hologram,
        QuerySource::RecencyFallback => SourceTag::Recency,
    }
}

/// Decide whether a ref-eligible section fits as a `Slot` within `budget`,
/// applying the two-mode switch rule. `content` is `None` when the section
/// has nothing to show. Returns `Slot::empty()` when neither form fits.
fn place_switchable(
    tag: Option<SourceTag>,
    content: Option<(String, String)>,
    budget: usize,
    ref_mode: &mut bool,
) -> Slot {
    let Some((inline, reference)) = content else {
        return Slot::empty();
    };

    if !*ref_mode {
        let inline_cost = tokens::estimate(&inline);
        if (budget as i64) - (inline_cost as i64) < REFERENCE_SWITCH_THRESHOLD as i64 {
            *ref_mode = true;
        }
    }

    let text = if *ref_mode { reference } else { inline };
    let slot = Slot::new(tag, text);
    if slot.cost <= budget {
        slot
    } else {
        Slot::empty()
    }
}

/// Place an always-inline section: included only if it fits under the
/// remaining budget, never downgraded to a reference form (§4.7).
fn place_always_inline(tag: Option<SourceTag>, text: Option<String>, budget: usize) -> Slot {
    let Some(text) = text else {
        return Slot::empty();
    };
    let slot = Slot::new(tag, text);
    if slot.cost <= budget {
        slot
    } else {
        Slot::empty()
    }
}

/// `assemble` (§4.7): build the injected context block from `sources` within
/// `max_tokens`, honoring the token-budget invariant (§8
/// "tokenEstimate(out) ≤ maxTokens for every assembler call").
pub fn assemble(sources: &ContextSources, max_tokens: usize, now_epoch_ms: i64) -> AssembledContext {
    // Slot order is fixed to the priority list (§4.7):
    // Header, Identity, Project, Active Focus, GSD, Flow Reasoning,
    // Related Observations (FTS), Recent Activity, Warm Context,
    // Consensus Decisions, Session Continuity.
    let mut remaining = max_tokens;
    let mut ref_mode = false;

    let header = place_always_inline(None, Some(sections::render_header(&sources.scope)), remaining);
    remaining = remaining.saturating_sub(header.cost);

    let identity = place_always_inline(
        Some(SourceTag::Identity),
        sources.identity.as_deref().map(sections::render_identity),
        remaining,
    );
    remaining = remaining.saturating_sub(identity.cost);

    let project = place_always_inline(
        Some(SourceTag::Project),
        sources.project_context.as_deref().map(sections::render_project),
        remaining,
    );
    remaining = remaining.saturating_sub(project.cost);

    let hot_tag = sources.hologram.as_ref().map(|r| hologram_tag(r.source));
    let hot_text = sources.hologram.as_ref().and_then(|r| sections::render_hot_section(&r.hot));
    let hot = place_always_inline(hot_tag, hot_text, remaining);
    remaining = remaining.saturating_sub(hot.cost);

    let gsd_text = sources.gsd_state.as_ref().map(|state| {
        sections::render_gsd_section(state, &sources.gsd_plan_must_haves, sources.gsd_requirement_status)
    });
    let gsd = place_always_inline(Some(SourceTag::Gsd), gsd_text, remaining);
    remaining = remaining.saturating_sub(gsd.cost);

    let reasoning_content = sections::render_reasoning_section(&sources.reasoning_chains, now_epoch_ms);
    let reasoning =
        place_switchable(Some(SourceTag::Reasoning), reasoning_content, remaining, &mut ref_mode);
    remaining = remaining.saturating_sub(reasoning.cost);

    // Search reservation (§4.7): peek at Related Observations' cheapest
    // (reference) form and hold that many tokens back from Warm Context's
    // budget, so a generous Warm Context can never starve a search hit out
    // of even its compact reference line. FTS itself is placed first, at
    // full remaining budget — HOT and Identity were already placed above
    // and are never revisited.
    let fts_content = sections::render_fts_section(&sources.search_results, now_epoch_ms);
    let fts_reserve = fts_content
        .as_ref()
        .map(|(_, reference)| tokens::estimate(reference))
        .unwrap_or(0);
    let fts = place_switchable(Some(SourceTag::Fts5), fts_content, remaining, &mut ref_mode);
    remaining = remaining.saturating_sub(fts.cost);

    let recent_content = sections::render_recent_activity_section(&sources.recent_observations, now_epoch_ms);
    let recent = place_switchable(None, recent_content, remaining, &mut ref_mode);
    remaining = remaining.saturating_sub(recent.cost);

    let warm_tag = sources.hologram.as_ref().map(|r| hologram_tag(r.source));
    let warm_content = sources.hologram.as_ref().and_then(|r| sections::render_warm_section(&r.warm));
    let warm_budget = remaining.saturating_sub(fts_reserve);
    let warm = place_switchable(warm_tag, warm_content, warm_budget, &mut ref_mode);
    remaining = remaining.saturating_sub(warm.cost);

    let consensus_content = sections::render_consensus_section(&sources.consensus_decisions, now_epoch_ms);
    let consensus = place_switchable(Some(SourceTag::Consensus), consensus_content, remaining, &mut ref_mode);
    remaining = remaining.saturating_sub(consensus.cost);

    let session_text = sources.post_compaction.as_ref().map(sections::render_session_continuity);
    let session = place_always_inline(Some(SourceTag::Session), session_text, remaining);

    let slots = [header, identity, project, hot, gsd, reasoning, fts, recent, warm, consensus, session];

    let mut tags: Vec<&'static str> = Vec::new();
    let mut parts: Vec<&str> = Vec::new();
    for slot in &slots {
        if slot.text.is_empty() {
            continue;
        }
        parts.push(&slot.text);
        if let Some(tag) = slot.tag {
            let s = tag.as_str();
            if !tags.contains(&s) {
                tags.push(s);
            }
        }
    }

    let markdown = redact_assembly_output(&parts.join("\n\n"));
    let token_estimate = tokens::estimate(&markdown);

    AssembledContext {
        markdown,
        token_estimate,
        sources: tags.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SearchHit;
    use claudex_types::{ProjectScope, QueryResult, ScoredFile};

    fn scored(path: &str, raw: f64, hot: bool, phase_boosted: bool) -> ScoredFile {
        ScoredFile {
            path: path.to_string(),
            raw_pressure: raw,
            temperature: if hot { "HOT".to_string() } else { "WARM".to_string() },
            system_bucket: None,
            pressure_bucket: None,
            phase_boosted,
        }
    }

    #[test]
    fn empty_sources_produce_header_only() {
        let sources = ContextSources::empty(ProjectScope::Global);
        let result = assemble(&sources, 10_000, 1_000_000);
        assert!(result.markdown.contains("Context Memory"));
        assert!(result.sources.is_empty());
        assert!(result.token_estimate <= 10_000);
    }

    #[test]
    fn never_exceeds_max_tokens_even_when_starved() {
        let mut sources = ContextSources::empty(ProjectScope::Project("demo".to_string()));
        sources.identity = Some("a".repeat(2000));
        sources.project_context = Some("b".repeat(2000));
        sources.hologram = Some(QueryResult {
            hot: vec![scored("hot.rs", 0.9, true, false)],
            warm: vec![scored("warm.rs", 0.5, false, false)],
            cold: vec![],
            source: QuerySource::Hologram,
        });
        sources.search_results = vec![SearchHit {
            source: "observation",
            title: "found something".to_string(),
            timestamp_epoch_ms: 900_000,
        }];

        let result = assemble(&sources, 50, 1_000_000);
        assert!(result.token_estimate <= 50);
    }

    #[test]
    fn hot_files_and_gsd_are_always_inline() {
        let mut sources = ContextSources::empty(ProjectScope::Global);
        sources.hologram = Some(QueryResult {
            hot: vec![scored("a.rs", 0.95, true, true)],
            warm: vec![],
            cold: vec![],
            source: QuerySource::Hologram,
        });
        let result = assemble(&sources, 10_000, 1_000_000);
        assert!(result.markdown.contains("Active Focus"));
        assert!(result.markdown.contains("[phase]"));
        assert!(result.sources.contains(&"hologram".to_string()));
    }

    #[test]
    fn search_reservation_lets_fts_win_a_slot_over_a_large_warm_section() {
        let mut sources = ContextSources::empty(ProjectScope::Global);
        sources.hologram = Some(QueryResult {
            hot: vec![],
            warm: (0..40)
                .map(|i| scored(&format!("warm-{i}.rs"), 0.4, false, false))
                .collect(),
            cold: vec![],
            source: QuerySource::Hologram,
        });
        sources.search_results = vec![SearchHit {
            source: "observation",
            title: "a critical fix".to_string(),
            timestamp_epoch_ms: 900_000,
        }];

        // Budget large enough for the header plus a small slice, but too
        // small to fit Warm Context's full inline listing alongside FTS.
        let result = assemble(&sources, 400, 1_000_000);
        assert!(result.token_estimate <= 400);
        assert!(result.markdown.contains("a critical fix"));
        assert!(result.sources.contains(&"fts5".to_string()));
    }

    #[test]
    fn recency_fallback_tags_as_recency_not_hologram() {
        let mut sources = ContextSources::empty(ProjectScope::Global);
        sources.hologram = Some(QueryResult {
            hot: vec![],
            warm: vec![],
            cold: vec![scored("recent.rs", 0.1, false, false)],
            source: QuerySource::RecencyFallback,
        });
        let result = assemble(&sources, 10_000, 1_000_000);
        assert!(!result.sources.contains(&"hologram".to_string()));
    }
}
