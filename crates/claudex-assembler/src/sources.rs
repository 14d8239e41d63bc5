// crates/claudex-assembler/src/sources.rs
//! `ContextSources`: everything the assembler consumes, gathered by the
//! caller before calling `assemble` (§4.7). This crate reads the store
//! through value copies only — it never holds a `claudex-db` handle.

use claudex_core::gsd::GsdState;
use claudex_types::{ConsensusDecision, Observation, ProjectScope, QueryResult, ReasoningChain};

/// One hit from a cross-table FTS sweep (observations/reasoning/consensus),
/// mirroring the store adapter's `search_all` shape so a caller's rows
/// convert over field-for-field.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub source: &'static str,
    pub title: String,
    pub timestamp_epoch_ms: i64,
}

/// Session-continuity material, present only when this assembly follows a
/// compaction (§4.7 priority list: "Session Continuity (post-compact only)").
#[derive(Debug, Clone, PartialEq)]
pub struct PostCompactionContext {
    pub summary: String,
    pub key_exchanges: Vec<(String, String)>,
}

/// Requirement completion as `(complete, total)`, surfaced from
/// `.planning/REQUIREMENTS.md` (§4.11).
pub type RequirementStatus = (u32, u32);

/// Everything the Context Assembler needs for one call. Every field is
/// optional or defaults to empty — the assembler tolerates absence of any
/// single input (§7 "written to tolerate null and empty from every input").
#[derive(Debug, Clone)]
pub struct ContextSources {
    pub identity: Option<String>,
    pub project_context: Option<String>,
    pub hologram: Option<QueryResult>,
    pub search_results: Vec<SearchHit>,
    pub recent_observations: Vec<Observation>,
    pub reasoning_chains: Vec<ReasoningChain>,
    pub consensus_decisions: Vec<ConsensusDecision>,
    pub gsd_state: Option<GsdState>,
    pub gsd_plan_must_haves: Vec<String>,
    pub gsd_requirement_status: Option<RequirementStatus>,
    pub scope: ProjectScope,
    pub post_compaction: Option<PostCompactionContext>,
}

impl ContextSources {
    /// An empty `ContextSources` scoped globally — a convenient base for
    /// callers to fill in only the fields a given hook actually has.
    pub fn empty(scope: ProjectScope) -> Self {
        Self {
            identity: None,
            project_context: None,
            hologram: None,
            search_results: Vec::new(),
            recent_observations: Vec::new(),
            reasoning_chains: Vec::new(),
            consensus_decisions: Vec::new(),
            gsd_state: None,
            gsd_plan_must_haves: Vec::new(),
            gsd_requirement_status: None,
            scope,
            post_compaction: None,
        }
    }
}
