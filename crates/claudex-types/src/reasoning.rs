// crates/claudex-types/src/reasoning.rs
use serde::{Deserialize, Serialize};

/// An append-only record of the assistant's reasoning at a trigger point
/// (usually pre-compaction), captured by the Flush/Checkpoint Orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    pub id: i64,
    pub session_id: String,
    pub project: Option<String>,
    pub timestamp_epoch_ms: i64,
    pub trigger: ReasoningTrigger,
    pub title: String,
    pub reasoning: String,
    pub importance: u8,
    pub decisions: Vec<String>,
    pub files_involved: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningTrigger {
    PreCompact,
    Manual,
    SessionEnd,
}

impl ReasoningTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCompact => "pre_compact",
            Self::Manual => "manual",
            Self::SessionEnd => "session_end",
        }
    }
}

impl std::str::FromStr for ReasoningTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_compact" => Ok(Self::PreCompact),
            "manual" => Ok(Self::Manual),
            "session_end" => Ok(Self::SessionEnd),
            other => Err(format!("unknown reasoning trigger: {other}")),
        }
    }
}

/// An append-only record of a decision surfaced by the Decision/Thread
/// Detector or recorded explicitly by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub id: i64,
    pub session_id: String,
    pub project: Option<String>,
    pub timestamp_epoch_ms: i64,
    pub title: String,
    pub description: String,
    pub status: DecisionStatus,
    pub positions: Option<String>,
    pub verdict: Option<String>,
    pub tags: Vec<String>,
    pub files_affected: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Proposed,
    Agreed,
    Rejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Agreed => "agreed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for DecisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "agreed" => Ok(Self::Agreed),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown decision status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reasoning_trigger_round_trips() {
        for t in [ReasoningTrigger::PreCompact, ReasoningTrigger::Manual, ReasoningTrigger::SessionEnd] {
            assert_eq!(ReasoningTrigger::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn decision_status_round_trips() {
        for s in [DecisionStatus::Proposed, DecisionStatus::Agreed, DecisionStatus::Rejected] {
            assert_eq!(DecisionStatus::from_str(s.as_str()).unwrap(), s);
        }
    }
}
