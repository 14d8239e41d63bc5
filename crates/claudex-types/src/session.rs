// crates/claudex-types/src/session.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub scope: SessionScope,
    pub cwd: String,
    pub started_at_epoch: i64,
    pub ended_at_epoch: Option<i64>,
    pub status: SessionStatus,
    pub observation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionScope {
    Global,
    Project(String),
}

impl SessionScope {
    pub fn project(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Project(p) => Some(p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Session-indexed checkpoint bookkeeping used by the post-compact active-file
/// boost (§4.6) and the structured checkpoint writer (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub session_id: String,
    pub active_files: Vec<String>,
    pub last_epoch: i64,
    pub boost_applied_at: Option<i64>,
    pub boost_turn_count: u8,
}

impl CheckpointState {
    pub const MAX_BOOST_TURNS: u8 = 3;
    pub const BOOST_WINDOW_MS: i64 = 30 * 60 * 1000;

    /// Whether `active_files` should be forwarded as `boost_files` on the next
    /// sidecar query (§4.6 "Post-compact active-file boost").
    pub fn is_boost_eligible(&self, now_epoch_ms: i64) -> bool {
        !self.active_files.is_empty()
            && (now_epoch_ms - self.last_epoch) < Self::BOOST_WINDOW_MS
            && self.boost_turn_count < Self::MAX_BOOST_TURNS
    }
}

/// File-backed per-session nudge bookkeeping for the Stop-event nudge policy
/// (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NudgeState {
    pub last_nudge_turn: u32,
    pub turn_count: u32,
    pub last_known_decision_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boost_eligible_requires_nonempty_recent_unspent() {
        let mut cp = CheckpointState {
            session_id: "s1".into(),
            active_files: vec!["a.rs".into()],
            last_epoch: 1_000_000,
            boost_applied_at: None,
            boost_turn_count: 0,
        };
        assert!(cp.is_boost_eligible(1_000_000 + 60_000));
        assert!(!cp.is_boost_eligible(1_000_000 + CheckpointState::BOOST_WINDOW_MS + 1));

        cp.boost_turn_count = 3;
        assert!(!cp.is_boost_eligible(1_000_000 + 60_000));

        cp.boost_turn_count = 0;
        cp.active_files.clear();
        assert!(!cp.is_boost_eligible(1_000_000 + 60_000));
    }
}
