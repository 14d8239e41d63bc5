// crates/claudex-types/src/observation.rs
use serde::{Deserialize, Serialize};

/// A compact, normalized record of one tool invocation, produced by the
/// Observation Extractor and persisted by the Store Adapter.
///
/// Immutable after write except for `access_count`, `last_accessed_epoch`,
/// and `deleted_at_epoch` (soft delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub session_id: String,
    pub project: Option<String>,
    pub timestamp_epoch_ms: i64,
    pub tool_name: String,
    pub category: ObservationCategory,
    pub title: String,
    pub content: String,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub importance: u8,
    pub access_count: u32,
    pub last_accessed_epoch: Option<i64>,
    pub deleted_at_epoch: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCategory {
    Discovery,
    Change,
    Feature,
    Bugfix,
    Configuration,
    Error,
}

impl ObservationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Change => "change",
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Configuration => "configuration",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for ObservationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Self::Discovery),
            "change" => Ok(Self::Change),
            "feature" => Ok(Self::Feature),
            "bugfix" => Ok(Self::Bugfix),
            "configuration" => Ok(Self::Configuration),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown observation category: {other}")),
        }
    }
}

/// A newly-produced observation, not yet assigned an id or access metadata.
/// Returned by the Observation Extractor, consumed by `Database::store_observation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub session_id: String,
    pub project: Option<String>,
    pub timestamp_epoch_ms: i64,
    pub tool_name: String,
    pub category: ObservationCategory,
    pub title: String,
    pub content: String,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub importance: u8,
}

/// The "__global__" sentinel used for pressure rows that have no project,
/// chosen because `UNIQUE(file_path, project)` forbids NULL in that position.
pub const GLOBAL_PROJECT_SENTINEL: &str = "__global__";

/// Scope a query or write against a project, or the cross-project global bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectScope {
    Global,
    Project(String),
}

impl ProjectScope {
    /// The value stored in the `project` column for pressure rows, which use
    /// the sentinel instead of NULL.
    pub fn pressure_column_value(&self) -> &str {
        match self {
            Self::Global => GLOBAL_PROJECT_SENTINEL,
            Self::Project(p) => p,
        }
    }

    /// The value stored in the `project` column for observations/reasoning/
    /// consensus rows, which use NULL for global scope.
    pub fn observation_column_value(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Project(p) => Some(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            ObservationCategory::Discovery,
            ObservationCategory::Change,
            ObservationCategory::Feature,
            ObservationCategory::Bugfix,
            ObservationCategory::Configuration,
            ObservationCategory::Error,
        ] {
            let s = cat.as_str();
            let parsed: ObservationCategory = s.parse().unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn project_scope_uses_sentinel_only_for_pressure() {
        let global = ProjectScope::Global;
        assert_eq!(global.pressure_column_value(), GLOBAL_PROJECT_SENTINEL);
        assert_eq!(global.observation_column_value(), None);

        let scoped = ProjectScope::Project("crate-x".to_string());
        assert_eq!(scoped.pressure_column_value(), "crate-x");
        assert_eq!(scoped.observation_column_value(), Some("crate-x"));
    }
}
