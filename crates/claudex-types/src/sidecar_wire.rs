// crates/claudex-types/src/sidecar_wire.rs
//! Wire types for the sidecar TCP JSON protocol (§6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SidecarRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SidecarRequestKind,
    pub payload: SidecarRequestPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SidecarRequestKind {
    Query,
    Rescore,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidecarRequestPayload {
    pub prompt: Option<String>,
    pub session: String,
    pub recent_files: Vec<String>,
    pub boost_files: Vec<String>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarResponse {
    Result { id: String, payload: SidecarResultPayload },
    Error { id: String, error: String },
}

impl SidecarResponse {
    pub fn id(&self) -> &str {
        match self {
            Self::Result { id, .. } => id,
            Self::Error { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SidecarResultPayload {
    #[serde(default)]
    pub hot: Vec<ScoredFile>,
    #[serde(default)]
    pub warm: Vec<ScoredFile>,
    #[serde(default)]
    pub cold: Vec<ScoredFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoredFile {
    pub path: String,
    pub raw_pressure: f64,
    pub temperature: String,
    #[serde(default)]
    pub system_bucket: Option<String>,
    #[serde(default)]
    pub pressure_bucket: Option<String>,
    #[serde(default)]
    pub phase_boosted: bool,
}

/// Literal defaults used when the sidecar does not return a `raw_pressure`
/// per file — "preserved" per spec.md §9 Open Questions.
pub mod boost_pressure_defaults {
    pub const HOT: f64 = 0.9;
    pub const WARM: f64 = 0.5;
    pub const COLD: f64 = 0.1;
}

/// Which tier of the tiered query pipeline produced a result (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuerySource {
    Hologram,
    DbPressure,
    RecencyFallback,
}

impl QuerySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hologram => "hologram",
            Self::DbPressure => "db-pressure",
            Self::RecencyFallback => "recency-fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub hot: Vec<ScoredFile>,
    pub warm: Vec<ScoredFile>,
    pub cold: Vec<ScoredFile>,
    pub source: QuerySource,
}
