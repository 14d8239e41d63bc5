// crates/claudex-types/src/pressure.rs
use serde::{Deserialize, Serialize};

/// A file's inferred working-set relevance, in `[0, 1]`, with a discrete
/// temperature classification.
///
/// Uniquely keyed by `(file_path, project)`. `HOT ⇔ raw_pressure ≥ 0.7`,
/// `WARM ⇔ 0.3 ≤ raw_pressure < 0.7`, `COLD ⇔ raw_pressure < 0.3` — this
/// invariant is restored by `Temperature::classify` after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureScore {
    pub file_path: String,
    pub project: String,
    pub raw_pressure: f64,
    pub temperature: Temperature,
    pub decay_rate: f64,
    pub last_accessed_epoch: i64,
    pub last_decay_epoch: Option<i64>,
    /// Set by phase-boost (§4.4) when a multiplier > 1.0 was applied this query.
    /// Not persisted — recomputed per query, never written back to the store.
    #[serde(default)]
    pub phase_boosted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Temperature {
    Hot,
    Warm,
    Cold,
}

impl Temperature {
    pub const HOT_THRESHOLD: f64 = 0.7;
    pub const WARM_THRESHOLD: f64 = 0.3;

    /// Classify a raw pressure value per the HOT/WARM/COLD thresholds in §3.
    pub fn classify(raw_pressure: f64) -> Self {
        if raw_pressure >= Self::HOT_THRESHOLD {
            Self::Hot
        } else if raw_pressure >= Self::WARM_THRESHOLD {
            Self::Warm
        } else {
            Self::Cold
        }
    }

    /// `decay_rate ∈ {0.01, 0.05}` — COLD decays slower than HOT/WARM (§4.3).
    pub fn default_decay_rate(&self) -> f64 {
        match self {
            Self::Cold => 0.01,
            Self::Hot | Self::Warm => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "HOT",
            Self::Warm => "WARM",
            Self::Cold => "COLD",
        }
    }
}

impl std::str::FromStr for Temperature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOT" => Ok(Self::Hot),
            "WARM" => Ok(Self::Warm),
            "COLD" => Ok(Self::Cold),
            other => Err(format!("unknown temperature: {other}")),
        }
    }
}

/// Clamp a raw pressure value into `[0, 1]`, as required after every update.
pub fn clamp_pressure(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
