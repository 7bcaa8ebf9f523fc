// crates/core/src/types.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fallback run length when a stat file carries no usable start time.
pub const DEFAULT_RUN_DURATION_SECS: f64 = 60.0;

/// Achievement band awarded from a run's percentile standing within its combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankTier {
    Singularity,
    Arcadia,
    Uber,
    Exalted,
    Blessed,
    Transmute,
}

impl RankTier {
    /// All tiers, highest threshold first.
    pub const ALL: [RankTier; 6] = [
        RankTier::Singularity,
        RankTier::Arcadia,
        RankTier::Uber,
        RankTier::Exalted,
        RankTier::Blessed,
        RankTier::Transmute,
    ];

    /// Minimum runs on a combo before a gated tier can be awarded.
    pub const GATE_MIN_RUNS: usize = 10;

    /// Minimum percentile (inclusive) required for this tier.
    pub fn threshold(self) -> f64 {
        match self {
            RankTier::Singularity => 100.0,
            RankTier::Arcadia => 95.0,
            RankTier::Uber => 90.0,
            RankTier::Exalted => 82.0,
            RankTier::Blessed => 75.0,
            RankTier::Transmute => 55.0,
        }
    }

    /// The top three tiers need [`Self::GATE_MIN_RUNS`] runs on the combo.
    pub fn is_gated(self) -> bool {
        matches!(
            self,
            RankTier::Singularity | RankTier::Arcadia | RankTier::Uber
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            RankTier::Singularity => "SINGULARITY",
            RankTier::Arcadia => "ARCADIA",
            RankTier::Uber => "UBER",
            RankTier::Exalted => "EXALTED",
            RankTier::Blessed => "BLESSED",
            RankTier::Transmute => "TRANSMUTE",
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sensitivity value usable as a map key.
///
/// Equality and hashing use the bit pattern, ordering uses `total_cmp`, so
/// the three agree with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensKey(pub f64);

impl PartialEq for SensKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for SensKey {}

impl Hash for SensKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for SensKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SensKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for SensKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cm", self.0)
    }
}

/// A (Scenario, Sensitivity) pair, the granularity of most PB/rank statistics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComboKey {
    pub scenario: String,
    pub sens: SensKey,
}

/// Identity of a run across the whole history: (Scenario, Sens, Timestamp, Score).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    scenario: String,
    sens: SensKey,
    timestamp: NaiveDateTime,
    score_bits: u64,
}

/// One completed scenario attempt.
///
/// Created by the stat file parser; `session_id` is filled in by the session
/// segmenter and the flag/rank fields by [`crate::ranks::enrich`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub scenario: String,
    pub sens: f64,
    pub score: f64,
    pub timestamp: NaiveDateTime,
    /// Seconds.
    pub duration: f64,
    #[serde(default)]
    pub session_id: u32,
    #[serde(default)]
    pub is_pb: bool,
    #[serde(default)]
    pub is_scen_pb: bool,
    #[serde(default)]
    pub is_first: bool,
    /// Tiers earned, highest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranks: Vec<RankTier>,
}

impl Run {
    pub fn new(scenario: impl Into<String>, sens: f64, score: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            scenario: scenario.into(),
            sens,
            score,
            timestamp,
            duration: DEFAULT_RUN_DURATION_SECS,
            session_id: 0,
            is_pb: false,
            is_scen_pb: false,
            is_first: false,
            ranks: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn combo_key(&self) -> ComboKey {
        ComboKey {
            scenario: self.scenario.clone(),
            sens: SensKey(self.sens),
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey {
            scenario: self.scenario.clone(),
            sens: SensKey(self.sens),
            timestamp: self.timestamp,
            score_bits: self.score.to_bits(),
        }
    }

    pub fn has_rank(&self, tier: RankTier) -> bool {
        self.ranks.contains(&tier)
    }
}
