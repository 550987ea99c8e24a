use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How energy should move from one track to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyStyle {
    /// Small steady builds, tolerating small drops.
    #[default]
    Gradual,
    /// Dramatic swings up and down.
    PeakValley,
    /// Low and steady, preferring the 1-5 range.
    Chill,
}

impl EnergyStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gradual => "gradual",
            Self::PeakValley => "peak-valley",
            Self::Chill => "chill",
        }
    }
}

impl fmt::Display for EnergyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergyStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gradual" => Ok(Self::Gradual),
            "peak-valley" | "peak_valley" | "peakvalley" => Ok(Self::PeakValley),
            "chill" => Ok(Self::Chill),
            other => Err(format!("unknown energy style '{other}'")),
        }
    }
}

/// Operator-controlled Auto-DJ configuration.
///
/// Always handed to the scorer and controller as a whole value; callers
/// replace the record rather than patching it field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDjSettings {
    pub enabled: bool,
    /// Weight harmonic fit equally with tempo (otherwise tempo dominates).
    pub prefer_harmonic: bool,
    /// Cap the BPM score when the raw tempo drift exceeds 3 BPM.
    pub strict_bpm: bool,
    pub energy_style: EnergyStyle,
    /// History depth after which a track is considered safe to replay.
    pub recency_limit: usize,
}

impl Default for AutoDjSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefer_harmonic: true,
            strict_bpm: false,
            energy_style: EnergyStyle::Gradual,
            recency_limit: 20,
        }
    }
}

impl AutoDjSettings {
    pub fn profile(&self) -> ScoringProfile {
        ScoringProfile::from_settings(self)
    }
}

/// Component weights for the composite score. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub harmonic: f64,
    pub bpm: f64,
    pub energy: f64,
    pub recency: f64,
}

/// Named weighting schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightProfile {
    /// Harmonic 30 / BPM 30 / energy 25 / recency 15.
    Harmonic,
    /// Harmonic deprioritised; BPM absorbs the difference.
    Tempo,
}

impl WeightProfile {
    pub fn weights(self) -> Weights {
        match self {
            Self::Harmonic => Weights {
                harmonic: 0.30,
                bpm: 0.30,
                energy: 0.25,
                recency: 0.15,
            },
            Self::Tempo => Weights {
                harmonic: 0.15,
                bpm: 0.45,
                energy: 0.25,
                recency: 0.15,
            },
        }
    }
}

/// How tempo drift limits the BPM component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BpmPolicy {
    Relaxed,
    /// Hard ceiling on the BPM score once raw drift exceeds `max_drift`.
    Strict { max_drift: f64, ceiling: f64 },
}

impl BpmPolicy {
    pub const STRICT: BpmPolicy = BpmPolicy::Strict {
        max_drift: 3.0,
        ceiling: 30.0,
    };

    /// Apply the policy to an already computed BPM score.
    pub fn apply(self, score: f64, raw_drift: f64) -> f64 {
        match self {
            Self::Relaxed => score,
            Self::Strict { max_drift, ceiling } if raw_drift > max_drift => score.min(ceiling),
            Self::Strict { .. } => score,
        }
    }
}

/// Everything the scorer needs from the settings, resolved once per pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringProfile {
    pub weights: WeightProfile,
    pub bpm_policy: BpmPolicy,
    pub energy_style: EnergyStyle,
    pub recency_limit: usize,
}

impl ScoringProfile {
    pub fn from_settings(settings: &AutoDjSettings) -> Self {
        Self {
            weights: if settings.prefer_harmonic {
                WeightProfile::Harmonic
            } else {
                WeightProfile::Tempo
            },
            bpm_policy: if settings.strict_bpm {
                BpmPolicy::STRICT
            } else {
                BpmPolicy::Relaxed
            },
            energy_style: settings.energy_style,
            recency_limit: settings.recency_limit,
        }
    }
}
