//! Scenario scorecards: the four-dimension difficulty profile.
//!
//! Raw values live on a configured [min, max] range per dimension.
//! The simulator only ever sees the normalized [0, 1] form; the range
//! midpoint (0.5 after normalization) is the baseline that weak
//! dimensions are measured against.

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};

pub const MIDPOINT: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Complexity,
    InitialEffort,
    PerceivedRisk,
    TimeToValue,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Complexity,
        Dimension::InitialEffort,
        Dimension::PerceivedRisk,
        Dimension::TimeToValue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::InitialEffort => "initial_effort",
            Self::PerceivedRisk => "perceived_risk",
            Self::TimeToValue => "time_to_value",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Scorecard {
    pub complexity:     f64,
    pub initial_effort: f64,
    pub perceived_risk: f64,
    pub time_to_value:  f64,
}

impl Scorecard {
    pub fn new(complexity: f64, initial_effort: f64, perceived_risk: f64, time_to_value: f64) -> Self {
        Self { complexity, initial_effort, perceived_risk, time_to_value }
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Complexity => self.complexity,
            Dimension::InitialEffort => self.initial_effort,
            Dimension::PerceivedRisk => self.perceived_risk,
            Dimension::TimeToValue => self.time_to_value,
        }
    }

    fn get_mut(&mut self, dim: Dimension) -> &mut f64 {
        match dim {
            Dimension::Complexity => &mut self.complexity,
            Dimension::InitialEffort => &mut self.initial_effort,
            Dimension::PerceivedRisk => &mut self.perceived_risk,
            Dimension::TimeToValue => &mut self.time_to_value,
        }
    }

    /// Apply a proposed delta, clamping each dimension into its range.
    /// A non-finite delta component is rejected and `self` is left as is.
    pub fn apply(
        &self,
        delta: &ScorecardDelta,
        ranges: &ScorecardRanges,
    ) -> Result<Scorecard, SimulationError> {
        let mut next = *self;
        for dim in Dimension::ALL {
            let step = delta.get(dim);
            if !step.is_finite() {
                return Err(SimulationError::MalformedScorecard { dimension: dim.name(), value: step });
            }
            let value = next.get_mut(dim);
            *value = ranges.get(dim).clamp(*value + step);
        }
        Ok(next)
    }
}

/// Signed change to each raw dimension. Missing fields default to zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScorecardDelta {
    #[serde(default)]
    pub complexity:     f64,
    #[serde(default)]
    pub initial_effort: f64,
    #[serde(default)]
    pub perceived_risk: f64,
    #[serde(default)]
    pub time_to_value:  f64,
}

impl ScorecardDelta {
    pub fn uniform(amount: f64) -> Self {
        Self {
            complexity: amount,
            initial_effort: amount,
            perceived_risk: amount,
            time_to_value: amount,
        }
    }

    pub fn single(dim: Dimension, amount: f64) -> Self {
        let mut delta = Self::default();
        match dim {
            Dimension::Complexity => delta.complexity = amount,
            Dimension::InitialEffort => delta.initial_effort = amount,
            Dimension::PerceivedRisk => delta.perceived_risk = amount,
            Dimension::TimeToValue => delta.time_to_value = amount,
        }
        delta
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Complexity => self.complexity,
            Dimension::InitialEffort => self.initial_effort,
            Dimension::PerceivedRisk => self.perceived_risk,
            Dimension::TimeToValue => self.time_to_value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionRange {
    pub min: f64,
    pub max: f64,
}

impl DimensionRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScorecardRanges {
    pub complexity:     DimensionRange,
    pub initial_effort: DimensionRange,
    pub perceived_risk: DimensionRange,
    pub time_to_value:  DimensionRange,
}

impl Default for ScorecardRanges {
    fn default() -> Self {
        Self::uniform(DimensionRange::new(0.0, 10.0))
    }
}

impl ScorecardRanges {
    pub fn uniform(range: DimensionRange) -> Self {
        Self {
            complexity: range,
            initial_effort: range,
            perceived_risk: range,
            time_to_value: range,
        }
    }

    pub fn get(&self, dim: Dimension) -> DimensionRange {
        match dim {
            Dimension::Complexity => self.complexity,
            Dimension::InitialEffort => self.initial_effort,
            Dimension::PerceivedRisk => self.perceived_risk,
            Dimension::TimeToValue => self.time_to_value,
        }
    }

    /// Map a raw scorecard onto [0, 1]. Non-finite values are rejected.
    pub fn normalize(&self, scorecard: &Scorecard) -> Result<NormalizedScorecard, SimulationError> {
        for dim in Dimension::ALL {
            let value = scorecard.get(dim);
            if !value.is_finite() {
                return Err(SimulationError::MalformedScorecard { dimension: dim.name(), value });
            }
        }
        Ok(NormalizedScorecard {
            complexity: self.complexity.normalize(scorecard.complexity),
            initial_effort: self.initial_effort.normalize(scorecard.initial_effort),
            perceived_risk: self.perceived_risk.normalize(scorecard.perceived_risk),
            time_to_value: self.time_to_value.normalize(scorecard.time_to_value),
        })
    }
}

/// Scorecard on the unit scale the latent traits live on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedScorecard {
    pub complexity:     f64,
    pub initial_effort: f64,
    pub perceived_risk: f64,
    pub time_to_value:  f64,
}

impl NormalizedScorecard {
    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Complexity => self.complexity,
            Dimension::InitialEffort => self.initial_effort,
            Dimension::PerceivedRisk => self.perceived_risk,
            Dimension::TimeToValue => self.time_to_value,
        }
    }

    /// Positive when the dimension sits above the range midpoint.
    pub fn gap_from_midpoint(&self, dim: Dimension) -> f64 {
        self.get(dim) - MIDPOINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_clamps_to_range() {
        let ranges = ScorecardRanges::default();
        let card = Scorecard::new(9.5, 0.5, 5.0, 5.0);
        let next = card
            .apply(
                &ScorecardDelta { complexity: 2.0, initial_effort: -3.0, ..Default::default() },
                &ranges,
            )
            .unwrap();
        assert_eq!(next.complexity, 10.0);
        assert_eq!(next.initial_effort, 0.0);
        assert_eq!(next.perceived_risk, 5.0);
    }

    #[test]
    fn apply_rejects_non_finite_delta() {
        let ranges = ScorecardRanges::default();
        let card = Scorecard::new(5.0, 5.0, 5.0, 5.0);
        let err = card
            .apply(&ScorecardDelta::single(Dimension::PerceivedRisk, f64::INFINITY), &ranges)
            .unwrap_err();
        assert!(matches!(err, SimulationError::MalformedScorecard { dimension: "perceived_risk", .. }));
        assert!(card.apply(&ScorecardDelta::uniform(f64::NAN), &ranges).is_err());
    }

    #[test]
    fn normalize_maps_midpoint_to_half() {
        let ranges = ScorecardRanges::uniform(DimensionRange::new(1.0, 9.0));
        let norm = ranges.normalize(&Scorecard::new(5.0, 1.0, 9.0, 5.0)).unwrap();
        assert_eq!(norm.complexity, 0.5);
        assert_eq!(norm.initial_effort, 0.0);
        assert_eq!(norm.perceived_risk, 1.0);
        assert_eq!(norm.gap_from_midpoint(Dimension::TimeToValue), 0.0);
    }

    #[test]
    fn normalize_rejects_nan() {
        let ranges = ScorecardRanges::default();
        let err = ranges
            .normalize(&Scorecard::new(f64::NAN, 1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, SimulationError::MalformedScorecard { dimension: "complexity", .. }));
    }
}
