use crate::{
    error::{ExploreError, ExploreResult},
    scorecard::{Dimension, ScorecardRanges},
    simulator::TrialSettings,
};
use serde::{Deserialize, Serialize};

pub const MAX_BEAM_WIDTH: u32 = 10;
pub const MAX_DEPTH: u32 = 10;

/// Engine-wide settings. Loaded once per process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Master seed for population generation and trial streams.
    pub seed:                 u64,
    pub population_size:      usize,
    /// Monte Carlo trials per individual per node.
    pub n_trials:             u32,
    /// Upper bound on candidates requested from the proposer per node.
    pub max_candidates:       usize,
    /// Default LLM call budget for explorations that don't set one.
    pub max_llm_calls:        u32,
    /// Extra proposer attempts after a failed or empty response.
    pub proposer_max_retries: u32,
    /// Standard deviation of momentary-state noise around latent means.
    pub trial_noise_sd:       f64,
    pub scorecard_ranges:     ScorecardRanges,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population_size: 200,
            n_trials: 100,
            max_candidates: 3,
            max_llm_calls: 50,
            proposer_max_retries: 2,
            trial_noise_sd: 0.12,
            scorecard_ranges: ScorecardRanges::default(),
        }
    }
}

impl ExplorerConfig {
    /// Load from a JSON file. Missing fields take production defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ExplorerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with small, fast defaults for use in tests.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            population_size: 40,
            n_trials: 20,
            max_candidates: 3,
            max_llm_calls: 20,
            proposer_max_retries: 1,
            trial_noise_sd: 0.0,
            scorecard_ranges: ScorecardRanges::default(),
        }
    }

    pub fn trial_settings(&self) -> TrialSettings {
        TrialSettings {
            n_trials: self.n_trials,
            noise_sd: self.trial_noise_sd,
        }
    }

    pub fn validate(&self) -> ExploreResult<()> {
        if self.n_trials == 0 {
            return Err(invalid("n_trials", "must be > 0"));
        }
        if self.max_candidates == 0 {
            return Err(invalid("max_candidates", "must be > 0"));
        }
        if !(self.trial_noise_sd >= 0.0 && self.trial_noise_sd.is_finite()) {
            return Err(invalid("trial_noise_sd", "must be a finite value >= 0"));
        }
        for dim in Dimension::ALL {
            let r = self.scorecard_ranges.get(dim);
            if !(r.min.is_finite() && r.max.is_finite() && r.min < r.max) {
                return Err(ExploreError::InvalidConfig {
                    field: "scorecard_ranges",
                    reason: format!("{} range [{}, {}] is empty", dim.name(), r.min, r.max),
                });
            }
        }
        Ok(())
    }
}

/// Caller-supplied search parameters, validated at `start`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExplorationParams {
    /// Target success rate in (0, 1].
    pub goal_value:    f64,
    pub beam_width:    u32,
    pub max_depth:     u32,
    pub max_llm_calls: u32,
}

impl ExplorationParams {
    pub fn validate(&self) -> ExploreResult<()> {
        if !(self.goal_value > 0.0 && self.goal_value <= 1.0) {
            return Err(invalid("goal_value", &format!("{} is outside (0, 1]", self.goal_value)));
        }
        if !(1..=MAX_BEAM_WIDTH).contains(&self.beam_width) {
            return Err(invalid(
                "beam_width",
                &format!("{} is outside [1, {MAX_BEAM_WIDTH}]", self.beam_width),
            ));
        }
        if !(1..=MAX_DEPTH).contains(&self.max_depth) {
            return Err(invalid(
                "max_depth",
                &format!("{} is outside [1, {MAX_DEPTH}]", self.max_depth),
            ));
        }
        if self.max_llm_calls == 0 {
            return Err(invalid("max_llm_calls", "must be > 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ExploreError {
    ExploreError::InvalidConfig { field, reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorecard::DimensionRange;

    fn params(goal_value: f64, beam_width: u32, max_depth: u32) -> ExplorationParams {
        ExplorationParams { goal_value, beam_width, max_depth, max_llm_calls: 10 }
    }

    #[test]
    fn params_bounds_are_inclusive() {
        assert!(params(1.0, 1, 1).validate().is_ok());
        assert!(params(0.01, 10, 10).validate().is_ok());
    }

    #[test]
    fn params_out_of_range_are_rejected() {
        for bad in [params(0.0, 2, 3), params(1.01, 2, 3), params(f64::NAN, 2, 3)] {
            assert!(matches!(
                bad.validate(),
                Err(ExploreError::InvalidConfig { field: "goal_value", .. })
            ));
        }
        assert!(matches!(
            params(0.5, 0, 3).validate(),
            Err(ExploreError::InvalidConfig { field: "beam_width", .. })
        ));
        assert!(matches!(
            params(0.5, 11, 3).validate(),
            Err(ExploreError::InvalidConfig { field: "beam_width", .. })
        ));
        assert!(matches!(
            params(0.5, 2, 0).validate(),
            Err(ExploreError::InvalidConfig { field: "max_depth", .. })
        ));
        assert!(matches!(
            params(0.5, 2, 11).validate(),
            Err(ExploreError::InvalidConfig { field: "max_depth", .. })
        ));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ExplorerConfig = serde_json::from_str(r#"{"seed": 9, "n_trials": 5}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.n_trials, 5);
        assert_eq!(config.max_candidates, ExplorerConfig::default().max_candidates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = ExplorerConfig::default_test();
        config.scorecard_ranges.time_to_value = DimensionRange::new(5.0, 5.0);
        assert!(matches!(
            config.validate(),
            Err(ExploreError::InvalidConfig { field: "scorecard_ranges", .. })
        ));
    }
}
