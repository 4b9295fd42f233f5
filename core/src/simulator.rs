//! Outcome simulator: Monte Carlo trials of one scenario over a cohort.
//!
//! Per trial, a momentary state is sampled around the individual's
//! latent means and the scorecard is checked against it in a fixed order:
//!
//!   1. initial_effort > motivation          → did_not_try (motivation gap)
//!   2. perceived_risk > trust               → did_not_try (trust gap)
//!   3. complexity     > friction_tolerance  → did_not_try (friction gap)
//!   4. complexity     > capability_mean     → failed      (capability gap)
//!   5. time_to_value  > friction_tolerance  → failed      (patience gap)
//!   6. otherwise                            → succeeded
//!
//! Population rates average per-individual rates, so every individual
//! weighs the same regardless of trial count.

use crate::{
    error::SimulationError,
    rng::{RngBank, StreamRng, StreamSlot},
    root_cause::{diagnose, RootCause, RootCauseBreakdown},
    scorecard::{NormalizedScorecard, Scorecard, ScorecardRanges},
    traits::{Individual, LatentTraits},
    types::IndividualId,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const MOTIVATION_CAPABILITY_WEIGHT: f64 = 0.5;
pub const MOTIVATION_EXPLORATION_WEIGHT: f64 = 0.5;

/// Centre of the motivation distribution.
pub fn motivation_mean(latents: &LatentTraits) -> f64 {
    (MOTIVATION_CAPABILITY_WEIGHT * latents.capability_mean
        + MOTIVATION_EXPLORATION_WEIGHT * latents.exploration_prob)
        .clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    DidNotTry,
    Failed,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentaryState {
    pub motivation:         f64,
    pub trust:              f64,
    pub friction_tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub outcome: Outcome,
    pub state:   MomentaryState,
    /// The check that stopped the trial; None on success.
    pub cause:   Option<RootCause>,
}

pub fn sample_state(latents: &LatentTraits, noise_sd: f64, rng: &mut StreamRng) -> MomentaryState {
    MomentaryState {
        motivation: rng.normal(motivation_mean(latents), noise_sd).clamp(0.0, 1.0),
        trust: rng.normal(latents.trust_mean, noise_sd).clamp(0.0, 1.0),
        friction_tolerance: rng
            .normal(latents.friction_tolerance_mean, noise_sd)
            .clamp(0.0, 1.0),
    }
}

/// Classify one trial given an already-sampled state.
pub fn classify(
    latents: &LatentTraits,
    card: &NormalizedScorecard,
    state: MomentaryState,
) -> TrialOutcome {
    let (outcome, cause) = if card.initial_effort > state.motivation {
        (Outcome::DidNotTry, Some(RootCause::MotivationGap))
    } else if card.perceived_risk > state.trust {
        (Outcome::DidNotTry, Some(RootCause::TrustGap))
    } else if card.complexity > state.friction_tolerance {
        (Outcome::DidNotTry, Some(RootCause::FrictionGap))
    } else if card.complexity > latents.capability_mean {
        (Outcome::Failed, Some(RootCause::CapabilityGap))
    } else if card.time_to_value > state.friction_tolerance {
        (Outcome::Failed, Some(RootCause::PatienceGap))
    } else {
        (Outcome::Succeeded, None)
    };
    TrialOutcome { outcome, state, cause }
}

pub fn run_trial(
    latents: &LatentTraits,
    card: &NormalizedScorecard,
    noise_sd: f64,
    rng: &mut StreamRng,
) -> TrialOutcome {
    let state = sample_state(latents, noise_sd, rng);
    classify(latents, card, state)
}

/// One individual's aggregated trials.
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualResult {
    pub did_not_try:  u32,
    pub failed:       u32,
    pub succeeded:    u32,
    pub trial_causes: RootCauseBreakdown,
    pub dominant:     Outcome,
    pub root_cause:   Option<RootCause>,
}

impl IndividualResult {
    pub fn n_trials(&self) -> u32 {
        self.did_not_try + self.failed + self.succeeded
    }

    pub fn did_not_try_rate(&self) -> f64 {
        f64::from(self.did_not_try) / f64::from(self.n_trials())
    }

    pub fn failure_rate(&self) -> f64 {
        f64::from(self.failed) / f64::from(self.n_trials())
    }

    pub fn success_rate(&self) -> f64 {
        f64::from(self.succeeded) / f64::from(self.n_trials())
    }
}

/// Plurality outcome. Ties go to the outcome checked earlier
/// (did_not_try, then failed, then succeeded).
pub fn dominant_outcome(did_not_try: u32, failed: u32, succeeded: u32) -> Outcome {
    if did_not_try >= failed && did_not_try >= succeeded {
        Outcome::DidNotTry
    } else if failed >= succeeded {
        Outcome::Failed
    } else {
        Outcome::Succeeded
    }
}

/// Run `n_trials` independent trials for one individual.
pub fn simulate(
    latents: &LatentTraits,
    card: &NormalizedScorecard,
    n_trials: u32,
    noise_sd: f64,
    rng: &mut StreamRng,
) -> Result<IndividualResult, SimulationError> {
    if n_trials == 0 {
        return Err(SimulationError::NoTrials);
    }
    let (mut did_not_try, mut failed, mut succeeded) = (0u32, 0u32, 0u32);
    let mut trial_causes = RootCauseBreakdown::default();

    for _ in 0..n_trials {
        let trial = run_trial(latents, card, noise_sd, rng);
        match trial.outcome {
            Outcome::DidNotTry => did_not_try += 1,
            Outcome::Failed => failed += 1,
            Outcome::Succeeded => succeeded += 1,
        }
        if let Some(cause) = trial.cause {
            trial_causes.add(cause);
        }
    }

    let dominant = dominant_outcome(did_not_try, failed, succeeded);
    let root_cause = diagnose(dominant, latents, card, &trial_causes);
    Ok(IndividualResult {
        did_not_try,
        failed,
        succeeded,
        trial_causes,
        dominant,
        root_cause,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrialSettings {
    pub n_trials: u32,
    pub noise_sd: f64,
}

/// Aggregated outcome of one scorecard over the whole cohort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub success_rate:          f64,
    pub failure_rate:          f64,
    pub did_not_try_rate:      f64,
    /// success_rate minus the parent node's; None at the root.
    pub delta_success_rate:    Option<f64>,
    /// Diagnosed root causes of non-success individuals.
    pub root_causes:           RootCauseBreakdown,
    pub individuals_simulated: usize,
    pub individuals_skipped:   usize,
    pub n_trials:              u32,
}

impl SimulationResult {
    pub fn with_parent(mut self, parent_success_rate: f64) -> Self {
        self.delta_success_rate = Some(self.success_rate - parent_success_rate);
        self
    }
}

/// Simulate a raw scorecard over a cohort.
///
/// Individuals with non-finite traits are skipped and counted; the node
/// only fails if nobody is left to simulate.
pub fn simulate_population(
    population: &[Individual],
    scorecard: &Scorecard,
    ranges: &ScorecardRanges,
    settings: TrialSettings,
    bank: &RngBank,
) -> Result<SimulationResult, SimulationError> {
    if settings.n_trials == 0 {
        return Err(SimulationError::NoTrials);
    }
    let card = ranges.normalize(scorecard)?;

    let outcomes: Vec<Option<(IndividualId, IndividualResult)>> = population
        .par_iter()
        .map(|person| {
            if !person.observables.is_finite() {
                return None;
            }
            let latents = person.latents();
            if !latents.is_finite() {
                return None;
            }
            let mut rng = bank.for_individual(StreamSlot::Trials, person.index);
            simulate(&latents, &card, settings.n_trials, settings.noise_sd, &mut rng)
                .ok()
                .map(|r| (person.individual_id.clone(), r))
        })
        .collect();

    let skipped = outcomes.iter().filter(|o| o.is_none()).count();
    let results: Vec<_> = outcomes.into_iter().flatten().collect();
    if results.is_empty() {
        return Err(SimulationError::EmptyPopulation { skipped });
    }
    if skipped > 0 {
        log::warn!("simulator: skipped {skipped} individuals with malformed traits");
    }

    let n = results.len() as f64;
    let mut root_causes = RootCauseBreakdown::default();
    let (mut success, mut failure, mut did_not_try) = (0.0, 0.0, 0.0);
    for (individual_id, r) in &results {
        success += r.success_rate();
        failure += r.failure_rate();
        did_not_try += r.did_not_try_rate();
        if let Some(cause) = r.root_cause {
            log::trace!("simulator: {individual_id} dominant={:?} cause={}", r.dominant, cause.name());
            root_causes.add(cause);
        }
    }

    Ok(SimulationResult {
        success_rate: success / n,
        failure_rate: failure / n,
        did_not_try_rate: did_not_try / n,
        delta_success_rate: None,
        root_causes,
        individuals_simulated: results.len(),
        individuals_skipped: skipped,
        n_trials: settings.n_trials,
    })
}
