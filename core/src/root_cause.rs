//! Root-cause diagnosis for individuals who dominantly did not try or failed.
//!
//! RULE: Attribution walks an explicit ordered check list. It never takes
//! a max over gap values, so exact ties always resolve to the earlier
//! entry in the list.
//!
//!   did_not_try: motivation gap > trust gap > friction gap
//!   failed:      capability gap > patience gap

use crate::{
    scorecard::{Dimension, NormalizedScorecard},
    simulator::{motivation_mean, Outcome},
    traits::LatentTraits,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    MotivationGap,
    TrustGap,
    FrictionGap,
    CapabilityGap,
    PatienceGap,
}

impl RootCause {
    pub const ALL: [RootCause; 5] = [
        RootCause::MotivationGap,
        RootCause::TrustGap,
        RootCause::FrictionGap,
        RootCause::CapabilityGap,
        RootCause::PatienceGap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MotivationGap => "motivation_gap",
            Self::TrustGap => "trust_gap",
            Self::FrictionGap => "friction_gap",
            Self::CapabilityGap => "capability_gap",
            Self::PatienceGap => "patience_gap",
        }
    }

    /// The scorecard dimension whose demand opens this gap.
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::MotivationGap => Dimension::InitialEffort,
            Self::TrustGap => Dimension::PerceivedRisk,
            Self::FrictionGap | Self::CapabilityGap => Dimension::Complexity,
            Self::PatienceGap => Dimension::TimeToValue,
        }
    }

    /// Demand minus capacity at the individual's mean state.
    /// Positive means the gap condition holds.
    pub fn gap(&self, latents: &LatentTraits, card: &NormalizedScorecard) -> f64 {
        match self {
            Self::MotivationGap => card.initial_effort - motivation_mean(latents),
            Self::TrustGap => card.perceived_risk - latents.trust_mean,
            Self::FrictionGap => card.complexity - latents.friction_tolerance_mean,
            Self::CapabilityGap => card.complexity - latents.capability_mean,
            Self::PatienceGap => card.time_to_value - latents.friction_tolerance_mean,
        }
    }
}

pub const DID_NOT_TRY_PRIORITY: [RootCause; 3] = [
    RootCause::MotivationGap,
    RootCause::TrustGap,
    RootCause::FrictionGap,
];

pub const FAILED_PRIORITY: [RootCause; 2] = [RootCause::CapabilityGap, RootCause::PatienceGap];

pub fn priority_for(outcome: Outcome) -> &'static [RootCause] {
    match outcome {
        Outcome::DidNotTry => &DID_NOT_TRY_PRIORITY,
        Outcome::Failed => &FAILED_PRIORITY,
        Outcome::Succeeded => &[],
    }
}

/// Per-cause counters. Used both for one individual's trials and
/// for a node's population-level breakdown.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootCauseBreakdown {
    pub motivation_gap: u32,
    pub trust_gap:      u32,
    pub friction_gap:   u32,
    pub capability_gap: u32,
    pub patience_gap:   u32,
}

impl RootCauseBreakdown {
    pub fn get(&self, cause: RootCause) -> u32 {
        match cause {
            RootCause::MotivationGap => self.motivation_gap,
            RootCause::TrustGap => self.trust_gap,
            RootCause::FrictionGap => self.friction_gap,
            RootCause::CapabilityGap => self.capability_gap,
            RootCause::PatienceGap => self.patience_gap,
        }
    }

    pub fn add(&mut self, cause: RootCause) {
        let slot = match cause {
            RootCause::MotivationGap => &mut self.motivation_gap,
            RootCause::TrustGap => &mut self.trust_gap,
            RootCause::FrictionGap => &mut self.friction_gap,
            RootCause::CapabilityGap => &mut self.capability_gap,
            RootCause::PatienceGap => &mut self.patience_gap,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        RootCause::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Causes with a non-zero count, most frequent first.
    /// Equal counts keep canonical order.
    pub fn ranked(&self) -> Vec<RootCause> {
        let mut causes: Vec<RootCause> = RootCause::ALL
            .into_iter()
            .filter(|c| self.get(*c) > 0)
            .collect();
        causes.sort_by(|a, b| self.get(*b).cmp(&self.get(*a)));
        causes
    }
}

/// Attribute one root cause to an individual.
///
/// `dominant` is the plurality outcome over the individual's trials;
/// `trial_causes` tallies the cause each non-success trial stopped at.
/// Returns None for dominantly successful individuals.
pub fn diagnose(
    dominant: Outcome,
    latents: &LatentTraits,
    card: &NormalizedScorecard,
    trial_causes: &RootCauseBreakdown,
) -> Option<RootCause> {
    let checks = priority_for(dominant);
    if checks.is_empty() {
        return None;
    }

    for cause in checks {
        if cause.gap(latents, card) > 0.0 {
            return Some(*cause);
        }
    }

    // Mean state clears every gate: the outcome came from trial noise.
    // Fall back to the most frequent trial cause, earlier entry on ties.
    let mut best = checks[0];
    for cause in &checks[1..] {
        if trial_causes.get(*cause) > trial_causes.get(best) {
            best = *cause;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latents(capability: f64, trust: f64, friction: f64, explore: f64) -> LatentTraits {
        LatentTraits {
            capability_mean: capability,
            trust_mean: trust,
            friction_tolerance_mean: friction,
            exploration_prob: explore,
        }
    }

    fn card(complexity: f64, effort: f64, risk: f64, ttv: f64) -> NormalizedScorecard {
        NormalizedScorecard {
            complexity,
            initial_effort: effort,
            perceived_risk: risk,
            time_to_value: ttv,
        }
    }

    #[test]
    fn exactly_equal_gaps_resolve_to_motivation() {
        // motivation mean = 0.4, trust = 0.4; effort and risk both 0.6.
        let l = latents(0.4, 0.4, 0.9, 0.4);
        let c = card(0.1, 0.6, 0.6, 0.1);
        assert_eq!(RootCause::MotivationGap.gap(&l, &c), RootCause::TrustGap.gap(&l, &c));
        for _ in 0..10 {
            assert_eq!(
                diagnose(Outcome::DidNotTry, &l, &c, &RootCauseBreakdown::default()),
                Some(RootCause::MotivationGap)
            );
        }
    }

    #[test]
    fn capability_outranks_patience() {
        let l = latents(0.3, 0.9, 0.3, 0.9);
        let c = card(0.5, 0.0, 0.0, 0.5);
        assert_eq!(
            diagnose(Outcome::Failed, &l, &c, &RootCauseBreakdown::default()),
            Some(RootCause::CapabilityGap)
        );
    }

    #[test]
    fn successful_individuals_are_not_diagnosed() {
        let l = latents(0.1, 0.1, 0.1, 0.1);
        let c = card(0.9, 0.9, 0.9, 0.9);
        assert_eq!(diagnose(Outcome::Succeeded, &l, &c, &RootCauseBreakdown::default()), None);
    }

    #[test]
    fn noise_driven_outcomes_use_trial_tallies() {
        let l = latents(0.9, 0.9, 0.9, 0.9);
        let c = card(0.1, 0.1, 0.1, 0.1);
        let mut tallies = RootCauseBreakdown::default();
        tallies.add(RootCause::FrictionGap);
        tallies.add(RootCause::FrictionGap);
        tallies.add(RootCause::TrustGap);
        assert_eq!(diagnose(Outcome::DidNotTry, &l, &c, &tallies), Some(RootCause::FrictionGap));

        let mut tied = RootCauseBreakdown::default();
        tied.add(RootCause::FrictionGap);
        tied.add(RootCause::TrustGap);
        assert_eq!(diagnose(Outcome::DidNotTry, &l, &c, &tied), Some(RootCause::TrustGap));
    }

    #[test]
    fn ranked_orders_by_count_then_canonical() {
        let mut b = RootCauseBreakdown::default();
        b.add(RootCause::PatienceGap);
        b.add(RootCause::TrustGap);
        b.add(RootCause::PatienceGap);
        b.add(RootCause::MotivationGap);
        assert_eq!(
            b.ranked(),
            vec![RootCause::PatienceGap, RootCause::MotivationGap, RootCause::TrustGap]
        );
        assert_eq!(b.total(), 4);
    }
}
