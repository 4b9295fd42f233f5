//! Trait model: demographics to observable capacities to latent parameters.
//!
//! Observables are what a recruiter could plausibly assess in a real
//! person. Latents are hidden simulation parameters; they are never
//! stored and are always recomputed from the observables.
//!
//! RULE: Unknown demographic values never raise. They fall back to
//! MEDIAN_FACTOR so a partially filled record still yields a person.

use crate::{rng::StreamRng, types::IndividualId};
use serde::{Deserialize, Serialize};

pub const MEDIAN_FACTOR: f64 = 0.5;

/// Beta(BASE_SHAPE + SHAPE_SHIFT·f, BASE_SHAPE + SHAPE_SHIFT·(1−f)).
/// f = 0.5 gives the symmetric Beta(4, 4).
pub const BASE_SHAPE: f64 = 2.0;
pub const SHAPE_SHIFT: f64 = 4.0;

/// Shape of the uncorrelated observables (experience, domain expertise).
pub const NEUTRAL_SHAPE: f64 = 3.0;

// ── Demographics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    NoInstruction,
    Primary,
    LowerSecondary,
    UpperSecondary,
    Vocational,
    Bachelor,
    Master,
    Doctorate,
    #[serde(other)]
    Unknown,
}

impl EducationLevel {
    pub fn factor(&self) -> f64 {
        match self {
            Self::NoInstruction => 0.0,
            Self::Primary => 0.2,
            Self::LowerSecondary => 0.35,
            Self::UpperSecondary => 0.5,
            Self::Vocational => 0.6,
            Self::Bachelor => 0.75,
            Self::Master => 0.9,
            Self::Doctorate => 1.0,
            Self::Unknown => MEDIAN_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn factor(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Mild => 0.25,
            Self::Moderate => 0.5,
            Self::Severe => 1.0,
            Self::Unknown => MEDIAN_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdComposition {
    LivesAlone,
    Couple,
    CoupleWithChildren,
    SingleParent,
    Multigenerational,
    Caregiver,
    #[serde(other)]
    Unknown,
}

impl HouseholdComposition {
    /// Pressure on free time, 0 = none, 1 = saturated.
    pub fn pressure(&self) -> f64 {
        match self {
            Self::LivesAlone => 0.1,
            Self::Couple => 0.25,
            Self::CoupleWithChildren => 0.6,
            Self::SingleParent => 0.85,
            Self::Multigenerational => 0.7,
            Self::Caregiver => 0.9,
            Self::Unknown => MEDIAN_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    pub education:         EducationLevel,
    /// Age in years; None when not recorded.
    pub age:               Option<u32>,
    pub motor_impairment:  Severity,
    pub visual_impairment: Severity,
    pub household:         HouseholdComposition,
}

impl Demographics {
    /// Monotonic penalty for the elderly; unrecorded age is the median.
    pub fn age_factor(&self) -> f64 {
        match self.age {
            None => MEDIAN_FACTOR,
            Some(a) if a < 55 => 1.0,
            Some(a) if a < 65 => 0.85,
            Some(a) if a < 75 => 0.65,
            Some(a) if a < 85 => 0.45,
            Some(_) => 0.3,
        }
    }

    /// Worse of the motor and visual impairments.
    pub fn disability_severity(&self) -> f64 {
        self.motor_impairment
            .factor()
            .max(self.visual_impairment.factor())
    }
}

// ── Observable and latent traits ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ObservableTraits {
    pub digital_literacy:        f64,
    pub similar_tool_experience: f64,
    pub motor_ability:           f64,
    pub time_availability:       f64,
    pub domain_expertise:        f64,
}

impl ObservableTraits {
    pub fn get(&self, which: Observable) -> f64 {
        match which {
            Observable::DigitalLiteracy => self.digital_literacy,
            Observable::SimilarToolExperience => self.similar_tool_experience,
            Observable::MotorAbility => self.motor_ability,
            Observable::TimeAvailability => self.time_availability,
            Observable::DomainExpertise => self.domain_expertise,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.digital_literacy,
            self.similar_tool_experience,
            self.motor_ability,
            self.time_availability,
            self.domain_expertise,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    DigitalLiteracy,
    SimilarToolExperience,
    MotorAbility,
    TimeAvailability,
    DomainExpertise,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatentTraits {
    pub capability_mean:         f64,
    pub trust_mean:              f64,
    pub friction_tolerance_mean: f64,
    pub exploration_prob:        f64,
}

impl LatentTraits {
    pub fn is_finite(&self) -> bool {
        self.capability_mean.is_finite()
            && self.trust_mean.is_finite()
            && self.friction_tolerance_mean.is_finite()
            && self.exploration_prob.is_finite()
    }
}

/// One term of a latent weight set. `inverted` reads the observable as (1 − x).
#[derive(Debug, Clone, Copy)]
pub struct WeightTerm {
    pub source:   Observable,
    pub inverted: bool,
    pub weight:   f64,
}

const fn term(source: Observable, weight: f64) -> WeightTerm {
    WeightTerm { source, inverted: false, weight }
}

const fn inverse(source: Observable, weight: f64) -> WeightTerm {
    WeightTerm { source, inverted: true, weight }
}

use Observable::*;

pub const CAPABILITY_WEIGHTS: [WeightTerm; 4] = [
    term(DigitalLiteracy, 0.40),
    term(SimilarToolExperience, 0.35),
    term(MotorAbility, 0.15),
    term(DomainExpertise, 0.10),
];

pub const TRUST_WEIGHTS: [WeightTerm; 2] = [
    term(SimilarToolExperience, 0.60),
    term(DigitalLiteracy, 0.40),
];

pub const FRICTION_TOLERANCE_WEIGHTS: [WeightTerm; 3] = [
    term(TimeAvailability, 0.40),
    term(DigitalLiteracy, 0.35),
    term(SimilarToolExperience, 0.25),
];

pub const EXPLORATION_WEIGHTS: [WeightTerm; 3] = [
    term(DigitalLiteracy, 0.50),
    inverse(SimilarToolExperience, 0.30),
    term(TimeAvailability, 0.20),
];

/// Every latent weight set, by name. Each must sum to 1.0.
pub const LATENT_WEIGHT_SETS: [(&str, &[WeightTerm]); 4] = [
    ("capability_mean", &CAPABILITY_WEIGHTS),
    ("trust_mean", &TRUST_WEIGHTS),
    ("friction_tolerance_mean", &FRICTION_TOLERANCE_WEIGHTS),
    ("exploration_prob", &EXPLORATION_WEIGHTS),
];

fn weighted_sum(terms: &[WeightTerm], obs: &ObservableTraits) -> f64 {
    terms
        .iter()
        .map(|t| {
            let x = obs.get(t.source);
            t.weight * if t.inverted { 1.0 - x } else { x }
        })
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Pure: identical observables always yield identical latents.
pub fn derive_latents(obs: &ObservableTraits) -> LatentTraits {
    LatentTraits {
        capability_mean: weighted_sum(&CAPABILITY_WEIGHTS, obs),
        trust_mean: weighted_sum(&TRUST_WEIGHTS, obs),
        friction_tolerance_mean: weighted_sum(&FRICTION_TOLERANCE_WEIGHTS, obs),
        exploration_prob: weighted_sum(&EXPLORATION_WEIGHTS, obs),
    }
}

fn shifted_beta(rng: &mut StreamRng, factor: f64) -> f64 {
    let f = factor.clamp(0.0, 1.0);
    rng.beta(BASE_SHAPE + SHAPE_SHIFT * f, BASE_SHAPE + SHAPE_SHIFT * (1.0 - f))
        .clamp(0.0, 1.0)
}

/// Sample observables for one person. Deterministic for a seeded stream.
pub fn generate_observables(demo: &Demographics, rng: &mut StreamRng) -> ObservableTraits {
    let literacy_factor = demo.education.factor() * demo.age_factor();
    let motor_factor = 1.0 - demo.disability_severity();
    let time_factor = 1.0 - demo.household.pressure();

    // Sampling order is part of the determinism contract.
    let digital_literacy = shifted_beta(rng, literacy_factor);
    let similar_tool_experience = rng.beta(NEUTRAL_SHAPE, NEUTRAL_SHAPE).clamp(0.0, 1.0);
    let motor_ability = shifted_beta(rng, motor_factor);
    let time_availability = shifted_beta(rng, time_factor);
    let domain_expertise = rng.beta(NEUTRAL_SHAPE, NEUTRAL_SHAPE).clamp(0.0, 1.0);

    ObservableTraits {
        digital_literacy,
        similar_tool_experience,
        motor_ability,
        time_availability,
        domain_expertise,
    }
}

/// One synthetic population member. Immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    pub individual_id: IndividualId,
    /// Position in the cohort; selects the individual's trial stream.
    pub index:         u64,
    pub demographics:  Demographics,
    pub observables:   ObservableTraits,
}

impl Individual {
    pub fn latents(&self) -> LatentTraits {
        derive_latents(&self.observables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StreamSlot};

    fn demo(education: EducationLevel, age: Option<u32>) -> Demographics {
        Demographics {
            education,
            age,
            motor_impairment: Severity::None,
            visual_impairment: Severity::None,
            household: HouseholdComposition::Couple,
        }
    }

    #[test]
    fn weight_sets_sum_to_one() {
        for (name, terms) in LATENT_WEIGHT_SETS {
            let total: f64 = terms.iter().map(|t| t.weight).sum();
            assert!((total - 1.0).abs() < 1e-12, "{name} weights sum to {total}");
        }
    }

    #[test]
    fn latents_match_documented_formulas() {
        let obs = ObservableTraits {
            digital_literacy: 0.8,
            similar_tool_experience: 0.3,
            motor_ability: 0.6,
            time_availability: 0.4,
            domain_expertise: 0.9,
        };
        let l = derive_latents(&obs);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        assert!(close(l.capability_mean, 0.40 * 0.8 + 0.35 * 0.3 + 0.15 * 0.6 + 0.10 * 0.9));
        assert!(close(l.trust_mean, 0.60 * 0.3 + 0.40 * 0.8));
        assert!(close(l.friction_tolerance_mean, 0.40 * 0.4 + 0.35 * 0.8 + 0.25 * 0.3));
        assert!(close(l.exploration_prob, 0.50 * 0.8 + 0.30 * 0.7 + 0.20 * 0.4));
    }

    #[test]
    fn unknown_enum_values_fall_back_to_median() {
        let d: Demographics = serde_json::from_str(
            r#"{"education":"phd_candidate","age":null,
                "motor_impairment":"extreme","visual_impairment":"none",
                "household":"commune"}"#,
        )
        .unwrap();
        assert_eq!(d.education, EducationLevel::Unknown);
        assert_eq!(d.education.factor(), MEDIAN_FACTOR);
        assert_eq!(d.age_factor(), MEDIAN_FACTOR);
        assert_eq!(d.disability_severity(), MEDIAN_FACTOR);
        assert_eq!(d.household.pressure(), MEDIAN_FACTOR);
    }

    #[test]
    fn worse_impairment_wins() {
        let mut d = demo(EducationLevel::Bachelor, Some(40));
        d.motor_impairment = Severity::Mild;
        d.visual_impairment = Severity::Severe;
        assert_eq!(d.disability_severity(), 1.0);
    }

    #[test]
    fn age_penalty_is_monotonic() {
        let factors: Vec<f64> = [20, 56, 66, 76, 90]
            .iter()
            .map(|&a| demo(EducationLevel::Master, Some(a)).age_factor())
            .collect();
        assert!(factors.windows(2).all(|w| w[0] >= w[1]), "{factors:?}");
    }

    #[test]
    fn education_shifts_digital_literacy() {
        let bank = RngBank::new(31337);
        let mut rng = bank.for_stream(StreamSlot::Traits);
        let n = 2000;
        let mean = |d: &Demographics, rng: &mut StreamRng| {
            (0..n).map(|_| generate_observables(d, rng).digital_literacy).sum::<f64>() / n as f64
        };
        let low = mean(&demo(EducationLevel::NoInstruction, Some(30)), &mut rng);
        let high = mean(&demo(EducationLevel::Doctorate, Some(30)), &mut rng);
        assert!(high > low + 0.2, "doctorate={high:.3} no_instruction={low:.3}");
    }
}
