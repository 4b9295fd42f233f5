//! Synthetic cohort generation.
//!
//! Demographics are drawn from fixed weight tables by cumulative roll,
//! then each person's observables are sampled once and cached on the
//! Individual. Nothing here is mutated after generation.

use crate::{
    rng::{RngBank, StreamSlot},
    traits::{
        generate_observables, Demographics, EducationLevel, HouseholdComposition, Individual,
        Severity,
    },
};

const EDUCATION_MIX: [(EducationLevel, f64); 8] = [
    (EducationLevel::NoInstruction, 0.03),
    (EducationLevel::Primary, 0.10),
    (EducationLevel::LowerSecondary, 0.12),
    (EducationLevel::UpperSecondary, 0.25),
    (EducationLevel::Vocational, 0.15),
    (EducationLevel::Bachelor, 0.20),
    (EducationLevel::Master, 0.12),
    (EducationLevel::Doctorate, 0.03),
];

const SEVERITY_MIX: [(Severity, f64); 4] = [
    (Severity::None, 0.82),
    (Severity::Mild, 0.10),
    (Severity::Moderate, 0.05),
    (Severity::Severe, 0.03),
];

const HOUSEHOLD_MIX: [(HouseholdComposition, f64); 6] = [
    (HouseholdComposition::LivesAlone, 0.25),
    (HouseholdComposition::Couple, 0.25),
    (HouseholdComposition::CoupleWithChildren, 0.25),
    (HouseholdComposition::SingleParent, 0.09),
    (HouseholdComposition::Multigenerational, 0.08),
    (HouseholdComposition::Caregiver, 0.08),
];

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 90;

fn pick<T: Copy>(table: &[(T, f64)], rng: &mut crate::rng::StreamRng) -> T {
    let weights: Vec<f64> = table.iter().map(|(_, w)| *w).collect();
    table[rng.weighted_index(&weights)].0
}

/// Generate `size` individuals. Same bank seed, same cohort.
pub fn generate_population(size: usize, bank: &RngBank) -> Vec<Individual> {
    let mut demo_rng = bank.for_stream(StreamSlot::Population);
    let mut trait_rng = bank.for_stream(StreamSlot::Traits);
    let mut population = Vec::with_capacity(size);

    for i in 0..size {
        let age = MIN_AGE + demo_rng.next_u64_below(u64::from(MAX_AGE - MIN_AGE + 1)) as u32;
        let demographics = Demographics {
            education: pick(&EDUCATION_MIX, &mut demo_rng),
            age: Some(age),
            motor_impairment: pick(&SEVERITY_MIX, &mut demo_rng),
            visual_impairment: pick(&SEVERITY_MIX, &mut demo_rng),
            household: pick(&HOUSEHOLD_MIX, &mut demo_rng),
        };
        let observables = generate_observables(&demographics, &mut trait_rng);
        population.push(Individual {
            individual_id: format!("ind-{i:05}"),
            index: i as u64,
            demographics,
            observables,
        });
    }
    log::info!("population: generated {size} individuals (seed={})", bank.master_seed());
    population
}
