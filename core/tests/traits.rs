//! Trait generation: observables from demographics, latents from observables.

use scenario_explorer_core::{
    population::generate_population,
    rng::{RngBank, StreamSlot},
    traits::{
        derive_latents, generate_observables, Demographics, EducationLevel, HouseholdComposition,
        Severity, LATENT_WEIGHT_SETS,
    },
};

fn demographics(education: EducationLevel, age: Option<u32>, household: HouseholdComposition) -> Demographics {
    Demographics {
        education,
        age,
        motor_impairment: Severity::None,
        visual_impairment: Severity::None,
        household,
    }
}

fn mean_literacy(demo: &Demographics, seed: u64) -> f64 {
    let mut rng = RngBank::new(seed).for_stream(StreamSlot::Traits);
    let n = 400;
    (0..n)
        .map(|_| generate_observables(demo, &mut rng).digital_literacy)
        .sum::<f64>()
        / n as f64
}

#[test]
fn generated_traits_stay_in_unit_range() {
    let population = generate_population(300, &RngBank::new(11));
    assert_eq!(population.len(), 300);
    for person in &population {
        let o = person.observables;
        for x in [
            o.digital_literacy,
            o.similar_tool_experience,
            o.motor_ability,
            o.time_availability,
            o.domain_expertise,
        ] {
            assert!((0.0..=1.0).contains(&x), "{}: observable {x}", person.individual_id);
        }
        let l = person.latents();
        for x in [l.capability_mean, l.trust_mean, l.friction_tolerance_mean, l.exploration_prob] {
            assert!((0.0..=1.0).contains(&x), "{}: latent {x}", person.individual_id);
        }
    }
}

#[test]
fn same_seed_same_cohort() {
    let a = generate_population(50, &RngBank::new(314));
    let b = generate_population(50, &RngBank::new(314));
    assert_eq!(a, b);
    let c = generate_population(50, &RngBank::new(315));
    assert_ne!(a, c);
}

#[test]
fn education_raises_digital_literacy() {
    let low = demographics(EducationLevel::NoInstruction, Some(30), HouseholdComposition::LivesAlone);
    let high = demographics(EducationLevel::Doctorate, Some(30), HouseholdComposition::LivesAlone);
    let (lo, hi) = (mean_literacy(&low, 8), mean_literacy(&high, 8));
    assert!(hi > lo + 0.2, "doctorate {hi} vs no instruction {lo}");
}

#[test]
fn old_age_lowers_digital_literacy() {
    let young = demographics(EducationLevel::Bachelor, Some(25), HouseholdComposition::Couple);
    let old = demographics(EducationLevel::Bachelor, Some(88), HouseholdComposition::Couple);
    assert!(mean_literacy(&young, 21) > mean_literacy(&old, 21));
}

#[test]
fn unknown_demographics_fall_back_to_median() {
    let demo: Demographics = serde_json::from_str(
        r#"{
            "education": "apprenticeship",
            "age": null,
            "motor_impairment": "unspecified",
            "visual_impairment": "none",
            "household": "commune"
        }"#,
    )
    .expect("unknown values never fail");
    assert_eq!(demo.education, EducationLevel::Unknown);
    assert_eq!(demo.household, HouseholdComposition::Unknown);
    assert_eq!(demo.age_factor(), 0.5);
    assert_eq!(demo.disability_severity(), 0.5);

    let mut rng = RngBank::new(1).for_stream(StreamSlot::Traits);
    let o = generate_observables(&demo, &mut rng);
    assert!((0.0..=1.0).contains(&o.digital_literacy));
}

#[test]
fn latent_weights_sum_to_one() {
    for (name, terms) in LATENT_WEIGHT_SETS {
        let total: f64 = terms.iter().map(|t| t.weight).sum();
        assert!((total - 1.0).abs() < 1e-9, "{name} weights sum to {total}");
    }
}

#[test]
fn latents_are_pure() {
    let population = generate_population(5, &RngBank::new(2));
    for person in &population {
        assert_eq!(derive_latents(&person.observables), person.latents());
    }
}
