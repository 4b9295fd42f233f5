//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use scenario_explorer_core::{
    config::ExplorerConfig,
    error::ProposalError,
    exploration::Experiment,
    proposer::{ActionCategory, ActionProposer, ProposedAction},
    repository::{InMemoryRepository, NodeRepository},
    root_cause::RootCause,
    scheduler::Explorer,
    scorecard::{Scorecard, ScorecardDelta},
    traits::{Demographics, EducationLevel, HouseholdComposition, Individual, ObservableTraits, Severity},
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const EXPERIMENT_ID: &str = "exp-ladder";

pub fn individual(index: u64, v: f64) -> Individual {
    Individual {
        individual_id: format!("ind-{index:05}"),
        index,
        demographics: Demographics {
            education: EducationLevel::Unknown,
            age: None,
            motor_impairment: Severity::Unknown,
            visual_impairment: Severity::Unknown,
            household: HouseholdComposition::Unknown,
        },
        observables: ObservableTraits {
            digital_literacy: v,
            similar_tool_experience: v,
            motor_ability: v,
            time_availability: v,
            domain_expertise: v,
        },
    }
}

/// Ten individuals with every observable at 0.05, 0.15, ..., 0.95.
///
/// With zero trial noise an individual succeeds exactly when every
/// normalized scorecard dimension is at or below their level, so a
/// uniform scorecard of 6.0 on [0, 10] succeeds for 4 of 10.
pub fn ladder_population() -> Vec<Individual> {
    (0..10).map(|i| individual(i, 0.05 + 0.1 * i as f64)).collect()
}

pub fn ladder_experiment() -> Experiment {
    Experiment {
        experiment_id: EXPERIMENT_ID.into(),
        label: "ladder".into(),
        baseline: Scorecard::new(6.0, 6.0, 6.0, 6.0),
        population: ladder_population(),
    }
}

/// Proposes `count` identical actions lowering every dimension by `step`.
pub struct UniformProposer {
    pub step:  f64,
    pub count: usize,
    pub calls: AtomicU32,
}

impl UniformProposer {
    pub fn new(step: f64, count: usize) -> Self {
        Self { step, count, calls: AtomicU32::new(0) }
    }
}

impl ActionProposer for UniformProposer {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn propose(
        &self,
        _scorecard: &Scorecard,
        _root_causes: &[RootCause],
        max_candidates: usize,
    ) -> Result<Vec<ProposedAction>, ProposalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.count.min(max_candidates))
            .map(|i| ProposedAction {
                description: format!("lower everything by {} (#{i})", self.step),
                category: ActionCategory::Simplification,
                scorecard_delta: ScorecardDelta::uniform(-self.step),
            })
            .collect())
    }
}

/// Always answers with no candidates.
pub struct EmptyProposer;

impl ActionProposer for EmptyProposer {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn propose(&self, _: &Scorecard, _: &[RootCause], _: usize) -> Result<Vec<ProposedAction>, ProposalError> {
        Ok(Vec::new())
    }
}

/// Always errors, counting attempts.
#[derive(Default)]
pub struct FailingProposer {
    pub calls: AtomicU32,
}

impl ActionProposer for FailingProposer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn propose(&self, _: &Scorecard, _: &[RootCause], _: usize) -> Result<Vec<ProposedAction>, ProposalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProposalError::Failed("upstream timeout".into()))
    }
}

/// Emits one candidate with a non-finite delta.
pub struct BrokenDeltaProposer;

impl ActionProposer for BrokenDeltaProposer {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn propose(&self, _: &Scorecard, _: &[RootCause], _: usize) -> Result<Vec<ProposedAction>, ProposalError> {
        Ok(vec![ProposedAction {
            description: "divide by zero".into(),
            category: ActionCategory::Other,
            scorecard_delta: ScorecardDelta::uniform(f64::NAN),
        }])
    }
}

pub fn explorer_with(
    repository: Arc<dyn NodeRepository>,
    proposer: Arc<dyn ActionProposer>,
    config: ExplorerConfig,
) -> Explorer {
    let explorer = Explorer::new(repository, proposer, config).expect("valid config");
    explorer
        .register_experiment(&ladder_experiment())
        .expect("register experiment");
    explorer
}

pub fn explorer(proposer: Arc<dyn ActionProposer>) -> Explorer {
    explorer_with(
        Arc::new(InMemoryRepository::new()),
        proposer,
        ExplorerConfig::default_test(),
    )
}
