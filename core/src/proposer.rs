//! Action Proposer: the capability that suggests scenario modifications.
//!
//! The scheduler only ever sees the ActionProposer trait. An LLM-backed
//! client implements it outside this crate; HeuristicProposer is the
//! deterministic in-crate implementation used by the runner.

use crate::{
    error::ProposalError,
    root_cause::RootCause,
    scorecard::{Dimension, Scorecard, ScorecardDelta, ScorecardRanges},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Simplification,
    Onboarding,
    TrustBuilding,
    QuickWin,
    Support,
    Incentive,
    #[serde(other)]
    Other,
}

impl ActionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simplification => "simplification",
            Self::Onboarding => "onboarding",
            Self::TrustBuilding => "trust_building",
            Self::QuickWin => "quick_win",
            Self::Support => "support",
            Self::Incentive => "incentive",
            Self::Other => "other",
        }
    }

    /// Unrecognised labels map to Other rather than failing.
    pub fn parse(s: &str) -> Self {
        match s {
            "simplification" => Self::Simplification,
            "onboarding" => Self::Onboarding,
            "trust_building" => Self::TrustBuilding,
            "quick_win" => Self::QuickWin,
            "support" => Self::Support,
            "incentive" => Self::Incentive,
            _ => Self::Other,
        }
    }
}

/// One candidate modification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedAction {
    pub description:     String,
    pub category:        ActionCategory,
    pub scorecard_delta: ScorecardDelta,
}

/// The contract every proposer must fulfill.
///
/// Implementations are stateless per call and shared across the
/// expansion worker pool, hence Send + Sync.
pub trait ActionProposer: Send + Sync {
    /// Unique stable name for logging.
    fn name(&self) -> &'static str;

    /// Suggest up to `max_candidates` modifications of `scorecard`.
    ///
    /// `root_causes` lists the node's diagnosed causes, most frequent
    /// first. May return fewer candidates than requested, or none.
    fn propose(
        &self,
        scorecard: &Scorecard,
        root_causes: &[RootCause],
        max_candidates: usize,
    ) -> Result<Vec<ProposedAction>, ProposalError>;
}

struct CatalogEntry {
    description: &'static str,
    category:    ActionCategory,
    /// Reduction as a share of the dimension's range width.
    reduction:   f64,
}

const fn entry(description: &'static str, category: ActionCategory, reduction: f64) -> CatalogEntry {
    CatalogEntry { description, category, reduction }
}

fn catalog(dim: Dimension) -> &'static [CatalogEntry] {
    static COMPLEXITY: [CatalogEntry; 2] = [
        entry("Replace the multi-step setup with a guided wizard", ActionCategory::Simplification, 0.15),
        entry("Hide advanced options behind progressive disclosure", ActionCategory::Simplification, 0.10),
    ];
    static EFFORT: [CatalogEntry; 2] = [
        entry("Pre-fill the signup form from data the user already shared", ActionCategory::Onboarding, 0.15),
        entry("Offer a one-click trial with sample content", ActionCategory::Incentive, 0.10),
    ];
    static RISK: [CatalogEntry; 2] = [
        entry("Show a free cancellation guarantee before signup", ActionCategory::TrustBuilding, 0.15),
        entry("Add testimonials from comparable users", ActionCategory::TrustBuilding, 0.10),
    ];
    static TIME_TO_VALUE: [CatalogEntry; 2] = [
        entry("Deliver a first useful result within the first session", ActionCategory::QuickWin, 0.15),
        entry("Offer live chat help during the first week", ActionCategory::Support, 0.10),
    ];
    match dim {
        Dimension::Complexity => &COMPLEXITY,
        Dimension::InitialEffort => &EFFORT,
        Dimension::PerceivedRisk => &RISK,
        Dimension::TimeToValue => &TIME_TO_VALUE,
    }
}

/// Rule-based proposer: targets the dimensions behind the node's
/// most frequent root causes, round-robin over a fixed catalog.
pub struct HeuristicProposer {
    ranges: ScorecardRanges,
}

impl HeuristicProposer {
    pub fn new(ranges: ScorecardRanges) -> Self {
        Self { ranges }
    }

    /// Dimensions to work on, most pressing first. Falls back to any
    /// dimension above its range midpoint when no causes were diagnosed.
    fn target_dimensions(&self, scorecard: &Scorecard, root_causes: &[RootCause]) -> Vec<Dimension> {
        let mut dims: Vec<Dimension> = Vec::new();
        for cause in root_causes {
            let dim = cause.dimension();
            if !dims.contains(&dim) {
                dims.push(dim);
            }
        }
        if dims.is_empty() {
            dims = Dimension::ALL
                .into_iter()
                .filter(|d| scorecard.get(*d) > self.ranges.get(*d).midpoint())
                .collect();
        }
        // Nothing left to gain on a dimension already at its floor.
        dims.retain(|d| scorecard.get(*d) > self.ranges.get(*d).min);
        dims
    }
}

impl ActionProposer for HeuristicProposer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn propose(
        &self,
        scorecard: &Scorecard,
        root_causes: &[RootCause],
        max_candidates: usize,
    ) -> Result<Vec<ProposedAction>, ProposalError> {
        let dims = self.target_dimensions(scorecard, root_causes);
        let rounds = dims.iter().map(|d| catalog(*d).len()).max().unwrap_or(0);

        let mut out = Vec::new();
        'fill: for round in 0..rounds {
            for dim in &dims {
                if out.len() >= max_candidates {
                    break 'fill;
                }
                if let Some(e) = catalog(*dim).get(round) {
                    let range = self.ranges.get(*dim);
                    out.push(ProposedAction {
                        description: e.description.to_string(),
                        category: e.category,
                        scorecard_delta: ScorecardDelta::single(*dim, -(range.max - range.min) * e.reduction),
                    });
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_most_frequent_cause_first() {
        let p = HeuristicProposer::new(ScorecardRanges::default());
        let card = Scorecard::new(6.0, 6.0, 6.0, 6.0);
        let out = p
            .propose(&card, &[RootCause::TrustGap, RootCause::PatienceGap], 3)
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].scorecard_delta.perceived_risk < 0.0);
        assert!(out[1].scorecard_delta.time_to_value < 0.0);
        assert!(out[2].scorecard_delta.perceived_risk < 0.0);
    }

    #[test]
    fn capability_and_friction_share_a_dimension() {
        let p = HeuristicProposer::new(ScorecardRanges::default());
        let card = Scorecard::new(6.0, 1.0, 1.0, 1.0);
        let out = p
            .propose(&card, &[RootCause::CapabilityGap, RootCause::FrictionGap], 5)
            .unwrap();
        assert_eq!(out.len(), 2, "only the complexity catalog applies");
        assert!(out.iter().all(|a| a.category == ActionCategory::Simplification));
    }

    #[test]
    fn nothing_to_improve_returns_empty() {
        let p = HeuristicProposer::new(ScorecardRanges::default());
        let floor = Scorecard::new(0.0, 0.0, 0.0, 0.0);
        assert!(p.propose(&floor, &[RootCause::MotivationGap], 3).unwrap().is_empty());
    }

    #[test]
    fn unknown_category_parses_to_other() {
        assert_eq!(ActionCategory::parse("pricing"), ActionCategory::Other);
        let c: ActionCategory = serde_json::from_str("\"pricing\"").unwrap();
        assert_eq!(c, ActionCategory::Other);
    }
}
