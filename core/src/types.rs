//! Shared primitive types used across the engine.

/// Arena key of a scenario node. Assigned in creation order, starting at 1.
pub type NodeId = i64;

/// The canonical exploration identifier.
pub type ExplorationId = String;

/// Identifier of the experiment an exploration optimizes.
pub type ExperimentId = String;

/// Stable identifier of one synthetic individual.
pub type IndividualId = String;
