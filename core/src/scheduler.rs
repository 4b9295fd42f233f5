//! Exploration Scheduler: beam search over scenario modifications.
//!
//! LEVEL ORDER (fixed, never reordered):
//!   1. Cancellation check
//!   2. Expansion: proposer call + candidate simulations, one task per
//!      beam node on a pool sized to beam_width
//!   3. Commit: nodes created and statuses written in beam order
//!   4. Beam selection: top beam_width by success rate, rest dominated
//!   5. Termination check
//!
//! RULES:
//!   - Only the commit step touches the repository, so node ids and
//!     winner selection do not depend on thread scheduling.
//!   - A level fully completes before the next one starts.
//!   - All randomness flows through the RngBank. Every node reuses the
//!     same per-individual trial streams, so sibling rates differ only
//!     by their scorecards.
//!   - Every state change is recorded in the event log.

use crate::{
    config::{ExplorationParams, ExplorerConfig},
    error::{ExploreError, ExploreResult, ProposalError, SimulationError},
    event::{EventLogEntry, ExplorationEvent},
    exploration::{
        Experiment, Exploration, ExplorationStatus, NewNode, NodeStatus, ScenarioNode, WinningPath,
    },
    proposer::{ActionProposer, ProposedAction},
    repository::NodeRepository,
    rng::RngBank,
    root_cause::RootCause,
    scorecard::Scorecard,
    simulator::{simulate_population, SimulationResult},
    types::{ExplorationId, NodeId},
};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A retained node the next level will expand.
#[derive(Debug, Clone)]
struct Frontier {
    node_id:      NodeId,
    scorecard:    Scorecard,
    success_rate: f64,
    root_causes:  Vec<RootCause>,
}

impl Frontier {
    fn new(node_id: NodeId, scorecard: Scorecard, result: &SimulationResult) -> Self {
        Self {
            node_id,
            scorecard,
            success_rate: result.success_rate,
            root_causes: result.root_causes.ranked(),
        }
    }
}

struct Candidate {
    action:    ProposedAction,
    scorecard: Scorecard,
    result:    Result<SimulationResult, SimulationError>,
}

/// Output of one beam node's expansion, computed off the commit path.
struct Expansion {
    llm_calls: u32,
    outcome:   Result<Vec<Candidate>, ProposalError>,
}

/// Removes an exploration from the running set however `run` exits.
struct RunGuard<'a> {
    running: &'a Mutex<HashSet<ExplorationId>>,
    id:      ExplorationId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.lock().remove(&self.id);
    }
}

pub struct Explorer {
    repository: Arc<dyn NodeRepository>,
    proposer:   Arc<dyn ActionProposer>,
    config:     ExplorerConfig,
    rng_bank:   RngBank,
    running:    Mutex<HashSet<ExplorationId>>,
    cancelled:  Mutex<HashSet<ExplorationId>>,
}

impl Explorer {
    pub fn new(
        repository: Arc<dyn NodeRepository>,
        proposer: Arc<dyn ActionProposer>,
        config: ExplorerConfig,
    ) -> ExploreResult<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            proposer,
            rng_bank: RngBank::new(config.seed),
            config,
            running: Mutex::new(HashSet::new()),
            cancelled: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn register_experiment(&self, experiment: &Experiment) -> ExploreResult<()> {
        self.repository.insert_experiment(experiment)?;
        log::info!(
            "experiment={}: registered with {} individuals",
            experiment.experiment_id,
            experiment.population.len()
        );
        Ok(())
    }

    /// Create a `pending` exploration using the configured LLM call budget.
    pub fn start(
        &self,
        experiment_id: &str,
        goal_value: f64,
        beam_width: u32,
        max_depth: u32,
    ) -> ExploreResult<Exploration> {
        self.start_with(
            experiment_id,
            ExplorationParams {
                goal_value,
                beam_width,
                max_depth,
                max_llm_calls: self.config.max_llm_calls,
            },
        )
    }

    /// Validation happens before anything is written.
    pub fn start_with(&self, experiment_id: &str, params: ExplorationParams) -> ExploreResult<Exploration> {
        params.validate()?;
        self.repository.get_experiment(experiment_id)?;

        let exploration = Exploration::new(
            uuid::Uuid::new_v4().to_string(),
            experiment_id.to_string(),
            &params,
        );
        self.repository.insert_exploration(&exploration)?;
        self.repository.append_event(
            &exploration.exploration_id,
            0,
            &ExplorationEvent::ExplorationStarted {
                experiment_id: experiment_id.to_string(),
                goal: params.goal_value,
                beam_width: params.beam_width,
                max_depth: params.max_depth,
            },
        )?;
        log::info!(
            "exploration={}: created for experiment={experiment_id} goal={} beam={} depth={} llm_calls={}",
            exploration.exploration_id,
            params.goal_value,
            params.beam_width,
            params.max_depth,
            params.max_llm_calls
        );
        Ok(exploration)
    }

    /// Drive a pending exploration to a terminal status.
    ///
    /// Re-invoking on a running or finished exploration returns its
    /// current state without doing any work.
    pub fn run(&self, exploration_id: &str) -> ExploreResult<Exploration> {
        if !self.running.lock().insert(exploration_id.to_string()) {
            log::debug!("exploration={exploration_id}: already running");
            return self.repository.get_exploration(exploration_id);
        }
        let _guard = RunGuard { running: &self.running, id: exploration_id.to_string() };

        let mut exploration = self.repository.get_exploration(exploration_id)?;
        if exploration.status != ExplorationStatus::Pending {
            return Ok(exploration);
        }
        let experiment = self.repository.get_experiment(&exploration.experiment_id)?;

        exploration.transition(ExplorationStatus::Running)?;
        self.repository.save_exploration(&exploration)?;

        match self.search(&mut exploration, &experiment) {
            Ok(status) => {
                self.finish(&mut exploration, status)?;
                Ok(exploration)
            }
            Err(e) => {
                log::error!("exploration={exploration_id}: aborted: {e}");
                if let Err(finish_err) = self.finish(&mut exploration, ExplorationStatus::Failed) {
                    log::error!("exploration={exploration_id}: could not record failure: {finish_err}");
                }
                Err(e)
            }
        }
    }

    /// Run an exploration on a background thread.
    pub fn spawn(self: &Arc<Self>, exploration_id: &str) -> ExploreResult<JoinHandle<ExploreResult<Exploration>>> {
        let explorer = Arc::clone(self);
        let id = exploration_id.to_string();
        std::thread::Builder::new()
            .name(format!("explore-{}", id.chars().take(8).collect::<String>()))
            .spawn(move || explorer.run(&id))
            .map_err(|e| ExploreError::Other(anyhow::anyhow!("cannot spawn exploration thread: {e}")))
    }

    /// Request cancellation. Takes effect before the next depth level.
    pub fn cancel(&self, exploration_id: &str) -> ExploreResult<()> {
        let exploration = self.repository.get_exploration(exploration_id)?;
        if exploration.status.is_terminal() {
            return Ok(());
        }
        self.cancelled.lock().insert(exploration_id.to_string());
        log::info!("exploration={exploration_id}: cancellation requested");
        Ok(())
    }

    pub fn exploration(&self, exploration_id: &str) -> ExploreResult<Exploration> {
        self.repository.get_exploration(exploration_id)
    }

    pub fn get_tree(&self, exploration_id: &str) -> ExploreResult<Vec<ScenarioNode>> {
        self.repository.get_exploration(exploration_id)?;
        self.repository.get_tree(exploration_id)
    }

    /// Root-to-winner path, or None when no node reached the goal.
    pub fn get_winning_path(&self, exploration_id: &str) -> ExploreResult<Option<WinningPath>> {
        let tree = self.get_tree(exploration_id)?;
        match tree.iter().find(|n| n.node_status == NodeStatus::Winner) {
            Some(winner) => WinningPath::from_tree(&tree, winner.node_id).map(Some),
            None => Ok(None),
        }
    }

    pub fn events(&self, exploration_id: &str) -> ExploreResult<Vec<EventLogEntry>> {
        self.repository.events(exploration_id)
    }

    // ── Search ─────────────────────────────────────────────────

    fn search(&self, exploration: &mut Exploration, experiment: &Experiment) -> ExploreResult<ExplorationStatus> {
        let id = exploration.exploration_id.clone();
        let goal = exploration.goal;

        let root_id = self.repository.create_node(&NewNode {
            exploration_id: id.clone(),
            parent_id: None,
            depth: 0,
            action: None,
            category: None,
            scorecard: experiment.baseline,
        })?;
        exploration.total_nodes += 1;

        let root = match self.simulate(experiment, &experiment.baseline) {
            Ok(result) => {
                self.record_result(exploration, root_id, None, 0, &result)?;
                Frontier::new(root_id, experiment.baseline, &result)
            }
            Err(e) => {
                log::error!("exploration={id} depth=0: baseline simulation failed: {e}");
                self.record_created(exploration, root_id, None, 0, None)?;
                self.mark(&id, 0, root_id, NodeStatus::ExpansionFailed, Some(e.to_string()))?;
                return Ok(ExplorationStatus::Failed);
            }
        };
        log::info!("exploration={id} depth=0: baseline success_rate={:.3}", root.success_rate);

        if root.success_rate >= goal {
            self.mark(&id, 0, root_id, NodeStatus::Winner, None)?;
            return Ok(ExplorationStatus::GoalAchieved);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(exploration.beam_width as usize)
            .thread_name(|i| format!("expand-{i}"))
            .build()
            .map_err(|e| ExploreError::Other(anyhow::anyhow!("cannot build expansion pool: {e}")))?;

        let mut beam = vec![root];
        for depth in 1..=exploration.max_depth {
            if self.cancelled.lock().remove(&id) {
                log::warn!("exploration={id} depth={depth}: cancelled before expansion");
                return Ok(ExplorationStatus::Failed);
            }
            exploration.current_depth = depth;

            // One call per beam node in beam order; retries share what is left.
            let budget = exploration.llm_budget_left();
            let funded = beam.len().min(budget as usize);
            if funded < beam.len() {
                log::warn!(
                    "exploration={id} depth={depth}: budget covers {funded} of {} beam nodes",
                    beam.len()
                );
            }
            let spare = AtomicU32::new(budget - funded as u32);
            let expansions: Vec<Expansion> = pool.install(|| {
                beam[..funded]
                    .par_iter()
                    .map(|parent| self.expand(experiment, parent, &spare))
                    .collect()
            });

            // Commit in beam order.
            let mut created: Vec<Frontier> = Vec::new();
            let mut failed: Vec<NodeId> = Vec::new();
            let mut proposal_failures = 0usize;
            let mut winner: Option<NodeId> = None;
            let mut discarded = 0usize;

            let mut pending = expansions.into_iter().enumerate();
            for (slot, expansion) in pending.by_ref() {
                let parent = &beam[slot];
                exploration.total_llm_calls += expansion.llm_calls;
                let candidates = match expansion.outcome {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        proposal_failures += 1;
                        log::warn!(
                            "exploration={id} depth={depth}: proposer failed for node {} after {} calls: {e}",
                            parent.node_id,
                            expansion.llm_calls
                        );
                        let node_id = self.repository.create_node(&NewNode {
                            exploration_id: id.clone(),
                            parent_id: Some(parent.node_id),
                            depth,
                            action: None,
                            category: None,
                            scorecard: parent.scorecard,
                        })?;
                        exploration.total_nodes += 1;
                        self.record_created(exploration, node_id, Some(parent.node_id), depth, None)?;
                        self.mark(&id, depth, node_id, NodeStatus::ExpansionFailed, Some(e.to_string()))?;
                        failed.push(node_id);
                        continue;
                    }
                };

                let mut candidates = candidates.into_iter();
                for candidate in candidates.by_ref() {
                    let node_id = self.repository.create_node(&NewNode {
                        exploration_id: id.clone(),
                        parent_id: Some(parent.node_id),
                        depth,
                        action: Some(candidate.action.description.clone()),
                        category: Some(candidate.action.category),
                        scorecard: candidate.scorecard,
                    })?;
                    exploration.total_nodes += 1;

                    match candidate.result {
                        Ok(result) => {
                            self.record_result(exploration, node_id, Some(parent.node_id), depth, &result)?;
                            if result.success_rate >= goal {
                                self.mark(&id, depth, node_id, NodeStatus::Winner, None)?;
                                winner = Some(node_id);
                                break;
                            }
                            created.push(Frontier::new(node_id, candidate.scorecard, &result));
                        }
                        Err(e) => {
                            log::warn!("exploration={id} depth={depth}: simulation failed for node {node_id}: {e}");
                            self.record_created(exploration, node_id, Some(parent.node_id), depth, None)?;
                            self.mark(&id, depth, node_id, NodeStatus::ExpansionFailed, Some(e.to_string()))?;
                            failed.push(node_id);
                        }
                    }
                }
                if winner.is_some() {
                    discarded += candidates.len();
                    break;
                }
            }

            if let Some(node_id) = winner {
                // Later beam nodes were expanded in parallel; their calls still count.
                let mut skipped_calls = 0u32;
                for (_, expansion) in pending {
                    skipped_calls += expansion.llm_calls;
                    exploration.total_llm_calls += expansion.llm_calls;
                    discarded += expansion.outcome.map_or(0, |c| c.len());
                }
                log::debug!(
                    "exploration={id} depth={depth}: discarded {discarded} computed candidates \
                     ({skipped_calls} llm calls from later beam nodes) after winner"
                );
                log::info!("exploration={id} depth={depth}: node {node_id} reached goal {goal}");
                self.repository.save_exploration(exploration)?;
                return Ok(ExplorationStatus::GoalAchieved);
            }

            // Highest rate first, oldest node on ties.
            created.sort_by(|a, b| {
                b.success_rate
                    .total_cmp(&a.success_rate)
                    .then(a.node_id.cmp(&b.node_id))
            });
            let keep = created.len().min(exploration.beam_width as usize);
            let pruned = created.split_off(keep);
            for node in &pruned {
                self.mark(&id, depth, node.node_id, NodeStatus::Dominated, None)?;
            }
            beam = self.next_beam(&id, depth, created)?;

            self.repository.append_event(
                &id,
                depth,
                &ExplorationEvent::DepthCompleted {
                    depth,
                    retained: beam.iter().map(|n| n.node_id).collect(),
                    pruned: pruned.iter().map(|n| n.node_id).collect(),
                    failed,
                },
            )?;
            self.repository.save_exploration(exploration)?;
            log::info!(
                "exploration={id} depth={depth}: retained={} pruned={} best={:.3} llm_calls={}/{}",
                beam.len(),
                pruned.len(),
                exploration.best_success_rate,
                exploration.total_llm_calls,
                exploration.max_llm_calls
            );

            if funded > 0 && proposal_failures == funded {
                return Ok(ExplorationStatus::Failed);
            }
            if depth == exploration.max_depth {
                return Ok(ExplorationStatus::DepthExhausted);
            }
            if exploration.total_llm_calls >= exploration.max_llm_calls {
                return Ok(ExplorationStatus::LlmBudgetExhausted);
            }
            if beam.is_empty() {
                log::warn!("exploration={id} depth={depth}: no active candidates left");
                return Ok(ExplorationStatus::Failed);
            }
        }
        Ok(ExplorationStatus::DepthExhausted)
    }

    /// The repository's active nodes at `depth`, in ranked order. Ranking
    /// data comes from the level just committed; an active node the level
    /// did not produce is an error.
    fn next_beam(&self, id: &str, depth: u32, ranked: Vec<Frontier>) -> ExploreResult<Vec<Frontier>> {
        let active: HashSet<NodeId> = self
            .repository
            .get_active_nodes(id, depth)?
            .into_iter()
            .map(|n| n.node_id)
            .collect();
        if let Some(stray) = active.iter().find(|n| !ranked.iter().any(|f| f.node_id == **n)) {
            return Err(ExploreError::Other(anyhow::anyhow!(
                "exploration={id} depth={depth}: active node {stray} was not committed by this level"
            )));
        }
        let retained = ranked.len();
        let beam: Vec<Frontier> = ranked.into_iter().filter(|f| active.contains(&f.node_id)).collect();
        if beam.len() < retained {
            log::warn!("exploration={id} depth={depth}: {} of {retained} retained nodes are no longer active", retained - beam.len());
        }
        Ok(beam)
    }

    /// Propose and simulate for one beam node. Touches no shared state
    /// except the spare call counter.
    fn expand(&self, experiment: &Experiment, parent: &Frontier, spare: &AtomicU32) -> Expansion {
        let max_candidates = self.config.max_candidates;
        let mut llm_calls = 0u32;
        let outcome = loop {
            llm_calls += 1;
            let err = match self.proposer.propose(&parent.scorecard, &parent.root_causes, max_candidates) {
                Ok(actions) if !actions.is_empty() => break Ok(actions),
                Ok(_) => ProposalError::Empty,
                Err(e) => e,
            };
            log::debug!(
                "proposer {}: attempt {llm_calls} for node {} failed: {err}",
                self.proposer.name(),
                parent.node_id
            );
            let retry_allowed = llm_calls <= self.config.proposer_max_retries
                && spare.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
            if !retry_allowed {
                break Err(err);
            }
        };

        let outcome = outcome.map(|actions| {
            actions
                .into_iter()
                .take(max_candidates)
                .map(|action| {
                    // A rejected delta keeps the parent's card so the stored node stays finite.
                    let (scorecard, result) =
                        match parent.scorecard.apply(&action.scorecard_delta, &self.config.scorecard_ranges) {
                            Ok(scorecard) => {
                                let result = self
                                    .simulate(experiment, &scorecard)
                                    .map(|r| r.with_parent(parent.success_rate));
                                (scorecard, result)
                            }
                            Err(e) => (parent.scorecard, Err(e)),
                        };
                    Candidate { action, scorecard, result }
                })
                .collect()
        });
        Expansion { llm_calls, outcome }
    }

    fn simulate(&self, experiment: &Experiment, scorecard: &Scorecard) -> Result<SimulationResult, SimulationError> {
        simulate_population(
            &experiment.population,
            scorecard,
            &self.config.scorecard_ranges,
            self.config.trial_settings(),
            &self.rng_bank,
        )
    }

    // ── Commit helpers ─────────────────────────────────────────

    fn record_result(
        &self,
        exploration: &mut Exploration,
        node_id: NodeId,
        parent_id: Option<NodeId>,
        depth: u32,
        result: &SimulationResult,
    ) -> ExploreResult<()> {
        self.repository.save_simulation_result(node_id, result)?;
        exploration.observe_success_rate(result.success_rate);
        self.record_created(exploration, node_id, parent_id, depth, Some(result.success_rate))
    }

    fn record_created(
        &self,
        exploration: &Exploration,
        node_id: NodeId,
        parent_id: Option<NodeId>,
        depth: u32,
        success_rate: Option<f64>,
    ) -> ExploreResult<()> {
        log::debug!(
            "exploration={} depth={depth}: node {node_id} parent={parent_id:?} success_rate={success_rate:?}",
            exploration.exploration_id
        );
        self.repository.append_event(
            &exploration.exploration_id,
            depth,
            &ExplorationEvent::NodeCreated { node_id, parent_id, depth, success_rate },
        )
    }

    fn mark(
        &self,
        exploration_id: &str,
        depth: u32,
        node_id: NodeId,
        status: NodeStatus,
        reason: Option<String>,
    ) -> ExploreResult<()> {
        self.repository.update_status(node_id, status, reason.as_deref())?;
        self.repository.append_event(
            exploration_id,
            depth,
            &ExplorationEvent::NodeStatusChanged { node_id, status, reason },
        )
    }

    fn finish(&self, exploration: &mut Exploration, status: ExplorationStatus) -> ExploreResult<()> {
        self.cancelled.lock().remove(&exploration.exploration_id);
        exploration.transition(status)?;
        self.repository.save_exploration(exploration)?;
        self.repository.append_event(
            &exploration.exploration_id,
            exploration.current_depth,
            &ExplorationEvent::ExplorationTerminated {
                status,
                best_success_rate: exploration.best_success_rate,
            },
        )?;
        log::info!(
            "exploration={} depth={}: finished {} nodes={} llm_calls={} best={:.3}",
            exploration.exploration_id,
            exploration.current_depth,
            status.as_str(),
            exploration.total_nodes,
            exploration.total_llm_calls,
            exploration.best_success_rate
        );
        Ok(())
    }
}
