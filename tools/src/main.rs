//! explore-runner: headless scenario exploration runner.
//!
//! Usage:
//!   explore-runner --seed 12345 --goal 0.6 --beam-width 3 --max-depth 5
//!   explore-runner --config explorer.json --db explore.db --population 500
//!   explore-runner --json

use anyhow::Result;
use scenario_explorer_core::{
    config::{ExplorationParams, ExplorerConfig},
    exploration::{Experiment, Exploration, NodeStatus, WinningPath},
    population::generate_population,
    proposer::HeuristicProposer,
    repository::{InMemoryRepository, NodeRepository},
    rng::RngBank,
    scheduler::Explorer,
    scorecard::Scorecard,
    store::ExploreStore,
};
use std::env;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match str_arg(&args, "--config") {
        Some(path) => ExplorerConfig::load(path)?,
        None => ExplorerConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.population_size = parse_arg(&args, "--population", config.population_size);
    config.validate()?;

    let params = ExplorationParams {
        goal_value: parse_arg(&args, "--goal", 0.6),
        beam_width: parse_arg(&args, "--beam-width", 3u32),
        max_depth: parse_arg(&args, "--max-depth", 5u32),
        max_llm_calls: parse_arg(&args, "--max-llm-calls", config.max_llm_calls),
    };
    let json = args.iter().any(|a| a == "--json");
    let db = str_arg(&args, "--db");

    if !json {
        println!("Scenario Explorer: explore-runner");
        println!("  seed:        {}", config.seed);
        println!("  population:  {}", config.population_size);
        println!("  goal:        {}", params.goal_value);
        println!("  beam width:  {}", params.beam_width);
        println!("  max depth:   {}", params.max_depth);
        println!("  db:          {}", db.unwrap_or(":memory:"));
        println!();
    }

    let repository: Arc<dyn NodeRepository> = match db {
        Some(path) => {
            let store = ExploreStore::open(path)?;
            store.migrate()?;
            log::info!("explore-runner: using store at {path}");
            Arc::new(store)
        }
        None => Arc::new(InMemoryRepository::new()),
    };
    let proposer = Arc::new(HeuristicProposer::new(config.scorecard_ranges));

    let experiment = Experiment {
        experiment_id: format!("synthetic-{}", config.seed),
        label: "synthetic onboarding".into(),
        baseline: baseline_scorecard(&config),
        population: generate_population(config.population_size, &RngBank::new(config.seed)),
    };

    let explorer = Explorer::new(repository, proposer, config)?;
    explorer.register_experiment(&experiment)?;
    let started = explorer.start_with(&experiment.experiment_id, params)?;
    let finished = explorer.run(&started.exploration_id)?;
    let path = explorer.get_winning_path(&finished.exploration_id)?;

    if json {
        let out = serde_json::json!({ "exploration": finished, "winning_path": path });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&explorer, &finished, path.as_ref())?;
    }
    Ok(())
}

/// A deliberately demanding starting scenario: three quarters up each range.
fn baseline_scorecard(config: &ExplorerConfig) -> Scorecard {
    let r = &config.scorecard_ranges;
    let at = |min: f64, max: f64| min + 0.75 * (max - min);
    Scorecard::new(
        at(r.complexity.min, r.complexity.max),
        at(r.initial_effort.min, r.initial_effort.max),
        at(r.perceived_risk.min, r.perceived_risk.max),
        at(r.time_to_value.min, r.time_to_value.max),
    )
}

fn print_summary(explorer: &Explorer, x: &Exploration, path: Option<&WinningPath>) -> Result<()> {
    let tree = explorer.get_tree(&x.exploration_id)?;
    let count = |status: NodeStatus| tree.iter().filter(|n| n.node_status == status).count();

    println!("=== EXPLORATION SUMMARY ===");
    println!("  exploration:    {}", x.exploration_id);
    println!("  status:         {}", x.status.as_str());
    println!("  depth reached:  {} / {}", x.current_depth, x.max_depth);
    println!("  nodes:          {}", x.total_nodes);
    println!("    active:       {}", count(NodeStatus::Active));
    println!("    dominated:    {}", count(NodeStatus::Dominated));
    println!("    failed:       {}", count(NodeStatus::ExpansionFailed));
    println!("  llm calls:      {} / {}", x.total_llm_calls, x.max_llm_calls);
    println!("  best success:   {:.1}%", x.best_success_rate * 100.0);
    println!("  goal:           {:.1}%", x.goal * 100.0);

    println!();
    println!("=== WINNING PATH ===");
    match path {
        None => println!("  (no node reached the goal)"),
        Some(path) => {
            for step in &path.steps {
                let delta = step
                    .delta_success_rate
                    .map(|d| format!("{:+.1}pp", d * 100.0))
                    .unwrap_or_else(|| "baseline".into());
                println!(
                    "  d{} #{:<4} {:>5.1}%  {:<10} {}",
                    step.depth,
                    step.node_id,
                    step.success_rate * 100.0,
                    delta,
                    step.action.as_deref().unwrap_or("-"),
                );
            }
            println!("  total improvement: {:+.1}pp", path.total_improvement * 100.0);
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
