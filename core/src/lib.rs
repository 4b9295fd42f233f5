pub mod config;
pub mod error;
pub mod event;
pub mod exploration;
pub mod population;
pub mod proposer;
pub mod repository;
pub mod rng;
pub mod root_cause;
pub mod scheduler;
pub mod scorecard;
pub mod simulator;
pub mod store;
pub mod traits;
pub mod types;
