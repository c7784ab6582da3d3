//! Runtime components for driving producer and consumer threads.

pub mod simulation;
mod worker;

pub use simulation::{
    ConfigError, RunReport, Simulation, SimulationConfig, SimulationError, ITEM_MAX,
};
