pub mod ant;
pub mod config;
pub mod food;
pub mod math;
pub mod pheromone;
pub mod spatial;
pub mod world;

pub use ant::{Ant, AntParams, AntState, ForagingContext};
pub use config::{FoodSpawnProfile, SimConfig, SimConfigError};
pub use food::{FoodSource, Nest};
pub use pheromone::{Channel, HeatCell, PheromoneGrid};
pub use world::{
    AntView, ExperimentError, FoodView, NestView, RunSummary, StepMetrics, StepTimings,
    SubstepPlan, World, WorldInitError, WorldSnapshot,
};
