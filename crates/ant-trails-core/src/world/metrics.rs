use super::World;
use crate::ant::AntState;
use crate::pheromone::Channel;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub substeps: usize,
    pub grid_update_us: u64,
    pub ant_update_us: u64,
    pub housekeeping_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub frame: usize,
    pub sim_time: f64,
    pub ant_count: usize,
    pub carrying_count: usize,
    pub food_stored: u64,
    pub food_source_count: usize,
    pub food_remaining: u64,
    /// Pickups and deliveries during the most recent frame only.
    pub pickups: usize,
    pub deliveries: usize,
    pub home_signal_total: f64,
    pub food_signal_total: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AntView {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub state: AntState,
    pub carrying_food: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodView {
    pub x: f64,
    pub y: f64,
    pub amount: u32,
    pub radius: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NestView {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub food_stored: u64,
}

/// Everything a renderer needs to draw one frame, minus the pheromone cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub frame: usize,
    pub sim_time: f64,
    pub width: f64,
    pub height: f64,
    pub nest: NestView,
    pub food_sources: Vec<FoodView>,
    pub ants: Vec<AntView>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub frames: usize,
    pub frame_dt: f64,
    pub sample_every: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_pickups: usize,
    #[serde(default)]
    pub total_deliveries: usize,
    #[serde(default)]
    pub food_sources_spawned: usize,
    #[serde(default)]
    pub food_sources_depleted: usize,
    #[serde(default)]
    pub ants_spawned: usize,
    pub final_ant_count: usize,
    pub final_food_stored: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<WorldSnapshot>,
}

impl World {
    pub(crate) fn collect_step_metrics(&self) -> StepMetrics {
        StepMetrics {
            frame: self.frame_index,
            sim_time: self.sim_time,
            ant_count: self.ants.len(),
            carrying_count: self.ants.iter().filter(|a| a.is_carrying_food()).count(),
            food_stored: self.nest.food_stored,
            food_source_count: self.food_sources.len(),
            food_remaining: self.food_sources.iter().map(|s| s.amount as u64).sum(),
            pickups: self.pickups_last_frame,
            deliveries: self.deliveries_last_frame,
            home_signal_total: self.grid.total(Channel::Home),
            food_signal_total: self.grid.total(Channel::Food),
        }
    }

    pub fn metrics(&self) -> StepMetrics {
        self.collect_step_metrics()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            frame: self.frame_index,
            sim_time: self.sim_time,
            width: self.config.width,
            height: self.config.height,
            nest: NestView {
                x: self.nest.position[0],
                y: self.nest.position[1],
                radius: self.nest.radius,
                food_stored: self.nest.food_stored,
            },
            food_sources: self
                .food_sources
                .iter()
                .map(|s| FoodView {
                    x: s.position[0],
                    y: s.position[1],
                    amount: s.amount,
                    radius: s.radius,
                })
                .collect(),
            ants: self
                .ants
                .iter()
                .map(|a| AntView {
                    id: a.id,
                    x: a.position[0],
                    y: a.position[1],
                    heading: a.heading,
                    state: a.state(),
                    carrying_food: a.is_carrying_food(),
                })
                .collect(),
        }
    }
}
