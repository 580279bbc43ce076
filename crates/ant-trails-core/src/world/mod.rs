pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::ant::{Ant, AntParams};
use crate::config::{SimConfig, SimConfigError};
use crate::food::{FoodSource, Nest};
use crate::math::{random_between, wrap};
use crate::pheromone::PheromoneGrid;
use crate::spatial::{self, FoodLocation};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rstar::RTree;
use thiserror::Error;
use tracing::debug;

/// How one frame delta is split into equal sub-steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubstepPlan {
    pub count: usize,
    pub dt: f64,
}

impl SubstepPlan {
    /// Clamp `frame_dt` to `[0, max_frame_dt]` and divide it into the fewest
    /// equal sub-steps no longer than `max_substep_dt`. Non-finite deltas
    /// count as zero.
    pub fn from_frame(frame_dt: f64, max_frame_dt: f64, max_substep_dt: f64) -> Self {
        let capped = if frame_dt.is_finite() {
            frame_dt.max(0.0).min(max_frame_dt)
        } else {
            0.0
        };
        // The small bias keeps e.g. 0.12 / 0.02 from rounding up to 7 steps.
        let mut count = ((capped / max_substep_dt - 1e-9).ceil().max(1.0)) as usize;
        if capped / count as f64 > max_substep_dt {
            count += 1;
        }
        Self {
            count,
            dt: capped / count as f64,
        }
    }
}

pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) ant_params: AntParams,
    pub(crate) grid: PheromoneGrid,
    pub(crate) nest: Nest,
    pub(crate) food_sources: Vec<FoodSource>,
    // Rebuilt whenever `food_sources` gains or loses entries.
    pub(crate) food_index: RTree<FoodLocation>,
    pub(crate) ants: Vec<Ant>,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) next_ant_id: u32,
    pub(crate) sim_time: f64,
    pub(crate) frame_index: usize,
    pub(crate) pickups_last_frame: usize,
    pub(crate) deliveries_last_frame: usize,
    pub(crate) total_pickups: usize,
    pub(crate) total_deliveries: usize,
    pub(crate) food_sources_spawned: usize,
    pub(crate) food_sources_depleted: usize,
    pub(crate) ants_spawned: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("frame_dt must be non-negative and finite")]
    InvalidFrameDt,
    #[error("frames ({actual}) exceed supported maximum ({max})")]
    TooManyFrames { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
}

impl World {
    pub const MAX_EXPERIMENT_FRAMES: usize = 10_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 100_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let grid = PheromoneGrid::new(
            config.width,
            config.height,
            config.cell_size,
            config.max_intensity,
            config.evaporation_rate,
            config.diffusion_rate,
        )
        .with_evaporation_epsilon(config.evaporation_epsilon);
        let nest = Nest::new(
            [config.width * 0.5, config.height * 0.5],
            config.nest_radius,
        );

        let mut world = Self {
            ant_params: config.ant_params(),
            grid,
            nest,
            food_sources: Vec::new(),
            food_index: RTree::new(),
            ants: Vec::with_capacity(config.max_ants),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            next_ant_id: 0,
            sim_time: 0.0,
            frame_index: 0,
            pickups_last_frame: 0,
            deliveries_last_frame: 0,
            total_pickups: 0,
            total_deliveries: 0,
            food_sources_spawned: 0,
            food_sources_depleted: 0,
            ants_spawned: 0,
            config,
        };
        world.spawn_initial_food();
        for _ in 0..world.config.initial_ants {
            world.spawn_ant();
        }
        debug!(
            width = world.config.width,
            height = world.config.height,
            cols = world.grid.cols(),
            rows = world.grid.rows(),
            ants = world.ants.len(),
            food_sources = world.food_sources.len(),
            "world created"
        );
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &PheromoneGrid {
        &self.grid
    }

    pub fn ants(&self) -> &[Ant] {
        &self.ants
    }

    pub fn ants_mut(&mut self) -> &mut [Ant] {
        &mut self.ants
    }

    pub fn food_sources(&self) -> &[FoodSource] {
        &self.food_sources
    }

    /// Replace every food source and rebuild the lookup index.
    pub fn set_food_sources(&mut self, sources: Vec<FoodSource>) {
        self.food_sources = sources;
        self.rebuild_food_index();
    }

    pub fn nest(&self) -> &Nest {
        &self.nest
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn total_pickups(&self) -> usize {
        self.total_pickups
    }

    pub fn total_deliveries(&self) -> usize {
        self.total_deliveries
    }

    /// Change the world extent.
    ///
    /// The grid is rebuilt with zeroed channels, the nest moves to the new
    /// center with an empty store, food is regenerated and every ant restarts
    /// as a searcher near the nest. Invalid dimensions leave the world untouched.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), WorldInitError> {
        self.config.validate_extent(width, height)?;
        self.config.width = width;
        self.config.height = height;
        self.grid.resize(width, height);
        self.nest.position = [width * 0.5, height * 0.5];
        self.nest.food_stored = 0;

        self.food_sources.clear();
        self.rebuild_food_index();
        self.spawn_initial_food();

        let spread = self.nest.radius * 0.5;
        let mut ants = std::mem::take(&mut self.ants);
        for ant in &mut ants {
            let position = [
                wrap(
                    self.nest.position[0] + random_between(&mut self.rng, -spread, spread),
                    0.0,
                    width,
                ),
                wrap(
                    self.nest.position[1] + random_between(&mut self.rng, -spread, spread),
                    0.0,
                    height,
                ),
            ];
            let speed = self.random_speed();
            ant.reset(position, speed, self.sim_time, &mut self.rng);
        }
        self.ants = ants;

        debug!(
            width,
            height,
            cols = self.grid.cols(),
            rows = self.grid.rows(),
            food_sources = self.food_sources.len(),
            "world resized"
        );
        Ok(())
    }

    pub fn run_experiment(
        &mut self,
        frames: usize,
        frame_dt: f64,
        sample_every: usize,
    ) -> RunSummary {
        self.try_run_experiment(frames, frame_dt, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        frames: usize,
        frame_dt: f64,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_snapshots(frames, frame_dt, sample_every, &[])
    }

    /// Run an experiment like `try_run_experiment`, but also capture a full
    /// world snapshot after each frame listed in `snapshot_frames`.
    pub fn try_run_experiment_with_snapshots(
        &mut self,
        frames: usize,
        frame_dt: f64,
        sample_every: usize,
        snapshot_frames: &[usize],
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if !(frame_dt >= 0.0 && frame_dt.is_finite()) {
            return Err(ExperimentError::InvalidFrameDt);
        }
        if frames > Self::MAX_EXPERIMENT_FRAMES {
            return Err(ExperimentError::TooManyFrames {
                max: Self::MAX_EXPERIMENT_FRAMES,
                actual: frames,
            });
        }
        let estimated_samples = if frames == 0 {
            0
        } else {
            ((frames - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let pickups_before = self.total_pickups;
        let deliveries_before = self.total_deliveries;
        let spawned_before = self.food_sources_spawned;
        let depleted_before = self.food_sources_depleted;
        let ants_before = self.ants_spawned;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(snapshot_frames.len());

        for frame in 1..=frames {
            self.step(frame_dt);
            if frame % sample_every == 0 || frame == frames {
                samples.push(self.collect_step_metrics());
            }
            if snapshot_frames.contains(&frame) {
                snapshots.push(self.snapshot());
            }
        }
        debug!(
            frames,
            deliveries = self.total_deliveries - deliveries_before,
            ants = self.ants.len(),
            "experiment finished"
        );
        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            frames,
            frame_dt,
            sample_every,
            samples,
            total_pickups: self.total_pickups - pickups_before,
            total_deliveries: self.total_deliveries - deliveries_before,
            food_sources_spawned: self.food_sources_spawned - spawned_before,
            food_sources_depleted: self.food_sources_depleted - depleted_before,
            ants_spawned: self.ants_spawned - ants_before,
            final_ant_count: self.ants.len(),
            final_food_stored: self.nest.food_stored,
            snapshots,
        })
    }

    pub(crate) fn rebuild_food_index(&mut self) {
        self.food_index = spatial::build_index(&self.food_sources);
    }

    pub(crate) fn random_speed(&mut self) -> f64 {
        random_between(
            &mut self.rng,
            self.config.ant_speed_min,
            self.config.ant_speed_max,
        )
    }
}
