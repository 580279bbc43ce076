use super::metrics::StepTimings;
use super::{SubstepPlan, World};
use crate::ant::{Ant, ForagingContext, Transition};
use crate::config::FoodSpawnProfile;
use crate::food::FoodSource;
use crate::math::{distance_squared, random_between, wrap};
use rand::Rng;
use std::f64::consts::TAU;
use std::time::Instant;
use tracing::{debug, trace};

/// Fraction of the nest radius within which new ants appear.
const SPAWN_SPREAD: f64 = 0.6;

impl World {
    fn next_ant_id_checked(&mut self) -> Option<u32> {
        if self.next_ant_id == u32::MAX {
            return None;
        }
        let id = self.next_ant_id;
        self.next_ant_id += 1;
        Some(id)
    }

    /// Add one searching ant just inside the nest. Returns `false` when the
    /// population cap or the id space is exhausted.
    pub(crate) fn spawn_ant(&mut self) -> bool {
        if self.ants.len() >= self.config.max_ants {
            return false;
        }
        let Some(id) = self.next_ant_id_checked() else {
            return false;
        };
        let offset = random_between(&mut self.rng, 0.0, self.nest.radius * SPAWN_SPREAD);
        let angle = random_between(&mut self.rng, 0.0, TAU);
        let position = [
            wrap(
                self.nest.position[0] + angle.cos() * offset,
                0.0,
                self.config.width,
            ),
            wrap(
                self.nest.position[1] + angle.sin() * offset,
                0.0,
                self.config.height,
            ),
        ];
        let speed = self.random_speed();
        let ant = Ant::new(
            id,
            position,
            speed,
            self.ant_params,
            self.sim_time,
            &mut self.rng,
        );
        self.ants.push(ant);
        self.ants_spawned += 1;
        true
    }

    pub(crate) fn spawn_initial_food(&mut self) {
        let profile = self.config.initial_food;
        for _ in 0..self.config.initial_food_sources {
            self.try_place_food(&profile);
        }
    }

    /// Try a bounded number of random spots for one new source. Gives up
    /// silently when every attempt collides with the nest or another source.
    pub(crate) fn try_place_food(&mut self, profile: &FoodSpawnProfile) -> bool {
        for _ in 0..self.config.food_spawn_attempts {
            let position = [
                self.random_coordinate(profile.margin, self.config.width),
                self.random_coordinate(profile.margin, self.config.height),
            ];
            let amount = self
                .rng
                .random_range(profile.amount_min..=profile.amount_max);
            let radius = profile.radius_for(amount);
            if !self.is_location_free(position, radius) {
                continue;
            }
            self.food_sources
                .push(FoodSource::new(position, amount, radius));
            self.rebuild_food_index();
            self.food_sources_spawned += 1;
            trace!(x = position[0], y = position[1], amount, radius, "food placed");
            return true;
        }
        debug!(
            attempts = self.config.food_spawn_attempts,
            sources = self.food_sources.len(),
            "food placement gave up"
        );
        false
    }

    fn random_coordinate(&mut self, margin: f64, extent: f64) -> f64 {
        if extent - margin > margin {
            random_between(&mut self.rng, margin, extent - margin)
        } else {
            random_between(&mut self.rng, 0.0, extent)
        }
    }

    /// Far enough from the nest and from every existing source.
    pub(crate) fn is_location_free(&self, position: [f64; 2], radius: f64) -> bool {
        let nest_clearance = self.nest.radius * self.config.nest_clearance_factor;
        if distance_squared(position, self.nest.position) < nest_clearance * nest_clearance {
            return false;
        }
        self.food_sources.iter().all(|source| {
            let gap = source.radius + radius + self.config.food_spacing;
            distance_squared(position, source.position) > gap * gap
        })
    }

    fn step_ant_phase(&mut self, dt: f64) {
        let mut ctx = ForagingContext {
            grid: &mut self.grid,
            food_sources: &mut self.food_sources,
            food_index: &self.food_index,
            nest: &mut self.nest,
            rng: &mut self.rng,
            width: self.config.width,
            height: self.config.height,
            time: self.sim_time,
        };
        let mut pickups = 0;
        let mut deliveries = 0;
        for ant in self.ants.iter_mut() {
            match ant.update(dt, &mut ctx) {
                Some(Transition::PickedUp { .. }) => pickups += 1,
                Some(Transition::Delivered) => deliveries += 1,
                None => {}
            }
        }
        self.pickups_last_frame += pickups;
        self.deliveries_last_frame += deliveries;
        self.total_pickups += pickups;
        self.total_deliveries += deliveries;
    }

    /// Drop depleted sources, top food back up and grow the colony.
    pub(crate) fn housekeeping(&mut self) {
        let before = self.food_sources.len();
        self.food_sources.retain(|source| !source.is_depleted());
        let depleted = before - self.food_sources.len();
        if depleted > 0 {
            self.food_sources_depleted += depleted;
            self.rebuild_food_index();
            trace!(depleted, remaining = self.food_sources.len(), "food sources removed");
        }

        if self.food_sources.len() < self.config.min_food_sources {
            let profile = self.config.replacement_food;
            self.try_place_food(&profile);
        }

        let growth_threshold = self.ants.len() as f64 * self.config.growth_food_per_ant;
        if self.nest.food_stored as f64 > growth_threshold && self.spawn_ant() {
            trace!(ants = self.ants.len(), "colony grew");
        }
    }

    /// Advance one frame: clamp and split `frame_dt`, run every sub-step
    /// (grid first, then ants), then housekeeping once.
    pub fn step(&mut self, frame_dt: f64) -> StepTimings {
        let total_start = Instant::now();
        self.frame_index = self.frame_index.saturating_add(1);
        self.pickups_last_frame = 0;
        self.deliveries_last_frame = 0;

        let plan = SubstepPlan::from_frame(
            frame_dt,
            self.config.max_frame_dt,
            self.config.max_substep_dt,
        );
        let mut grid_update_us = 0;
        let mut ant_update_us = 0;
        for _ in 0..plan.count {
            let t0 = Instant::now();
            self.grid.update(plan.dt);
            grid_update_us += t0.elapsed().as_micros() as u64;

            // Deposits and ramps see the time at the end of this sub-step.
            self.sim_time += plan.dt;
            let t1 = Instant::now();
            self.step_ant_phase(plan.dt);
            ant_update_us += t1.elapsed().as_micros() as u64;
        }

        let t2 = Instant::now();
        self.housekeeping();
        let housekeeping_us = t2.elapsed().as_micros() as u64;

        StepTimings {
            substeps: plan.count,
            grid_update_us,
            ant_update_us,
            housekeeping_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }
}
