//! Per-ant sensing, steering and the searching/returning state machine.
//!
//! Ants own no references into the world. Each update borrows the pieces it
//! needs through a [`ForagingContext`] built by the world for that one call.

use crate::food::{FoodSource, Nest};
use crate::math::{
    add, angle_difference, angle_from_direction, clamp, direction_from_angle, normalize,
    random_between, scale, wrap, wrap_angle,
};
use crate::pheromone::{Channel, PheromoneGrid};
use crate::spatial::{self, FoodLocation};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AntState {
    Searching,
    Returning,
}

impl AntState {
    /// Channel sensed to pick a heading.
    pub fn target_channel(self) -> Channel {
        match self {
            AntState::Searching => Channel::Food,
            AntState::Returning => Channel::Home,
        }
    }

    /// Channel laid behind the ant.
    pub fn deposit_channel(self) -> Channel {
        match self {
            AntState::Searching => Channel::Home,
            AntState::Returning => Channel::Food,
        }
    }
}

/// Behaviour tunables carried by each ant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AntParams {
    pub turn_speed: f64,
    pub sensor_distance: f64,
    pub sensor_angle: f64,
    pub sensor_radius: f64,
    pub sensing_interval: f64,
    pub jitter_strength: f64,
    pub pheromone_weight: f64,
    pub deposit_amount: f32,
    pub deposit_spacing: f64,
    pub deposit_ramp_min: f32,
    pub deposit_ramp_duration: f64,
    pub pickup_heading_spread: f64,
}

/// State change produced by one ant update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Took one unit from the food source at this index.
    PickedUp { source: usize },
    Delivered,
}

/// Mutable view of the world lent to a single ant for one update.
pub struct ForagingContext<'a> {
    pub grid: &'a mut PheromoneGrid,
    pub food_sources: &'a mut [FoodSource],
    pub food_index: &'a RTree<FoodLocation>,
    pub nest: &'a mut Nest,
    pub rng: &'a mut ChaCha12Rng,
    pub width: f64,
    pub height: f64,
    /// Simulation time at the end of the current sub-step.
    pub time: f64,
}

#[derive(Clone, Debug)]
pub struct Ant {
    pub id: u32,
    pub position: [f64; 2],
    /// Radians in `(-π, π]`.
    pub heading: f64,
    pub speed: f64,
    pub params: AntParams,
    // Searching exactly when not carrying; only changed together.
    state: AntState,
    carrying_food: bool,
    // Simulation time of the last state transition; drives the deposit ramp.
    state_since: f64,
    next_sense_in: f64,
    cached_heading: f64,
    distance_since_deposit: f64,
}

impl Ant {
    pub fn new<R: Rng + ?Sized>(
        id: u32,
        position: [f64; 2],
        speed: f64,
        params: AntParams,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let mut ant = Self {
            id,
            position,
            heading: 0.0,
            speed,
            state: AntState::Searching,
            carrying_food: false,
            params,
            state_since: now,
            next_sense_in: 0.0,
            cached_heading: 0.0,
            distance_since_deposit: 0.0,
        };
        ant.reset(position, speed, now, rng);
        ant
    }

    /// Put the ant back into a fresh searching state at `position`, keeping its id.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        position: [f64; 2],
        speed: f64,
        now: f64,
        rng: &mut R,
    ) {
        self.position = position;
        self.speed = speed;
        self.state = AntState::Searching;
        self.carrying_food = false;
        self.heading = wrap_angle(random_between(rng, -PI, PI));
        self.cached_heading = self.heading;
        // Random phase so a colony does not sense in lockstep.
        self.next_sense_in = random_between(rng, 0.0, self.params.sensing_interval);
        self.distance_since_deposit = 0.0;
        self.state_since = now;
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = wrap_angle(heading);
        self.cached_heading = self.heading;
    }

    pub fn state(&self) -> AntState {
        self.state
    }

    pub fn is_carrying_food(&self) -> bool {
        self.carrying_food
    }

    /// Load or drop food without a pickup or delivery, switching state to match.
    pub fn set_carrying_food(&mut self, carrying: bool, now: f64) {
        self.carrying_food = carrying;
        self.state = if carrying {
            AntState::Returning
        } else {
            AntState::Searching
        };
        self.state_since = now;
    }

    pub fn state_since(&self) -> f64 {
        self.state_since
    }

    /// Deposit multiplier: `deposit_ramp_min` right after a transition, rising
    /// linearly to 1.0 over `deposit_ramp_duration` seconds.
    pub fn deposit_ramp(&self, now: f64) -> f32 {
        let min = self.params.deposit_ramp_min;
        if self.params.deposit_ramp_duration <= 0.0 {
            return 1.0;
        }
        let progress = clamp(
            (now - self.state_since) / self.params.deposit_ramp_duration,
            0.0,
            1.0,
        ) as f32;
        min + (1.0 - min) * progress
    }

    /// Advance one sub-step: sense, steer, move, deposit, then check for
    /// pickup or delivery.
    pub fn update(&mut self, dt: f64, ctx: &mut ForagingContext<'_>) -> Option<Transition> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let desired = self.choose_heading(dt, ctx);
        self.steer_towards(desired, dt);
        self.advance(dt, ctx.width, ctx.height);
        self.deposit(dt, ctx);
        self.interact(ctx)
    }

    fn choose_heading(&mut self, dt: f64, ctx: &mut ForagingContext<'_>) -> f64 {
        self.next_sense_in -= dt;
        if self.next_sense_in > 0.0 {
            return self.cached_heading;
        }
        let interval = self.params.sensing_interval;
        if interval > 0.0 {
            let missed = (-self.next_sense_in / interval).floor() + 1.0;
            self.next_sense_in += interval * missed;
        } else {
            self.next_sense_in = 0.0;
        }

        let channel = self.state.target_channel();
        let p = self.params;
        let mut best_dir = direction_from_angle(self.heading);
        let mut best_score = f64::NEG_INFINITY;
        // Side sensors sit on the line through the forward sensor, square to
        // the heading, so they reach further out than the forward one.
        let side_reach = p.sensor_distance / p.sensor_angle.cos();
        for (offset, reach) in [
            (0.0, p.sensor_distance),
            (p.sensor_angle, side_reach),
            (-p.sensor_angle, side_reach),
        ] {
            let dir = direction_from_angle(self.heading + offset);
            let sensor = add(self.position, scale(dir, reach));
            let strength = ctx
                .grid
                .sample_area(sensor[0], sensor[1], p.sensor_radius, channel);
            let score = strength as f64 * p.pheromone_weight;
            if score > best_score {
                best_score = score;
                best_dir = dir;
            }
        }

        if !best_score.is_finite() || best_score <= 0.0 {
            let wander = random_between(&mut *ctx.rng, -p.jitter_strength, p.jitter_strength) * 0.5;
            self.cached_heading = wrap_angle(self.heading + wander);
            return self.cached_heading;
        }

        let forward = direction_from_angle(self.heading);
        let combined = normalize(add(forward, scale(best_dir, best_score)));
        let wander = random_between(&mut *ctx.rng, -p.jitter_strength, p.jitter_strength) * 0.25;
        self.cached_heading = wrap_angle(angle_from_direction(combined) + wander);
        self.cached_heading
    }

    fn steer_towards(&mut self, desired: f64, dt: f64) {
        let max_turn = self.params.turn_speed * dt;
        let turn = clamp(angle_difference(desired, self.heading), -max_turn, max_turn);
        self.heading = wrap_angle(self.heading + turn);
    }

    fn advance(&mut self, dt: f64, width: f64, height: f64) {
        let dir = direction_from_angle(self.heading);
        let step = self.speed * dt;
        self.position[0] = wrap(self.position[0] + dir[0] * step, 0.0, width);
        self.position[1] = wrap(self.position[1] + dir[1] * step, 0.0, height);
    }

    /// Lay one marker for every `deposit_spacing` covered, carrying the
    /// remainder over so trail density does not depend on the step length.
    fn deposit(&mut self, dt: f64, ctx: &mut ForagingContext<'_>) {
        self.distance_since_deposit += self.speed * dt;
        let spacing = self.params.deposit_spacing;
        let markers = if spacing > 0.0 {
            let due = (self.distance_since_deposit / spacing).floor();
            self.distance_since_deposit -= due * spacing;
            due
        } else {
            self.distance_since_deposit = 0.0;
            1.0
        };
        if markers < 1.0 {
            return;
        }
        let amount = self.params.deposit_amount * self.deposit_ramp(ctx.time) * markers as f32;
        ctx.grid.add_pheromone(
            self.position[0],
            self.position[1],
            self.state.deposit_channel(),
            amount,
        );
    }

    fn interact(&mut self, ctx: &mut ForagingContext<'_>) -> Option<Transition> {
        match self.state {
            AntState::Searching => {
                let source =
                    spatial::nearest_available(ctx.food_index, ctx.food_sources, self.position)?;
                if !ctx.food_sources[source].take() {
                    return None;
                }
                self.carrying_food = true;
                self.state = AntState::Returning;
                let to_nest = angle_from_direction([
                    ctx.nest.position[0] - self.position[0],
                    ctx.nest.position[1] - self.position[1],
                ]);
                let spread = self.params.pickup_heading_spread;
                let deviation = random_between(&mut *ctx.rng, -spread, spread);
                self.begin_leg(to_nest + deviation, ctx.time);
                Some(Transition::PickedUp { source })
            }
            AntState::Returning => {
                if !ctx.nest.contains(self.position) {
                    return None;
                }
                self.carrying_food = false;
                self.state = AntState::Searching;
                ctx.nest.deliver_food();
                let heading = random_between(&mut *ctx.rng, -PI, PI);
                self.begin_leg(heading, ctx.time);
                Some(Transition::Delivered)
            }
        }
    }

    fn begin_leg(&mut self, heading: f64, now: f64) {
        self.set_heading(heading);
        self.state_since = now;
        // Hold the new heading until the next scheduled read.
        self.next_sense_in = self.params.sensing_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use rand::SeedableRng;

    struct Fixture {
        grid: PheromoneGrid,
        food: Vec<FoodSource>,
        index: RTree<FoodLocation>,
        nest: Nest,
        rng: ChaCha12Rng,
    }

    impl Fixture {
        fn new(food: Vec<FoodSource>) -> Self {
            let index = spatial::build_index(&food);
            Self {
                grid: PheromoneGrid::new(400.0, 400.0, 12.0, 300.0, 0.55, 4.5),
                food,
                index,
                nest: Nest::new([200.0, 200.0], 22.0),
                rng: ChaCha12Rng::seed_from_u64(5),
            }
        }

        fn ctx(&mut self, time: f64) -> ForagingContext<'_> {
            ForagingContext {
                grid: &mut self.grid,
                food_sources: &mut self.food,
                food_index: &self.index,
                nest: &mut self.nest,
                rng: &mut self.rng,
                width: 400.0,
                height: 400.0,
                time,
            }
        }
    }

    fn quiet_params() -> AntParams {
        AntParams {
            sensing_interval: 0.0,
            jitter_strength: 0.0,
            ..SimConfig::default().ant_params()
        }
    }

    fn ant_at(position: [f64; 2], heading: f64, params: AntParams) -> Ant {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut ant = Ant::new(0, position, 40.0, params, 0.0, &mut rng);
        ant.set_heading(heading);
        ant
    }

    #[test]
    fn empty_field_yields_finite_heading() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at(
            [60.0, 60.0],
            1.0,
            AntParams {
                sensing_interval: 0.0,
                ..SimConfig::default().ant_params()
            },
        );
        for step in 1..=50 {
            ant.update(0.02, &mut fx.ctx(step as f64 * 0.02));
            assert!(ant.heading.is_finite());
            assert!(ant.heading > -PI && ant.heading <= PI);
            assert!(ant.position.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn steers_toward_stronger_side_within_turn_limit() {
        let mut fx = Fixture::new(Vec::new());
        let params = quiet_params();
        let mut ant = ant_at([120.0, 120.0], 0.0, params);
        // Left sensor sits at (144, 144); the forward and right circles miss it.
        fx.grid.add_pheromone(144.0, 144.0, Channel::Food, 200.0);
        ant.update(0.02, &mut fx.ctx(0.02));
        assert!(ant.heading > 0.0, "heading={}", ant.heading);
        assert!(ant.heading <= params.turn_speed * 0.02 + 1e-12);
    }

    #[test]
    fn ignores_the_channel_it_is_not_following() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at([120.0, 120.0], 0.0, quiet_params());
        fx.grid.add_pheromone(144.0, 144.0, Channel::Home, 200.0);
        ant.update(0.02, &mut fx.ctx(0.02));
        assert_eq!(ant.heading, 0.0);
    }

    #[test]
    fn movement_wraps_around_world_edges() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at([399.5, 10.0], 0.0, quiet_params());
        ant.update(0.05, &mut fx.ctx(0.05));
        assert!(ant.position[0] < 2.0, "x={}", ant.position[0]);
        assert!((0.0..400.0).contains(&ant.position[0]));
    }

    #[test]
    fn pickup_happens_once_and_takes_one_unit() {
        let mut fx = Fixture::new(vec![FoodSource::new([60.0, 60.0], 5, 20.0)]);
        let mut ant = ant_at([60.0, 60.0], 0.0, quiet_params());
        let transition = ant.update(0.02, &mut fx.ctx(1.0));
        assert_eq!(transition, Some(Transition::PickedUp { source: 0 }));
        assert_eq!(ant.state, AntState::Returning);
        assert!(ant.carrying_food);
        assert_eq!(fx.food[0].amount, 4);
        assert_eq!(ant.state_since(), 1.0);

        let transition = ant.update(0.02, &mut fx.ctx(1.02));
        assert_eq!(transition, None);
        assert_eq!(fx.food[0].amount, 4);
    }

    #[test]
    fn pickup_turns_toward_the_nest() {
        let mut fx = Fixture::new(vec![FoodSource::new([100.0, 200.0], 5, 20.0)]);
        let mut ant = ant_at([100.0, 200.0], PI, quiet_params());
        ant.update(0.02, &mut fx.ctx(0.02));
        // Nest lies along +x; spread is bounded by pickup_heading_spread.
        assert!(ant.heading.abs() <= PI / 6.0 + 1e-9, "heading={}", ant.heading);
    }

    #[test]
    fn depleted_source_is_not_picked_up() {
        let mut fx = Fixture::new(vec![FoodSource::new([60.0, 60.0], 0, 20.0)]);
        let mut ant = ant_at([60.0, 60.0], 0.0, quiet_params());
        assert_eq!(ant.update(0.02, &mut fx.ctx(0.02)), None);
        assert_eq!(ant.state, AntState::Searching);
        assert!(!ant.carrying_food);
    }

    #[test]
    fn delivery_returns_to_searching_and_stores_food() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at([200.0, 200.0], 0.0, quiet_params());
        ant.set_carrying_food(true, 0.0);
        let transition = ant.update(0.02, &mut fx.ctx(3.0));
        assert_eq!(transition, Some(Transition::Delivered));
        assert_eq!(ant.state, AntState::Searching);
        assert!(!ant.carrying_food);
        assert_eq!(fx.nest.food_stored, 1);
        assert_eq!(ant.state_since(), 3.0);
    }

    #[test]
    fn searching_ant_ignores_the_nest() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at([200.0, 200.0], 0.0, quiet_params());
        assert_eq!(ant.update(0.02, &mut fx.ctx(0.02)), None);
        assert_eq!(fx.nest.food_stored, 0);
    }

    #[test]
    fn deposits_are_distance_triggered() {
        let mut fx = Fixture::new(Vec::new());
        let params = AntParams {
            deposit_spacing: 6.0,
            deposit_ramp_duration: 0.0,
            turn_speed: 0.0,
            ..quiet_params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        // 4 units/s * 0.25 s = exactly one unit per update.
        let mut ant = Ant::new(0, [50.0, 50.0], 4.0, params, 0.0, &mut rng);
        for step in 1..=5 {
            ant.update(0.25, &mut fx.ctx(step as f64 * 0.25));
        }
        assert_eq!(fx.grid.total(Channel::Home), 0.0);
        ant.update(0.25, &mut fx.ctx(1.5));
        assert!((fx.grid.total(Channel::Home) - params.deposit_amount as f64).abs() < 1e-4);
        assert_eq!(fx.grid.total(Channel::Food), 0.0);
    }

    #[test]
    fn deposit_spacing_keeps_the_remainder() {
        let mut fx = Fixture::new(Vec::new());
        let params = AntParams {
            deposit_spacing: 6.0,
            deposit_ramp_duration: 0.0,
            turn_speed: 0.0,
            ..quiet_params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        // 4 units per update never divides the 6 unit spacing.
        let mut ant = Ant::new(0, [50.0, 80.0], 200.0, params, 0.0, &mut rng);
        ant.set_heading(0.3);
        for step in 1..=120 {
            ant.update(0.02, &mut fx.ctx(step as f64 * 0.02));
        }
        // 480 units travelled: 80 markers.
        let expected = 80.0 * params.deposit_amount as f64;
        let total = fx.grid.total(Channel::Home);
        assert!((total - expected).abs() < 1e-2, "total={total}");
    }

    #[test]
    fn side_sensors_sit_beside_the_forward_sensor() {
        let mut fx = Fixture::new(Vec::new());
        let mut ant = ant_at([120.0, 120.0], 0.0, quiet_params());
        // The cell centred on (150, 150) is out of reach of a sensor 24 units
        // out at 45 degrees, but inside the side sensor at (144, 144).
        fx.grid.add_pheromone(150.0, 150.0, Channel::Food, 200.0);
        ant.update(0.02, &mut fx.ctx(0.02));
        assert!(ant.heading > 0.0, "heading={}", ant.heading);
    }

    #[test]
    fn set_carrying_food_keeps_state_in_step() {
        let mut ant = ant_at([0.0, 0.0], 0.0, quiet_params());
        ant.set_carrying_food(true, 2.0);
        assert_eq!(ant.state(), AntState::Returning);
        assert!(ant.is_carrying_food());
        assert_eq!(ant.state_since(), 2.0);
        ant.set_carrying_food(false, 3.0);
        assert_eq!(ant.state(), AntState::Searching);
        assert!(!ant.is_carrying_food());
    }

    #[test]
    fn returning_ant_lays_food_marker() {
        let mut fx = Fixture::new(Vec::new());
        let params = AntParams {
            deposit_spacing: 0.0,
            ..quiet_params()
        };
        let mut ant = ant_at([50.0, 50.0], 0.0, params);
        ant.set_carrying_food(true, 0.0);
        ant.update(0.02, &mut fx.ctx(0.02));
        assert!(fx.grid.total(Channel::Food) > 0.0);
        assert_eq!(fx.grid.total(Channel::Home), 0.0);
    }

    #[test]
    fn deposit_ramp_grows_from_minimum_to_one() {
        let params = SimConfig::default().ant_params();
        let ant = ant_at([0.0, 0.0], 0.0, params);
        assert!((ant.deposit_ramp(0.0) - params.deposit_ramp_min).abs() < 1e-6);
        let mid = ant.deposit_ramp(params.deposit_ramp_duration * 0.5);
        assert!(mid > params.deposit_ramp_min && mid < 1.0);
        assert_eq!(ant.deposit_ramp(params.deposit_ramp_duration * 3.0), 1.0);
    }

    #[test]
    fn cached_heading_is_reused_between_senses() {
        let mut fx = Fixture::new(Vec::new());
        let params = AntParams {
            sensing_interval: 0.15,
            ..quiet_params()
        };
        let mut ant = ant_at([120.0, 120.0], 0.0, params);
        ant.next_sense_in = 0.1;
        fx.grid.add_pheromone(144.0, 144.0, Channel::Food, 200.0);
        ant.update(0.02, &mut fx.ctx(0.02));
        assert_eq!(ant.heading, 0.0, "no read is due yet");
    }
}
