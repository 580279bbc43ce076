use crate::ant::AntParams;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use thiserror::Error;

/// Placement and sizing rules for one generation of food sources.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodSpawnProfile {
    /// Distance kept from every world edge when placing a source.
    pub margin: f64,
    pub amount_min: u32,
    pub amount_max: u32,
    /// Pickup radius is `amount / radius_divisor`, clamped to
    /// `[radius_min, radius_max]`.
    pub radius_divisor: f64,
    pub radius_min: f64,
    pub radius_max: f64,
}

impl FoodSpawnProfile {
    pub fn radius_for(&self, amount: u32) -> f64 {
        (amount as f64 / self.radius_divisor).clamp(self.radius_min, self.radius_max)
    }

    fn validate(&self, which: &'static str) -> Result<(), SimConfigError> {
        if self.amount_min == 0 || self.amount_min > self.amount_max {
            return Err(SimConfigError::InvalidFoodAmount { profile: which });
        }
        if !(self.radius_divisor > 0.0 && self.radius_divisor.is_finite())
            || !(self.radius_min > 0.0 && self.radius_min.is_finite())
            || !(self.radius_max >= self.radius_min && self.radius_max.is_finite())
        {
            return Err(SimConfigError::InvalidFoodRadius { profile: which });
        }
        if !(self.margin >= 0.0 && self.margin.is_finite()) {
            return Err(SimConfigError::InvalidFoodMargin { profile: which });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// World extent along x, in world units. Ants wrap toroidally.
    pub width: f64,
    /// World extent along y, in world units.
    pub height: f64,

    /// World units per pheromone cell.
    pub cell_size: f64,
    /// Upper clamp for every pheromone cell.
    pub max_intensity: f32,
    /// Fraction of intensity lost per second.
    pub evaporation_rate: f32,
    /// Neighbour blending per second.
    pub diffusion_rate: f32,
    /// Cells below this value after evaporation snap to zero.
    pub evaporation_epsilon: f32,

    /// Longest frame delta honoured by `World::step`; longer frames are clamped.
    pub max_frame_dt: f64,
    /// Longest sub-step the frame delta is divided into.
    pub max_substep_dt: f64,

    pub initial_ants: usize,
    pub max_ants: usize,
    /// A new ant hatches while `food_stored > ants * growth_food_per_ant`.
    pub growth_food_per_ant: f64,
    pub nest_radius: f64,

    pub ant_speed_min: f64,
    pub ant_speed_max: f64,
    /// Radians per second.
    pub turn_speed: f64,
    pub sensor_distance: f64,
    /// Angle between the forward sensor and each side sensor. Side sensors sit
    /// square to the heading beside the forward one, at
    /// `sensor_distance / cos(sensor_angle)`.
    pub sensor_angle: f64,
    pub sensor_radius: f64,
    /// Seconds between pheromone reads; the chosen heading is reused in between.
    pub sensing_interval: f64,
    pub jitter_strength: f64,
    pub pheromone_weight: f64,
    /// Pheromone laid per marker at full ramp.
    pub deposit_amount: f32,
    /// Distance travelled between markers.
    pub deposit_spacing: f64,
    /// Deposit multiplier right after a state transition.
    pub deposit_ramp_min: f32,
    /// Seconds for the deposit multiplier to reach 1.0.
    pub deposit_ramp_duration: f64,
    /// Maximum deviation from the bearing to the nest after picking up food.
    pub pickup_heading_spread: f64,

    pub initial_food_sources: usize,
    /// Replacement sources are placed while fewer than this remain.
    pub min_food_sources: usize,
    pub food_spawn_attempts: usize,
    /// Sources keep at least `nest_clearance_factor * nest_radius` from the nest.
    pub nest_clearance_factor: f64,
    /// Extra gap kept between the rims of two sources.
    pub food_spacing: f64,
    pub initial_food: FoodSpawnProfile,
    pub replacement_food: FoodSpawnProfile,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 800.0,
            height: 600.0,
            cell_size: 12.0,
            max_intensity: 300.0,
            evaporation_rate: 0.55,
            diffusion_rate: 4.5,
            evaporation_epsilon: 0.01,
            max_frame_dt: 0.12,
            max_substep_dt: 0.02,
            initial_ants: 120,
            max_ants: 160,
            growth_food_per_ant: 0.5,
            nest_radius: 22.0,
            ant_speed_min: 35.0,
            ant_speed_max: 55.0,
            turn_speed: 2.0 * PI,
            sensor_distance: 24.0,
            sensor_angle: PI / 4.0,
            sensor_radius: 14.4,
            sensing_interval: 0.15,
            jitter_strength: PI * 0.5,
            pheromone_weight: 1.0,
            deposit_amount: 30.0,
            deposit_spacing: 6.0,
            deposit_ramp_min: 0.25,
            deposit_ramp_duration: 2.0,
            pickup_heading_spread: PI / 6.0,
            initial_food_sources: 4,
            min_food_sources: 3,
            food_spawn_attempts: 5,
            nest_clearance_factor: 4.0,
            food_spacing: 40.0,
            initial_food: FoodSpawnProfile {
                margin: 60.0,
                amount_min: 160,
                amount_max: 320,
                radius_divisor: 12.0,
                radius_min: 12.0,
                radius_max: 28.0,
            },
            replacement_food: FoodSpawnProfile {
                margin: 80.0,
                amount_min: 180,
                amount_max: 260,
                radius_divisor: 14.0,
                radius_min: 10.0,
                radius_max: 26.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error("world dimensions must be positive and finite (got {width} x {height})")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("world dimension ({actual}) exceeds supported maximum ({max})")]
    WorldTooLarge { max: f64, actual: f64 },
    #[error("cell_size must be positive and finite")]
    InvalidCellSize,
    #[error("pheromone grid would need {actual} cells, above the supported maximum ({max})")]
    GridTooLarge { max: usize, actual: f64 },
    #[error("max_intensity must be positive and finite")]
    InvalidMaxIntensity,
    #[error("{field} must be non-negative and finite")]
    NegativeRate { field: &'static str },
    #[error("max_frame_dt and max_substep_dt must be positive and finite")]
    InvalidFrameTiming,
    #[error("a clamped frame would need {actual} sub-steps, above the supported maximum ({max})")]
    TooManySubsteps { max: usize, actual: f64 },
    #[error("ant speed range is invalid ({min}..={max})")]
    InvalidSpeedRange { min: f64, max: f64 },
    #[error("initial_ants ({initial}) exceeds max_ants ({max})")]
    InitialAntsAboveCap { initial: usize, max: usize },
    #[error("max_ants ({actual}) exceeds supported maximum ({max})")]
    TooManyAnts { max: usize, actual: usize },
    #[error("nest_radius must be positive and finite")]
    InvalidNestRadius,
    #[error("sensor_angle must lie in [0, pi/2)")]
    InvalidSensorAngle,
    #[error("deposit_ramp_min must lie in [0, 1]")]
    InvalidRampMin,
    #[error("{profile} food amount range must be non-empty and start above zero")]
    InvalidFoodAmount { profile: &'static str },
    #[error("{profile} food radius settings must be positive, finite and ordered")]
    InvalidFoodRadius { profile: &'static str },
    #[error("{profile} food margin must be non-negative and finite")]
    InvalidFoodMargin { profile: &'static str },
}

fn non_negative(value: f64, field: &'static str) -> Result<(), SimConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimConfigError::NegativeRate { field })
    }
}

impl SimConfig {
    pub const MAX_WORLD_DIMENSION: f64 = 16_384.0;
    pub const MAX_ANTS: usize = 100_000;
    pub const MAX_GRID_CELLS: usize = 4_194_304;
    pub const MAX_SUBSTEPS_PER_FRAME: usize = 1_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        Self::validate_dimensions(self.width, self.height)?;
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(SimConfigError::InvalidCellSize);
        }
        Self::validate_grid_cells(self.width, self.height, self.cell_size)?;
        if !(self.max_intensity > 0.0 && self.max_intensity.is_finite()) {
            return Err(SimConfigError::InvalidMaxIntensity);
        }
        non_negative(self.evaporation_rate as f64, "evaporation_rate")?;
        non_negative(self.diffusion_rate as f64, "diffusion_rate")?;
        non_negative(self.evaporation_epsilon as f64, "evaporation_epsilon")?;
        if !(self.max_frame_dt > 0.0
            && self.max_frame_dt.is_finite()
            && self.max_substep_dt > 0.0
            && self.max_substep_dt.is_finite())
        {
            return Err(SimConfigError::InvalidFrameTiming);
        }
        let substeps = (self.max_frame_dt / self.max_substep_dt).ceil();
        if substeps > Self::MAX_SUBSTEPS_PER_FRAME as f64 {
            return Err(SimConfigError::TooManySubsteps {
                max: Self::MAX_SUBSTEPS_PER_FRAME,
                actual: substeps,
            });
        }
        if !(self.ant_speed_min >= 0.0
            && self.ant_speed_min <= self.ant_speed_max
            && self.ant_speed_max.is_finite())
        {
            return Err(SimConfigError::InvalidSpeedRange {
                min: self.ant_speed_min,
                max: self.ant_speed_max,
            });
        }
        if self.max_ants > Self::MAX_ANTS {
            return Err(SimConfigError::TooManyAnts {
                max: Self::MAX_ANTS,
                actual: self.max_ants,
            });
        }
        if self.initial_ants > self.max_ants {
            return Err(SimConfigError::InitialAntsAboveCap {
                initial: self.initial_ants,
                max: self.max_ants,
            });
        }
        if !(self.nest_radius > 0.0 && self.nest_radius.is_finite()) {
            return Err(SimConfigError::InvalidNestRadius);
        }
        non_negative(self.growth_food_per_ant, "growth_food_per_ant")?;
        non_negative(self.turn_speed, "turn_speed")?;
        non_negative(self.sensor_distance, "sensor_distance")?;
        non_negative(self.sensor_radius, "sensor_radius")?;
        if !(self.sensor_angle >= 0.0 && self.sensor_angle < FRAC_PI_2 - 1e-3) {
            return Err(SimConfigError::InvalidSensorAngle);
        }
        non_negative(self.sensing_interval, "sensing_interval")?;
        non_negative(self.jitter_strength, "jitter_strength")?;
        non_negative(self.pheromone_weight, "pheromone_weight")?;
        non_negative(self.deposit_amount as f64, "deposit_amount")?;
        non_negative(self.deposit_spacing, "deposit_spacing")?;
        non_negative(self.deposit_ramp_duration, "deposit_ramp_duration")?;
        non_negative(self.pickup_heading_spread, "pickup_heading_spread")?;
        non_negative(self.nest_clearance_factor, "nest_clearance_factor")?;
        non_negative(self.food_spacing, "food_spacing")?;
        if !(0.0..=1.0).contains(&self.deposit_ramp_min) {
            return Err(SimConfigError::InvalidRampMin);
        }
        self.initial_food.validate("initial")?;
        self.replacement_food.validate("replacement")?;
        Ok(())
    }

    /// Check a new world extent against this config's cell size.
    pub fn validate_extent(&self, width: f64, height: f64) -> Result<(), SimConfigError> {
        Self::validate_dimensions(width, height)?;
        Self::validate_grid_cells(width, height, self.cell_size)
    }

    fn validate_grid_cells(width: f64, height: f64, cell_size: f64) -> Result<(), SimConfigError> {
        let cols = (width / cell_size).ceil().max(1.0);
        let rows = (height / cell_size).ceil().max(1.0);
        let cells = cols * rows;
        if cells > Self::MAX_GRID_CELLS as f64 {
            return Err(SimConfigError::GridTooLarge {
                max: Self::MAX_GRID_CELLS,
                actual: cells,
            });
        }
        Ok(())
    }

    pub fn validate_dimensions(width: f64, height: f64) -> Result<(), SimConfigError> {
        if !(width > 0.0 && width.is_finite() && height > 0.0 && height.is_finite()) {
            return Err(SimConfigError::InvalidDimensions { width, height });
        }
        let largest = width.max(height);
        if largest > Self::MAX_WORLD_DIMENSION {
            return Err(SimConfigError::WorldTooLarge {
                max: Self::MAX_WORLD_DIMENSION,
                actual: largest,
            });
        }
        Ok(())
    }

    /// Tunables shared by every ant; speed is drawn per ant from the configured range.
    pub fn ant_params(&self) -> AntParams {
        AntParams {
            turn_speed: self.turn_speed,
            sensor_distance: self.sensor_distance,
            sensor_angle: self.sensor_angle,
            sensor_radius: self.sensor_radius,
            sensing_interval: self.sensing_interval,
            jitter_strength: self.jitter_strength,
            pheromone_weight: self.pheromone_weight,
            deposit_amount: self.deposit_amount,
            deposit_spacing: self.deposit_spacing,
            deposit_ramp_min: self.deposit_ramp_min,
            deposit_ramp_duration: self.deposit_ramp_duration,
            pickup_heading_spread: self.pickup_heading_spread,
        }
    }
}
