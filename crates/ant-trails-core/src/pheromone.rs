//! Two-channel pheromone field over the world rectangle.
//!
//! Each cell holds a trail intensity in `[0, max_intensity]`. Coordinates
//! outside the world are clamped onto the edge cells, never wrapped.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Laid by searching ants; followed by returning ants.
    Home,
    /// Laid by returning ants; followed by searching ants.
    Food,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Home, Channel::Food];

    pub fn from_name(name: &str) -> Option<Channel> {
        match name {
            "home" => Some(Channel::Home),
            "food" => Some(Channel::Food),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Home => "home",
            Channel::Food => "food",
        }
    }
}

/// One non-empty cell of a heat map, ready for drawing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    pub col: usize,
    pub row: usize,
    /// World-space corner of the cell.
    pub x: f64,
    pub y: f64,
    /// Cell value divided by `max_intensity`, in `(0, 1]`.
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub struct PheromoneGrid {
    width: f64,
    height: f64,
    cell_size: f64,
    cols: usize,
    rows: usize,
    max_intensity: f32,
    evaporation_rate: f32,
    diffusion_rate: f32,
    evaporation_epsilon: f32,
    home: Vec<f32>,
    food: Vec<f32>,
    // Reused snapshot buffer for diffusion.
    scratch: Vec<f32>,
}

impl PheromoneGrid {
    pub fn new(
        width: f64,
        height: f64,
        cell_size: f64,
        max_intensity: f32,
        evaporation_rate: f32,
        diffusion_rate: f32,
    ) -> Self {
        assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "cell_size must be positive"
        );
        let mut grid = Self {
            width: 0.0,
            height: 0.0,
            cell_size,
            cols: 0,
            rows: 0,
            max_intensity,
            evaporation_rate,
            diffusion_rate,
            evaporation_epsilon: 0.01,
            home: Vec::new(),
            food: Vec::new(),
            scratch: Vec::new(),
        };
        grid.resize(width, height);
        grid
    }

    pub fn with_evaporation_epsilon(mut self, epsilon: f32) -> Self {
        self.evaporation_epsilon = epsilon.max(0.0);
        self
    }

    /// Reallocate both channels for a new world extent. All trail data is discarded.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.cols = ((self.width / self.cell_size).ceil() as usize).max(1);
        self.rows = ((self.height / self.cell_size).ceil() as usize).max(1);
        let cell_count = self.cols * self.rows;
        self.home = vec![0.0; cell_count];
        self.food = vec![0.0; cell_count];
        self.scratch = vec![0.0; cell_count];
    }

    fn field(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Home => &self.home,
            Channel::Food => &self.food,
        }
    }

    fn field_mut(&mut self, channel: Channel) -> &mut Vec<f32> {
        match channel {
            Channel::Home => &mut self.home,
            Channel::Food => &mut self.food,
        }
    }

    fn clamp_coords(&self, x: f64, y: f64) -> (usize, usize) {
        // NaN casts to 0, which clamps like any other out-of-range value.
        let col = ((x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        (col, row)
    }

    fn index_from_world(&self, x: f64, y: f64) -> usize {
        let (col, row) = self.clamp_coords(x, y);
        row * self.cols + col
    }

    /// Add `amount` to the cell containing `(x, y)`, clamped to `[0, max_intensity]`.
    /// Non-finite amounts are ignored.
    pub fn add_pheromone(&mut self, x: f64, y: f64, channel: Channel, amount: f32) {
        if !amount.is_finite() {
            return;
        }
        let index = self.index_from_world(x, y);
        let max = self.max_intensity;
        let field = self.field_mut(channel);
        field[index] = (field[index] + amount).clamp(0.0, max);
    }

    pub fn sample(&self, x: f64, y: f64, channel: Channel) -> f32 {
        self.field(channel)[self.index_from_world(x, y)]
    }

    /// Mean value of the cells whose centers lie within `radius` of `(x, y)`.
    ///
    /// This tests cell centers rather than integrating coverage, which is close
    /// enough while cells are much smaller than the sensing radius.
    pub fn sample_area(&self, x: f64, y: f64, radius: f64, channel: Channel) -> f32 {
        if !(radius > 0.0) {
            return 0.0;
        }
        let field = self.field(channel);
        let (min_col, min_row) = self.clamp_coords(x - radius, y - radius);
        let (max_col, max_row) = self.clamp_coords(x + radius, y + radius);
        let radius_sq = radius * radius;
        let half = self.cell_size * 0.5;

        let mut total = 0.0f64;
        let mut count = 0usize;
        for row in min_row..=max_row {
            let cy = row as f64 * self.cell_size + half;
            for col in min_col..=max_col {
                let cx = col as f64 * self.cell_size + half;
                let dx = cx - x;
                let dy = cy - y;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                total += field[row * self.cols + col] as f64;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            (total / count as f64) as f32
        }
    }

    pub fn add_named(&mut self, x: f64, y: f64, channel: &str, amount: f32) {
        if let Some(channel) = Channel::from_name(channel) {
            self.add_pheromone(x, y, channel, amount);
        }
    }

    pub fn sample_named(&self, x: f64, y: f64, channel: &str) -> f32 {
        Channel::from_name(channel)
            .map(|c| self.sample(x, y, c))
            .unwrap_or(0.0)
    }

    pub fn sample_area_named(&self, x: f64, y: f64, radius: f64, channel: &str) -> f32 {
        Channel::from_name(channel)
            .map(|c| self.sample_area(x, y, radius, c))
            .unwrap_or(0.0)
    }

    /// Evaporate, then diffuse. Run once per sub-step.
    pub fn update(&mut self, dt: f64) {
        self.evaporate(dt);
        self.diffuse(dt);
    }

    pub fn evaporate(&mut self, dt: f64) {
        let decay = (1.0 - self.evaporation_rate as f64 * dt).max(0.0) as f32;
        let epsilon = self.evaporation_epsilon;
        for field in [&mut self.home, &mut self.food] {
            for v in field.iter_mut() {
                *v *= decay;
                if *v < epsilon {
                    *v = 0.0;
                }
            }
        }
    }

    /// Blend every cell toward the mean of itself and its axis neighbours.
    ///
    /// Reads only from a snapshot taken before the pass, so the result does not
    /// depend on iteration order.
    pub fn diffuse(&mut self, dt: f64) {
        let blend = (self.diffusion_rate as f64 * dt).clamp(0.0, 1.0) as f32;
        if blend <= 0.0 {
            return;
        }
        let (cols, rows, max) = (self.cols, self.rows, self.max_intensity);
        for channel in Channel::ALL {
            let mut scratch = std::mem::take(&mut self.scratch);
            let field = self.field_mut(channel);
            scratch.copy_from_slice(field);
            for row in 0..rows {
                for col in 0..cols {
                    let idx = row * cols + col;
                    let old = scratch[idx];
                    let mut total = old;
                    let mut count = 1u8;
                    if col > 0 {
                        total += scratch[idx - 1];
                        count += 1;
                    }
                    if col + 1 < cols {
                        total += scratch[idx + 1];
                        count += 1;
                    }
                    if row > 0 {
                        total += scratch[idx - cols];
                        count += 1;
                    }
                    if row + 1 < rows {
                        total += scratch[idx + cols];
                        count += 1;
                    }
                    let average = total / count as f32;
                    field[idx] = (old + (average - old) * blend).clamp(0.0, max);
                }
            }
            self.scratch = scratch;
        }
    }

    /// Non-empty cells of one channel, normalized for drawing.
    pub fn heat_map(&self, channel: Channel) -> Vec<HeatCell> {
        let scale = 1.0 / self.max_intensity;
        self.field(channel)
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(idx, &v)| {
                let col = idx % self.cols;
                let row = idx / self.cols;
                HeatCell {
                    col,
                    row,
                    x: col as f64 * self.cell_size,
                    y: row as f64 * self.cell_size,
                    intensity: (v * scale).min(1.0),
                }
            })
            .collect()
    }

    pub fn channel(&self, channel: Channel) -> &[f32] {
        self.field(channel)
    }

    pub fn total(&self, channel: Channel) -> f64 {
        self.field(channel).iter().map(|&v| v as f64).sum()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn max_intensity(&self) -> f32 {
        self.max_intensity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;

    fn grid(width: f64, height: f64) -> PheromoneGrid {
        PheromoneGrid::new(width, height, 12.0, 300.0, 0.55, 4.5)
    }

    #[test]
    fn dimensions_cover_the_world() {
        let g = grid(800.0, 600.0);
        assert_eq!((g.cols(), g.rows()), (67, 50));
        assert!(g.cols() as f64 * g.cell_size() >= 800.0);
        assert!(g.rows() as f64 * g.cell_size() >= 600.0);
        assert_eq!(g.channel(Channel::Home).len(), g.channel(Channel::Food).len());
    }

    #[test]
    fn deposit_then_evaporate_matches_reference_values() {
        let mut g = grid(800.0, 600.0);
        g.add_pheromone(400.0, 300.0, Channel::Food, 220.0);
        assert_eq!(g.sample(400.0, 300.0, Channel::Food), 220.0);
        g.evaporate(1.0);
        assert!((g.sample(400.0, 300.0, Channel::Food) - 99.0).abs() < 1e-3);
    }

    #[test]
    fn deposits_clamp_to_max_intensity_and_zero() {
        let mut g = grid(100.0, 100.0);
        g.add_pheromone(5.0, 5.0, Channel::Home, 1_000.0);
        assert_eq!(g.sample(5.0, 5.0, Channel::Home), 300.0);
        g.add_pheromone(5.0, 5.0, Channel::Home, -5_000.0);
        assert_eq!(g.sample(5.0, 5.0, Channel::Home), 0.0);
    }

    #[test]
    fn non_finite_amounts_are_ignored() {
        let mut g = grid(100.0, 100.0);
        g.add_pheromone(30.0, 30.0, Channel::Home, 12.0);
        g.add_pheromone(30.0, 30.0, Channel::Home, f32::NAN);
        g.add_pheromone(30.0, 30.0, Channel::Home, f32::INFINITY);
        assert_eq!(g.sample(30.0, 30.0, Channel::Home), 12.0);
        g.update(0.1);
        assert!(g.channel(Channel::Home).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn out_of_range_coordinates_clamp_to_edge_cells() {
        let mut g = grid(100.0, 100.0);
        g.add_pheromone(-50.0, 1e9, Channel::Food, 10.0);
        assert_eq!(g.sample(0.0, 99.0, Channel::Food), 10.0);
        g.add_pheromone(f64::NAN, f64::NAN, Channel::Food, 1.0);
        assert_eq!(g.sample(0.0, 0.0, Channel::Food), 1.0);
    }

    #[test]
    fn deposit_order_does_not_matter() {
        let mut a = grid(100.0, 100.0);
        let mut b = grid(100.0, 100.0);
        a.add_pheromone(30.0, 30.0, Channel::Food, 40.0);
        a.add_pheromone(30.0, 30.0, Channel::Food, 75.5);
        b.add_pheromone(30.0, 30.0, Channel::Food, 75.5);
        b.add_pheromone(30.0, 30.0, Channel::Food, 40.0);
        assert_eq!(
            a.sample(30.0, 30.0, Channel::Food),
            b.sample(30.0, 30.0, Channel::Food)
        );
    }

    #[test]
    fn unknown_channel_names_are_ignored() {
        let mut g = grid(100.0, 100.0);
        g.add_named(10.0, 10.0, "alarm", 50.0);
        assert_eq!(g.total(Channel::Home) + g.total(Channel::Food), 0.0);
        assert_eq!(g.sample_named(10.0, 10.0, "alarm"), 0.0);
        assert_eq!(g.sample_area_named(10.0, 10.0, 20.0, "alarm"), 0.0);
        g.add_named(10.0, 10.0, "home", 50.0);
        assert_eq!(g.sample_named(10.0, 10.0, "home"), 50.0);
    }

    #[test]
    fn sample_area_averages_cells_inside_circle() {
        let mut g = grid(120.0, 120.0);
        // Cell (5, 5) has its center at (66, 66).
        g.add_pheromone(66.0, 66.0, Channel::Home, 90.0);
        assert_eq!(g.sample_area(66.0, 66.0, 1.0, Channel::Home), 90.0);
        // Radius 12 from the center reaches the 4 axis neighbours too.
        let mean = g.sample_area(66.0, 66.0, 12.0, Channel::Home);
        assert!((mean - 18.0).abs() < 1e-4, "mean={mean}");
        assert_eq!(g.sample_area(66.0, 66.0, 0.0, Channel::Home), 0.0);
        assert_eq!(g.sample_area(66.0, 66.0, -3.0, Channel::Home), 0.0);
    }

    #[test]
    fn sample_area_without_qualifying_cells_is_zero() {
        let mut g = grid(120.0, 120.0);
        g.add_pheromone(0.0, 0.0, Channel::Food, 50.0);
        // A tiny circle on a cell corner contains no cell center.
        assert_eq!(g.sample_area(12.0, 12.0, 0.5, Channel::Food), 0.0);
    }

    #[test]
    fn pure_evaporation_reaches_exact_zero() {
        let mut g = grid(24.0, 24.0);
        g.add_pheromone(1.0, 1.0, Channel::Home, 300.0);
        let mut steps = 0;
        while g.sample(1.0, 1.0, Channel::Home) > 0.0 {
            g.evaporate(0.02);
            steps += 1;
            assert!(steps < 2_000, "evaporation never reached zero");
        }
        assert_eq!(g.sample(1.0, 1.0, Channel::Home), 0.0);
    }

    #[test]
    fn large_dt_evaporation_never_goes_negative() {
        let mut g = grid(24.0, 24.0);
        g.add_pheromone(1.0, 1.0, Channel::Home, 100.0);
        g.evaporate(10.0);
        assert_eq!(g.sample(1.0, 1.0, Channel::Home), 0.0);
    }

    #[test]
    fn diffusion_conserves_mass_and_spreads() {
        let mut g = PheromoneGrid::new(120.0, 120.0, 12.0, 300.0, 0.0, 4.5);
        g.add_pheromone(60.0, 60.0, Channel::Food, 200.0);
        let before = g.total(Channel::Food);
        for _ in 0..10 {
            g.diffuse(0.02);
        }
        let after = g.total(Channel::Food);
        assert!(
            (after - before).abs() / before < 1e-3,
            "before={before} after={after}"
        );
        assert!(g.sample(72.0, 60.0, Channel::Food) > 0.0);
        assert!(g.sample(60.0, 60.0, Channel::Food) < 200.0);
    }

    #[test]
    fn diffusion_is_symmetric_around_a_point_source() {
        let mut g = PheromoneGrid::new(132.0, 132.0, 12.0, 300.0, 0.0, 4.5);
        g.add_pheromone(66.0, 66.0, Channel::Home, 100.0);
        g.diffuse(0.1);
        let left = g.sample(54.0, 66.0, Channel::Home);
        let right = g.sample(78.0, 66.0, Channel::Home);
        let up = g.sample(66.0, 54.0, Channel::Home);
        let down = g.sample(66.0, 78.0, Channel::Home);
        assert_eq!(left, right);
        assert_eq!(up, down);
        assert_eq!(left, up);
    }

    #[test]
    fn random_update_sequences_stay_in_bounds() {
        let mut g = grid(240.0, 180.0);
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        for _ in 0..200 {
            for _ in 0..20 {
                let x = rng.random_range(-20.0..260.0);
                let y = rng.random_range(-20.0..200.0);
                let channel = if rng.random::<bool>() {
                    Channel::Home
                } else {
                    Channel::Food
                };
                g.add_pheromone(x, y, channel, rng.random_range(-50.0f32..400.0));
            }
            g.update(rng.random_range(0.0..0.05));
            for channel in Channel::ALL {
                assert!(g
                    .channel(channel)
                    .iter()
                    .all(|v| v.is_finite() && (0.0..=300.0).contains(v)));
            }
        }
    }

    #[test]
    fn resize_resets_and_reallocates() {
        let mut g = grid(100.0, 100.0);
        g.add_pheromone(50.0, 50.0, Channel::Food, 20.0);
        g.resize(250.0, 37.0);
        assert_eq!((g.cols(), g.rows()), (21, 4));
        assert_eq!(g.total(Channel::Food), 0.0);
        assert_eq!(g.channel(Channel::Home).len(), 84);
    }

    #[test]
    fn heat_map_lists_only_non_empty_cells() {
        let mut g = grid(120.0, 120.0);
        g.add_pheromone(30.0, 50.0, Channel::Home, 150.0);
        let cells = g.heat_map(Channel::Home);
        assert_eq!(cells.len(), 1);
        let cell = cells[0];
        assert_eq!((cell.col, cell.row), (2, 4));
        assert_eq!((cell.x, cell.y), (24.0, 48.0));
        assert!((cell.intensity - 0.5).abs() < 1e-6);
        assert!(g.heat_map(Channel::Food).is_empty());
    }
}
