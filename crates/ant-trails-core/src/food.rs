use crate::math::distance_squared;

#[derive(Clone, Debug, PartialEq)]
pub struct FoodSource {
    pub position: [f64; 2],
    pub amount: u32,
    /// Ants within this distance of `position` can pick up food.
    pub radius: f64,
}

impl FoodSource {
    pub fn new(position: [f64; 2], amount: u32, radius: f64) -> Self {
        Self {
            position,
            amount,
            radius,
        }
    }

    /// Remove one unit. Returns `false` and leaves the source untouched when empty.
    pub fn take(&mut self) -> bool {
        if self.amount == 0 {
            return false;
        }
        self.amount -= 1;
        true
    }

    pub fn is_depleted(&self) -> bool {
        self.amount == 0
    }

    pub fn in_pickup_range(&self, position: [f64; 2]) -> bool {
        distance_squared(self.position, position) <= self.radius * self.radius
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Nest {
    pub position: [f64; 2],
    pub radius: f64,
    pub food_stored: u64,
}

impl Nest {
    pub fn new(position: [f64; 2], radius: f64) -> Self {
        Self {
            position,
            radius,
            food_stored: 0,
        }
    }

    pub fn deliver_food(&mut self) {
        self.food_stored = self.food_stored.saturating_add(1);
    }

    pub fn contains(&self, position: [f64; 2]) -> bool {
        distance_squared(self.position, position) <= self.radius * self.radius
    }
}
