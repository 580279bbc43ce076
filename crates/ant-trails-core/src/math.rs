//! Small vector and angle helpers shared by the grid, the ants and the world.
//!
//! Vectors are plain `[f64; 2]` arrays, matching how positions are stored.

use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Unit vector returned when a direction cannot be normalized.
pub const FALLBACK_DIRECTION: [f64; 2] = [1.0, 0.0];

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Wrap `value` into `[min, max)`. A zero-width range collapses to `min`.
pub fn wrap(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range <= 0.0 || !value.is_finite() {
        return min;
    }
    let wrapped = (value - min).rem_euclid(range) + min;
    // rem_euclid can round up to exactly `range` for tiny negative inputs.
    if wrapped >= max {
        min
    } else {
        wrapped
    }
}

/// Normalize an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Signed shortest rotation taking `source` onto `target`, in `(-π, π]`.
pub fn angle_difference(target: f64, source: f64) -> f64 {
    wrap_angle(target - source)
}

pub fn length(v: [f64; 2]) -> f64 {
    v[0].hypot(v[1])
}

pub fn distance_squared(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Unit vector in the direction of `v`, or [`FALLBACK_DIRECTION`] when `v` has
/// zero or non-finite length.
pub fn normalize(v: [f64; 2]) -> [f64; 2] {
    let len = length(v);
    if len > 0.0 && len.is_finite() {
        [v[0] / len, v[1] / len]
    } else {
        FALLBACK_DIRECTION
    }
}

pub fn add(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] + b[0], a[1] + b[1]]
}

pub fn scale(v: [f64; 2], s: f64) -> [f64; 2] {
    [v[0] * s, v[1] * s]
}

pub fn direction_from_angle(angle: f64) -> [f64; 2] {
    let (sin, cos) = angle.sin_cos();
    [cos, sin]
}

pub fn angle_from_direction(v: [f64; 2]) -> f64 {
    v[1].atan2(v[0])
}

/// Uniform sample from `[lo, hi)`; returns `lo` for an empty range instead of
/// panicking.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}
