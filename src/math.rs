//! Deterministic fixed-point scalar and integer grid coordinates.
//!
//! Traversal costs are accumulated in fixed point so that the cost recorded by a
//! search equals the sum of the edge costs along the returned path, bit for bit,
//! on every platform.

use fixed::types::I48F16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Fixed-point number type used for every cost and heuristic.
///
/// Uses I48F16 format: 48 bits for the integer part, 16 bits for the fractional part.
pub type FixedNum = I48F16;

/// Integer 3-D grid coordinate. `z` is the layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Same size on every axis.
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Location directly above (`dz = +1`).
    pub fn above(self) -> Self {
        Self::new(self.x, self.y, self.z + 1)
    }

    /// Location directly below (`dz = -1`).
    pub fn below(self) -> Self {
        Self::new(self.x, self.y, self.z - 1)
    }

    /// Chebyshev distance on the x/y plane, ignoring layers.
    pub fn chebyshev_lateral(self, other: Self) -> i32 {
        let d = (self - other).abs();
        d.x.max(d.y)
    }

    /// Number of cells in a box of this size; zero if any axis is not positive.
    /// Saturates at `usize::MAX`.
    pub fn volume(self) -> usize {
        self.checked_volume().unwrap_or(usize::MAX)
    }

    /// Like [`Location::volume`], `None` on overflow.
    pub fn checked_volume(self) -> Option<usize> {
        if self.x <= 0 || self.y <= 0 || self.z <= 0 {
            return Some(0);
        }
        (self.x as usize)
            .checked_mul(self.y as usize)?
            .checked_mul(self.z as usize)
    }

    /// True if every component is within `0..size` on its axis.
    pub fn within(self, size: Self) -> bool {
        (0..size.x).contains(&self.x) && (0..size.y).contains(&self.y) && (0..size.z).contains(&self.z)
    }

    pub fn magnitude_squared(self) -> FixedNum {
        let sq = |v: i32| FixedNum::from_num(v) * FixedNum::from_num(v);
        sq(self.x) + sq(self.y) + sq(self.z)
    }

    /// Euclidean length.
    pub fn magnitude(self) -> FixedNum {
        let len_sq = self.magnitude_squared();
        if len_sq == FixedNum::ZERO {
            return FixedNum::ZERO;
        }
        len_sq.sqrt()
    }

    /// Iterate every location of a box of `size` in z, y, x order
    /// (x varies fastest), matching dense node id order.
    pub fn iter_box(size: Self) -> impl Iterator<Item = Location> {
        let size = size.max(Self::ZERO);
        (0..size.z).flat_map(move |z| (0..size.y).flat_map(move |y| (0..size.x).map(move |x| Location::new(x, y, z))))
    }
}

impl Add for Location {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Location {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Location {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<(i32, i32, i32)> for Location {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
