use std::fmt::Display;
use std::ops::{Add, Index};

use serde::{Deserialize, Serialize};

use crate::fsize;
use crate::geometry::Axis;

/// Three component vector, used both as a position and as an extent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: fsize,
    pub y: fsize,
    pub z: fsize,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: fsize, y: fsize, z: fsize) -> Self {
        Vec3 { x, y, z }
    }

    /// Product of the three components
    pub fn volume(&self) -> fsize {
        self.x * self.y * self.z
    }

    /// True if every component of `self` is smaller than or equal to the matching component of `other`
    pub fn fits_within(&self, other: &Vec3) -> bool {
        self.x <= other.x && self.y <= other.y && self.z <= other.z
    }

    /// True if all components are strictly positive and finite
    pub fn is_positive_finite(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|c| c.is_finite() && *c > 0.0)
    }

    /// Returns a copy of `self` with the component along `axis` replaced by `value`
    pub fn with(mut self, axis: Axis, value: fsize) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// The components sorted in ascending order, used to compare extents independent of orientation
    pub fn sorted(&self) -> [fsize; 3] {
        let mut c = [self.x, self.y, self.z];
        c.sort_by(|a, b| a.total_cmp(b));
        c
    }
}

impl Index<Axis> for Vec3 {
    type Output = fsize;

    fn index(&self, axis: Axis) -> &fsize {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
