use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::fsize;
use crate::geometry::{Orientation, Vec3};

/// A box to be packed.
/// `position` is only meaningful once a solver has placed it (callers pass zero),
/// `size` of a placed copy reflects the orientation chosen by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier, preserved across solves
    pub id: usize,
    pub position: Vec3,
    pub size: Vec3,
}

impl Item {
    /// Creates an unplaced item
    pub fn new(id: usize, size: Vec3) -> Self {
        Item {
            id,
            position: Vec3::ZERO,
            size,
        }
    }

    pub fn volume(&self) -> fsize {
        self.size.volume()
    }

    /// Copy of `self` at `position` in the given orientation, leaving `self` untouched
    pub fn placed_copy(&self, position: Vec3, orientation: Orientation) -> Item {
        Item {
            id: self.id,
            position,
            size: orientation.apply(self.size),
        }
    }

    /// Far corner of the item (position + size)
    pub fn max_corner(&self) -> Vec3 {
        self.position + self.size
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Item(id={}, pos={}, size={})", self.id, self.position, self.size)
    }
}
