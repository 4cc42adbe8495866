use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::entities::{BinTemplate, Item};
use crate::geometry::Vec3;

/// A filled bin as returned by a solver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackedBin {
    pub index: usize,
    /// Extent of the bin, trimmed along the grow axis in growing-bin mode
    pub dims: Vec3,
    /// Placed copies of the items, in placement order
    pub items: Vec<Item>,
}

impl PackedBin {
    pub fn placed_volume(&self) -> f64 {
        self.items.iter().map(|i| i.volume() as f64).sum()
    }
}

/// Result of a solve: the filled bins in the order they were opened,
/// and the ids of the items that did not fit in an empty bin in any orientation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Packing {
    pub bins: Vec<PackedBin>,
    pub unplaced: Vec<usize>,
}

impl Packing {
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn n_placed(&self) -> usize {
        self.bins.iter().map(|b| b.items.len()).sum()
    }

    /// The packing as a plain list of item lists, one per bin
    pub fn item_lists(&self) -> Vec<Vec<Item>> {
        self.bins.iter().map(|b| b.items.clone()).collect_vec()
    }

    pub fn placed_items(&self) -> impl Iterator<Item = &Item> {
        self.bins.iter().flat_map(|b| b.items.iter())
    }

    pub fn placed_volume(&self) -> f64 {
        self.bins.iter().map(|b| b.placed_volume()).sum()
    }

    /// Ratio of the placed volume to the total volume of all bins used (template extent)
    pub fn density(&self, template: &BinTemplate) -> f64 {
        match self.bins.is_empty() {
            true => 0.0,
            false => self.placed_volume() / (self.n_bins() as f64 * template.volume() as f64),
        }
    }
}
