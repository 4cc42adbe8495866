use std::ops::Range;

use crate::entities::{Item, PackedBin};
use crate::fsize;
use crate::geometry::{Axis, Space, Vec3};

/// A [`Bin`] is a container being filled: the items placed in it and the free spaces left.
///
/// Free spaces live in a contiguous arena addressed by index.
/// Consuming a space removes it with swap-remove: the last space moves into the vacated slot,
/// and the remainders of the split are appended at the end.
/// Every solver relies on this discipline, so the scan order (and with it first-fit tie-breaking)
/// is reproducible.
#[derive(Clone, Debug)]
pub struct Bin {
    pub index: usize,
    pub dims: Vec3,
    items: Vec<Item>,
    free_spaces: Vec<Space>,
}

/// Changes to the free space arena caused by a single modification
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceDelta {
    /// Index of the consumed space
    pub vacated: usize,
    /// The space that was moved from the end of the arena into `vacated`, if any
    pub moved: Option<Space>,
    /// Indices of the newly appended spaces
    pub appended: Range<usize>,
}

impl Bin {
    /// A fresh bin with a single free space spanning `dims`
    pub fn new(index: usize, dims: Vec3) -> Self {
        Bin {
            index,
            dims,
            items: vec![],
            free_spaces: vec![Space::full(dims)],
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn free_spaces(&self) -> &[Space] {
        &self.free_spaces
    }

    /// Places `placed` (already positioned and oriented) in the free space at `space_idx`
    /// and replaces that space with the non-degenerate `remainders`.
    pub fn place_item(
        &mut self,
        space_idx: usize,
        placed: Item,
        remainders: impl IntoIterator<Item = Option<Space>>,
    ) -> SpaceDelta {
        debug_assert!(self.free_spaces[space_idx].origin() == placed.position);
        self.items.push(placed);

        self.free_spaces.swap_remove(space_idx);
        let moved = self.free_spaces.get(space_idx).copied();

        let start = self.free_spaces.len();
        self.free_spaces.extend(remainders.into_iter().flatten());
        let appended = start..self.free_spaces.len();

        SpaceDelta {
            vacated: space_idx,
            moved,
            appended,
        }
    }

    /// Makes room along the grow `axis` of an unbounded bin.
    ///
    /// Every free space is cut off at the highest point reached by the items (dropping the ones that vanish),
    /// and a single space spanning the full cross-section from that point onwards is appended.
    /// None of the clipped spaces reaches into the appended one. Returns the appended space,
    /// `None` if the bin is already filled up to its extent along `axis`.
    pub fn raise_ceiling(&mut self, axis: Axis) -> Option<Space> {
        let ceiling = self.used_extent(axis);
        self.free_spaces = self
            .free_spaces
            .iter()
            .filter_map(|s| {
                let origin = s.origin();
                let extent = s.extent();
                let clipped = fsize::min(extent[axis], ceiling - origin[axis]);
                Space::from_parts(origin, extent.with(axis, clipped))
            })
            .collect();

        let origin = Vec3::ZERO.with(axis, ceiling);
        let extent = self.dims.with(axis, self.dims[axis] - ceiling);
        let space = Space::from_parts(origin, extent);
        self.free_spaces.extend(space);
        space
    }

    /// Largest extent reached by any placed item along `axis`
    pub fn used_extent(&self, axis: Axis) -> fsize {
        self.items
            .iter()
            .map(|i| i.position[axis] + i.size[axis])
            .fold(0.0, fsize::max)
    }

    /// Shrinks the bin along `axis` to the extent actually used by its items
    pub fn trim(&mut self, axis: Axis) {
        self.dims = self.dims.with(axis, self.used_extent(axis));
    }

    pub fn placed_volume(&self) -> f64 {
        self.items.iter().map(|i| i.volume() as f64).sum()
    }

    pub fn into_packed(self) -> PackedBin {
        PackedBin {
            index: self.index,
            dims: self.dims,
            items: self.items,
        }
    }
}
