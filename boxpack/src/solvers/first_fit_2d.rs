use anyhow::{Result, ensure};
use log::debug;

use crate::entities::{Bin, BinTemplate, Item, Packing};
use crate::geometry::{Axis, Space, Vec3};
use crate::solvers::{Candidate, SpaceSearch, Solver, first_fit, pack};

/// Planar first-fit: only the footprint (x and y) of the items is packed.
///
/// Every item is placed at depth zero, keeping the extent along z it has in the chosen orientation.
/// A consumed space is split into a full-width strip above the item and
/// a strip to its right, limited to the item's height (shelf-like layout).
/// Bins growing along z are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit2D;

impl Solver for FirstFit2D {
    fn name(&self) -> &str {
        "first-fit-2d"
    }

    fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
        ensure!(
            template.growing != Some(Axis::Z),
            "planar packing cannot grow along {}",
            Axis::Z
        );
        let packing = pack(&mut PlanarSearch, items, template)?;
        debug!(
            "[FF2D] packed {} items into {} bins",
            packing.n_placed(),
            packing.n_bins()
        );
        Ok(packing)
    }
}

struct PlanarSearch;

impl SpaceSearch for PlanarSearch {
    fn tag(&self) -> &str {
        "FF2D"
    }

    fn search(&mut self, bins: &[Bin], item: &Item) -> Result<Option<Candidate>> {
        Ok(first_fit(bins, item, true))
    }

    fn remainders(&self, space: &Space, placed: Vec3) -> [Option<Space>; 3] {
        let [top, right] = space.guillotine_split_2d(placed);
        [top, right, None]
    }

    fn is_planar(&self) -> bool {
        true
    }
}
