use anyhow::Result;
use log::debug;

use crate::entities::{Bin, BinTemplate, Item, Packing};
use crate::solvers::{Candidate, SpaceSearch, Solver, first_fit, pack};

/// Places every item in the first free space (bins in opening order, spaces in arena order)
/// which admits it in any orientation. Orientations are tried in the order of [`crate::geometry::Orientation::ALL`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit3D;

impl Solver for FirstFit3D {
    fn name(&self) -> &str {
        "first-fit-3d"
    }

    fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
        let packing = pack(&mut FirstFitSearch, items, template)?;
        debug!(
            "[FF3D] packed {} items into {} bins",
            packing.n_placed(),
            packing.n_bins()
        );
        Ok(packing)
    }
}

struct FirstFitSearch;

impl SpaceSearch for FirstFitSearch {
    fn tag(&self) -> &str {
        "FF3D"
    }

    fn search(&mut self, bins: &[Bin], item: &Item) -> Result<Option<Candidate>> {
        Ok(first_fit(bins, item, false))
    }
}
