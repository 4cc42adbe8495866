use anyhow::Result;
use log::debug;

use crate::entities::{Bin, BinTemplate, Item, Packing};
use crate::solvers::{Candidate, SpaceSearch, Solver, best_fit, pack};

/// Places every item in the orientation and free space (across all open bins)
/// which leaves the least volume unused. Ties are resolved in favour of the earliest candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit3D;

impl Solver for BestFit3D {
    fn name(&self) -> &str {
        "best-fit-3d"
    }

    fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
        let packing = pack(&mut BestFitSearch, items, template)?;
        debug!(
            "[BF3D] packed {} items into {} bins",
            packing.n_placed(),
            packing.n_bins()
        );
        Ok(packing)
    }
}

struct BestFitSearch;

impl SpaceSearch for BestFitSearch {
    fn tag(&self) -> &str {
        "BF3D"
    }

    fn search(&mut self, bins: &[Bin], item: &Item) -> Result<Option<Candidate>> {
        Ok(best_fit(bins, item))
    }
}
