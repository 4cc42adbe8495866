use crate::entities::{Bin, Item};
use crate::fsize;
use crate::geometry::{Orientation, Space, Vec3};

/// A possible placement of an item: which free space of which bin, in which orientation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub bin: usize,
    pub space: usize,
    pub orientation: Orientation,
    /// Volume of the space left unused by the item
    pub waste: fsize,
}

/// Scans bins in order, then their free spaces in arena order, then the orientations,
/// and returns the first one that fits.
/// If `planar`, only the footprint (x and y) of the oriented item has to fit.
pub fn first_fit(bins: &[Bin], item: &Item, planar: bool) -> Option<Candidate> {
    bins.iter().find_map(|bin| {
        bin.free_spaces()
            .iter()
            .enumerate()
            .find_map(|(s_idx, space)| {
                Orientation::ALL
                    .into_iter()
                    .find(|o| fits(space, o.apply(item.size), planar))
                    .map(|o| Candidate {
                        bin: bin.index,
                        space: s_idx,
                        orientation: o,
                        waste: space.waste(o.apply(item.size)),
                    })
            })
    })
}

/// Evaluates every orientation in every free space of every bin
/// and returns the one with the least wasted volume.
/// Ties go to the candidate encountered first.
pub fn best_fit(bins: &[Bin], item: &Item) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for bin in bins {
        for (s_idx, space) in bin.free_spaces().iter().enumerate() {
            for o in Orientation::ALL {
                let size = o.apply(item.size);
                if !space.fits(size) {
                    continue;
                }
                let waste = space.waste(size);
                let improves = match &best {
                    Some(b) => waste < b.waste,
                    None => true,
                };
                if improves {
                    best = Some(Candidate {
                        bin: bin.index,
                        space: s_idx,
                        orientation: o,
                        waste,
                    });
                }
            }
        }
    }
    best
}

fn fits(space: &Space, size: Vec3, planar: bool) -> bool {
    match planar {
        true => space.fits_footprint(size),
        false => space.fits(size),
    }
}
