use anyhow::Result;

use crate::entities::{BinTemplate, Item, Packing};

mod best_fit;
mod first_fit;
mod first_fit_2d;
mod gpu_best_fit;
mod packer;
mod scan;

#[doc(inline)]
pub use best_fit::BestFit3D;
#[doc(inline)]
pub use first_fit::FirstFit3D;
#[doc(inline)]
pub use first_fit_2d::FirstFit2D;
#[doc(inline)]
pub use gpu_best_fit::GpuBestFit;
#[doc(inline)]
pub use packer::SpaceSearch;
#[doc(inline)]
pub use packer::pack;
#[doc(inline)]
pub use scan::Candidate;
#[doc(inline)]
pub use scan::best_fit;
#[doc(inline)]
pub use scan::first_fit;

/// Turns an ordered sequence of items into a [`Packing`].
///
/// Items are handled strictly in the given order. The input items are never modified;
/// the packing holds placed copies.
/// Items which do not fit in an empty bin in any orientation are reported in [`Packing::unplaced`].
pub trait Solver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing>;

    /// Releases any backend resources held by the solver
    fn release(&self) -> Result<()> {
        Ok(())
    }
}
