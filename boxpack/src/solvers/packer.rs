use anyhow::Result;
use itertools::Itertools;
use log::{debug, warn};

use crate::entities::{Bin, BinTemplate, Item, Packing, SpaceDelta};
use crate::geometry::{Space, Vec3};
use crate::solvers::Candidate;
use crate::util::assertions;

/// Placement policy plugged into [`pack`].
///
/// Implementations decide where an item goes and how a consumed space is split.
/// The hooks allow a backend to mirror the free space arenas of the bins (e.g. on a compute device).
pub trait SpaceSearch {
    /// Short tag used in log messages
    fn tag(&self) -> &str;

    /// Searches `bins` for a placement of `item`. `bins` is either every open bin or only the newest one.
    fn search(&mut self, bins: &[Bin], item: &Item) -> Result<Option<Candidate>>;

    /// Splits `space` around an item of extent `placed` located at the space's origin
    fn remainders(&self, space: &Space, placed: Vec3) -> [Option<Space>; 3] {
        space.guillotine_split(placed)
    }

    /// True if only the footprint (x and y) of the items is packed
    fn is_planar(&self) -> bool {
        false
    }

    fn bin_opened(&mut self, _bin: &Bin) -> Result<()> {
        Ok(())
    }

    /// Called after a placement, with the resulting changes to the free space arena of `bin`
    fn spaces_changed(&mut self, _bin: &Bin, _delta: &SpaceDelta) -> Result<()> {
        Ok(())
    }

    /// Called after the free space arena of `bin` was rebuilt as a whole
    fn spaces_rebuilt(&mut self, _bin: &Bin) -> Result<()> {
        Ok(())
    }
}

/// Packs `items`, in order, into bins opened from `template`.
///
/// For every item, all open bins are searched. If none admits the item, a new bin is opened
/// and the search is repeated in it alone. Items which fit in no empty bin are reported as unplaced.
///
/// In growing-bin mode a single bin is used, unbounded along the grow axis.
/// When it has no room left for an item, its ceiling is raised (see [`Bin::raise_ceiling`])
/// instead of opening another bin.
/// Afterwards the bin is trimmed to the extent actually used.
pub fn pack<S: SpaceSearch>(
    search: &mut S,
    items: &[Item],
    template: &BinTemplate,
) -> Result<Packing> {
    let dims = template.solving_dims();
    let mut bins = vec![Bin::new(0, dims)];
    search.bin_opened(&bins[0])?;

    let mut unplaced = vec![];

    for item in items {
        if let Some(cand) = search.search(&bins, item)? {
            place(search, &mut bins[cand.bin], item, cand)?;
            continue;
        }
        let last = match template.growing {
            Some(axis) => {
                let bin = &mut bins[0];
                let ceiling = bin.raise_ceiling(axis);
                debug!(
                    "[{}] bin grows along {axis}, free space above the items: {ceiling:?}",
                    search.tag()
                );
                search.spaces_rebuilt(bin)?;
                0
            }
            None => {
                let bin = Bin::new(bins.len(), dims);
                debug!("[{}] opening bin {}", search.tag(), bin.index);
                search.bin_opened(&bin)?;
                bins.push(bin);
                bins.len() - 1
            }
        };
        match search.search(std::slice::from_ref(&bins[last]), item)? {
            Some(cand) => place(search, &mut bins[last], item, cand)?,
            None => {
                warn!(
                    "[{}] item {} with size {} does not fit in an empty bin of size {}",
                    search.tag(),
                    item.id,
                    item.size,
                    template.dims
                );
                unplaced.push(item.id);
            }
        }
    }

    if let Some(axis) = template.growing {
        bins.iter_mut().for_each(|b| b.trim(axis));
    }

    let packing = Packing {
        bins: bins.into_iter().map(Bin::into_packed).collect_vec(),
        unplaced,
    };

    debug_assert!(assertions::packing_is_valid(
        items,
        &packing,
        template,
        search.is_planar()
    ));

    Ok(packing)
}

fn place<S: SpaceSearch>(search: &mut S, bin: &mut Bin, item: &Item, cand: Candidate) -> Result<()> {
    let space = bin.free_spaces()[cand.space];
    let placed = item.placed_copy(space.origin(), cand.orientation);
    let remainders = search.remainders(&space, placed.size);
    let delta = bin.place_item(cand.space, placed, remainders);
    debug!(
        "[{}] placed item {} in bin {} at {} with size {} (waste: {:.2})",
        search.tag(),
        placed.id,
        bin.index,
        placed.position,
        placed.size,
        cand.waste
    );
    search.spaces_changed(bin, &delta)
}
