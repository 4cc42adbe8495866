use std::collections::HashSet;

use itertools::Itertools;
use log::error;

use crate::entities::{BinTemplate, Item, PackedBin, Packing};
use crate::geometry::{Axis, Vec3};
use crate::util::FPA;

/// Every input item is accounted for exactly once, either placed or reported as unplaced,
/// and every bin is valid (see [`bin_is_valid`]).
pub fn packing_is_valid(
    items: &[Item],
    packing: &Packing,
    template: &BinTemplate,
    planar: bool,
) -> bool {
    ids_accounted_for(items, packing)
        && packing
            .bins
            .iter()
            .all(|b| bin_is_valid(items, b, template, planar))
}

pub fn ids_accounted_for(items: &[Item], packing: &Packing) -> bool {
    let reported = packing
        .placed_items()
        .map(|i| i.id)
        .chain(packing.unplaced.iter().copied())
        .collect_vec();
    let unique = reported.iter().copied().collect::<HashSet<usize>>();
    let expected = items.iter().map(|i| i.id).collect::<HashSet<usize>>();

    if reported.len() != unique.len() {
        error!("item reported more than once: {reported:?}");
        return false;
    }
    if unique != expected {
        let missing = expected.difference(&unique).sorted().collect_vec();
        let unknown = unique.difference(&expected).sorted().collect_vec();
        error!("item ids do not match the input, missing: {missing:?}, unknown: {unknown:?}");
        return false;
    }
    true
}

/// Placed extents are a permutation of the original ones, items lie within the bin and do not overlap.
/// If `planar`, depth is not checked against the bin.
pub fn bin_is_valid(items: &[Item], bin: &PackedBin, template: &BinTemplate, planar: bool) -> bool {
    for placed in &bin.items {
        let Some(original) = items.iter().find(|i| i.id == placed.id) else {
            error!("bin {} holds unknown item {}", bin.index, placed.id);
            return false;
        };
        if original.size.sorted() != placed.size.sorted() {
            error!(
                "item {} was deformed: {} became {}",
                placed.id, original.size, placed.size
            );
            return false;
        }
        if !within_bounds(placed, bin.dims, planar) {
            error!(
                "item {} exceeds bin {} with extent {}",
                placed, bin.index, bin.dims
            );
            return false;
        }
    }
    if template.growing.is_none() && bin.dims != template.dims {
        error!(
            "bin {} has extent {}, expected {}",
            bin.index, bin.dims, template.dims
        );
        return false;
    }
    for (a, b) in bin.items.iter().tuple_combinations() {
        if overlap(a, b) {
            error!("items overlap in bin {}: {a} and {b}", bin.index);
            return false;
        }
    }
    true
}

fn within_bounds(item: &Item, dims: Vec3, planar: bool) -> bool {
    let n_axes = if planar { 2 } else { 3 };
    let max = item.max_corner();
    Axis::ALL[..n_axes]
        .iter()
        .all(|&a| item.position[a] >= 0.0 && FPA::le(max[a], dims[a]))
}

/// Interiors intersect by more than a rounding error along every axis
fn overlap(a: &Item, b: &Item) -> bool {
    let (a_max, b_max) = (a.max_corner(), b.max_corner());
    Axis::ALL.iter().all(|&ax| {
        let lo = a.position[ax].max(b.position[ax]);
        let hi = a_max[ax].min(b_max[ax]);
        FPA::gt(hi, lo)
    })
}
