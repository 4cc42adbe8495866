use std::cmp::{Ordering, Reverse};

use ordered_float::OrderedFloat;

use boxpack::entities::{BinTemplate, Packing};

/// Whether a higher or lower fitness is better
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Fixed bins are rated by density (maximize), growing bins by the extent reached (minimize)
    pub fn of(template: &BinTemplate) -> Self {
        match template.growing {
            Some(_) => Direction::Minimize,
            None => Direction::Maximize,
        }
    }

    /// Orders `a` before `b` if it is the better fitness
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            Direction::Maximize => Reverse(OrderedFloat(a)).cmp(&Reverse(OrderedFloat(b))),
            Direction::Minimize => OrderedFloat(a).cmp(&OrderedFloat(b)),
        }
    }

    pub fn is_better(&self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Fitness of a packing.
///
/// With fixed bins: the volume of the items in all bins but the last, relative to the volume of those bins.
/// The last bin is usually only partially filled and left out. With at most one bin the rating is `1.0`.
///
/// With a growing bin: the extent of the (trimmed) bin along the grow axis, `0.0` if there is no bin.
pub fn rate(packing: &Packing, template: &BinTemplate) -> f64 {
    match template.growing {
        Some(axis) => packing
            .bins
            .first()
            .map_or(0.0, |b| b.dims[axis] as f64),
        None => {
            let n_considered = packing.n_bins().saturating_sub(1);
            if n_considered == 0 {
                return 1.0;
            }
            let used: f64 = packing.bins[..n_considered]
                .iter()
                .map(|b| b.placed_volume())
                .sum();
            used / (n_considered as f64 * template.volume() as f64)
        }
    }
}
