use std::cmp::Ordering;
use std::fmt::{Debug, Display};

use crate::fsize;

/// Float wrapper comparing with a tolerance, see [`float_cmp::approx_eq!()`].
/// Placement coordinates are sums of extents, so exact comparisons of them are not meaningful.
#[derive(Debug, Clone, Copy)]
pub struct FPA(pub fsize);

impl FPA {
    /// `a <= b`, tolerating rounding
    pub fn le(a: fsize, b: fsize) -> bool {
        FPA(a) <= FPA(b)
    }

    /// `a > b`, tolerating rounding
    pub fn gt(a: fsize, b: fsize) -> bool {
        FPA(a) > FPA(b)
    }
}

impl<T: Into<fsize>> From<T> for FPA {
    fn from(n: T) -> Self {
        FPA(n.into())
    }
}

impl PartialEq for FPA {
    fn eq(&self, other: &Self) -> bool {
        float_cmp::approx_eq!(fsize, self.0, other.0, ulps = 4)
    }
}

impl PartialOrd for FPA {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        self.0.partial_cmp(&other.0)
    }
}

impl Display for FPA {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
