use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::fsize;
use crate::geometry::{Axis, Vec3};

/// Prototype of the bins opened by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinTemplate {
    /// Extent of every bin opened from this template
    pub dims: Vec3,
    /// If set, the bin is unbounded along this axis during solving and trimmed afterwards.
    /// Only a single bin is ever opened in this mode.
    pub growing: Option<Axis>,
}

impl BinTemplate {
    pub fn new(dims: Vec3) -> Result<Self> {
        Self::validate(dims)?;
        Ok(BinTemplate {
            dims,
            growing: None,
        })
    }

    /// Template of a bin that grows along `axis`.
    /// The extent along `axis` in `dims` is only used as a reference (e.g. for volume based metrics).
    pub fn growing(dims: Vec3, axis: Axis) -> Result<Self> {
        Self::validate(dims)?;
        Ok(BinTemplate {
            dims,
            growing: Some(axis),
        })
    }

    /// Same as [`BinTemplate::growing`] with the axis given as a string (`"x"`, `"y"` or `"z"`).
    /// Unrecognized axes are rejected.
    pub fn growing_str(dims: Vec3, axis: &str) -> Result<Self> {
        Self::growing(dims, axis.parse()?)
    }

    fn validate(dims: Vec3) -> Result<()> {
        ensure!(
            dims.is_positive_finite(),
            "bin template dimensions must be positive and finite, got {dims}"
        );
        Ok(())
    }

    /// Extent used while solving: the grow axis (if any) is unbounded
    pub fn solving_dims(&self) -> Vec3 {
        match self.growing {
            Some(axis) => self.dims.with(axis, fsize::INFINITY),
            None => self.dims,
        }
    }

    pub fn volume(&self) -> fsize {
        self.dims.volume()
    }
}
