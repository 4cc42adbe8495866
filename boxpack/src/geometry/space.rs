use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::fsize;
use crate::geometry::Vec3;

/// Number of floats in the device record of a [`Space`]: x, y, z, w, h, d and the bin index
pub const SPACE_RECORD_LEN: usize = 7;

/// Axis-aligned empty region of a bin, available for future placements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub x: fsize,
    pub y: fsize,
    pub z: fsize,
    pub w: fsize,
    pub h: fsize,
    pub d: fsize,
}

impl Space {
    /// Returns `None` if any of the extents is not strictly positive.
    /// Degenerate spaces are never stored in a bin.
    pub fn new_checked(
        x: fsize,
        y: fsize,
        z: fsize,
        w: fsize,
        h: fsize,
        d: fsize,
    ) -> Option<Space> {
        match w > 0.0 && h > 0.0 && d > 0.0 {
            true => Some(Space { x, y, z, w, h, d }),
            false => None,
        }
    }

    pub fn from_parts(origin: Vec3, extent: Vec3) -> Option<Space> {
        Space::new_checked(origin.x, origin.y, origin.z, extent.x, extent.y, extent.z)
    }

    /// The space spanning a full bin of extent `dims`
    pub fn full(dims: Vec3) -> Space {
        Space {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: dims.x,
            h: dims.y,
            d: dims.z,
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.w, self.h, self.d)
    }

    pub fn volume(&self) -> fsize {
        self.w * self.h * self.d
    }

    /// True if a box of extent `size` (already oriented) fits inside
    pub fn fits(&self, size: Vec3) -> bool {
        size.fits_within(&self.extent())
    }

    /// True if the footprint (x and y only) of `size` fits inside
    pub fn fits_footprint(&self, size: Vec3) -> bool {
        size.x <= self.w && size.y <= self.h
    }

    /// Volume left unused when a box of extent `size` is placed in this space
    pub fn waste(&self, size: Vec3) -> fsize {
        self.volume() - size.volume()
    }

    /// Splits the space around a box of extent `placed` located at the space's origin.
    /// Returns the right, top and front remainders, in that order, dropping degenerate ones.
    ///
    /// * right: everything beyond the box along x
    /// * top: above the box along y, limited to the box's width
    /// * front: beyond the box along z, limited to the box's width and height
    pub fn guillotine_split(&self, placed: Vec3) -> [Option<Space>; 3] {
        let right = Space::new_checked(
            self.x + placed.x,
            self.y,
            self.z,
            self.w - placed.x,
            self.h,
            self.d,
        );
        let top = Space::new_checked(
            self.x,
            self.y + placed.y,
            self.z,
            placed.x,
            self.h - placed.y,
            self.d,
        );
        let front = Space::new_checked(
            self.x,
            self.y,
            self.z + placed.z,
            placed.x,
            placed.y,
            self.d - placed.z,
        );
        [right, top, front]
    }

    /// Planar variant of [`Space::guillotine_split`], ignoring depth.
    /// Returns the top (full width) and right (limited to the box's height) remainders.
    pub fn guillotine_split_2d(&self, placed: Vec3) -> [Option<Space>; 2] {
        let top = Space::new_checked(
            self.x,
            self.y + placed.y,
            self.z,
            self.w,
            self.h - placed.y,
            self.d,
        );
        let right = Space::new_checked(
            self.x + placed.x,
            self.y,
            self.z,
            self.w - placed.x,
            placed.y,
            self.d,
        );
        [top, right]
    }

    /// Device representation of the space
    pub fn to_record(&self, bin_index: usize) -> [f32; SPACE_RECORD_LEN] {
        [
            self.x,
            self.y,
            self.z,
            self.w,
            self.h,
            self.d,
            bin_index as f32,
        ]
    }
}

impl Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Space(x={:.2}, y={:.2}, z={:.2}, w={:.2}, h={:.2}, d={:.2})",
            self.x, self.y, self.z, self.w, self.h, self.d
        )
    }
}
