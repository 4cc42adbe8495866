//! A packing engine for axis-aligned 3D boxes.
//!
//! Boxes are placed into fixed-size (or one-axis-growable) bins by keeping a list of free
//! spaces per bin and splitting the used space guillotine-style after every placement.

/// Geometric primitives: vectors, axes, orientations and free spaces
pub mod geometry;

/// Entities to model the packing problem: items, bins, templates and packings
pub mod entities;

/// Solvers turning an ordered sequence of items into a packing
pub mod solvers;

/// Host-side abstraction of a compute device used by the accelerated best-fit solver
pub mod device;

/// Helper functions which do not belong to any specific module
pub mod util;

#[allow(non_camel_case_types)]
/// The floating point type used for all geometry in the engine
pub type fsize = f32;
