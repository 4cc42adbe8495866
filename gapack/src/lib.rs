//! Genetic optimization of the order in which boxes are handed to a [`boxpack`] solver.

use std::sync::LazyLock;
use std::time::Instant;

pub mod breeding;
pub mod config;
pub mod eval_pool;
pub mod fitness;
pub mod ga_optimizer;
pub mod io;

pub static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// An ordering of the input boxes, by index: every index appears exactly once
pub type Permutation = Vec<usize>;
