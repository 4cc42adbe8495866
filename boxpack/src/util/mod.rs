/// Checks verifying the correctness of packings, used in `debug_assert!()` blocks and tests
pub mod assertions;

mod fpa;

#[doc(inline)]
pub use fpa::FPA;
