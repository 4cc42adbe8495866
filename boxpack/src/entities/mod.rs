mod bin;
mod bin_template;
mod item;
mod packing;

#[doc(inline)]
pub use bin::Bin;
#[doc(inline)]
pub use bin::SpaceDelta;
#[doc(inline)]
pub use bin_template::BinTemplate;
#[doc(inline)]
pub use item::Item;
#[doc(inline)]
pub use packing::PackedBin;
#[doc(inline)]
pub use packing::Packing;
