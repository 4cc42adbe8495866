mod axis;
mod orientation;
mod space;
mod vec3;

#[doc(inline)]
pub use axis::Axis;
#[doc(inline)]
pub use orientation::Orientation;
#[doc(inline)]
pub use space::SPACE_RECORD_LEN;
#[doc(inline)]
pub use space::Space;
#[doc(inline)]
pub use vec3::Vec3;
