use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, Vec3};

/// One of the six axis-permutations in which a box can be placed.
/// The name lists which original component ends up along x, y and z respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl Orientation {
    /// All orientations, in the order in which the solvers test them.
    /// This is also the order of the six score slots per space in the device output buffer.
    pub const ALL: [Orientation; 6] = [
        Orientation::XYZ,
        Orientation::XZY,
        Orientation::YXZ,
        Orientation::YZX,
        Orientation::ZXY,
        Orientation::ZYX,
    ];

    /// Axes of the original extent mapped onto x, y and z
    pub fn axes(&self) -> [Axis; 3] {
        use Axis::*;
        match self {
            Orientation::XYZ => [X, Y, Z],
            Orientation::XZY => [X, Z, Y],
            Orientation::YXZ => [Y, X, Z],
            Orientation::YZX => [Y, Z, X],
            Orientation::ZXY => [Z, X, Y],
            Orientation::ZYX => [Z, Y, X],
        }
    }

    /// Permutes `size` according to this orientation
    pub fn apply(&self, size: Vec3) -> Vec3 {
        let [a, b, c] = self.axes();
        Vec3::new(size[a], size[b], size[c])
    }
}
