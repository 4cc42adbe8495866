use anyhow::Result;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

mod host;

#[doc(inline)]
pub use host::DeviceUsage;
#[doc(inline)]
pub use host::HostDevice;
#[doc(inline)]
pub use host::HostPlatform;

/// Entry point of the kernel scoring every (free space, orientation) pair of a bin
pub const BESTFIT_KERNEL: &str = "bestfit_rotate";

/// Number of scores the kernel writes per free space, one per orientation
pub const SCORES_PER_SPACE: usize = 6;

/// Score written by the kernel for an orientation which does not fit the space.
///
/// Any negative score is read as "does not fit". A score of zero is a valid exact fit,
/// so kernels must not use `0.0` to signal a miss.
pub const NO_FIT: f32 = -1.0;

new_key_type! {
    /// Handle to a buffer allocated on a [`ComputeDevice`]
    pub struct BufferKey;
    /// Handle to a kernel compiled on a [`ComputeDevice`]
    pub struct KernelKey;
}

/// Source of compute devices, e.g. a driver platform
pub trait ComputePlatform {
    /// Opens the first device matching `preference`
    fn open_device(&self, preference: &DevicePreference) -> Result<Box<dyn ComputeDevice>>;
}

/// Narrow host-side view of a compute device.
///
/// All transfers are blocking. Offsets and lengths are expressed in floats.
/// Every handle handed out must be released exactly once.
///
/// The [`BESTFIT_KERNEL`] takes the box extents as arguments 0 to 2 and the space records (input)
/// and scores (output) buffers as arguments 3 and 4. Per space record it writes [`SCORES_PER_SPACE`] scores,
/// in the order of [`crate::geometry::Orientation::ALL`]: the volume left unused (`>= 0`) if the oriented box fits,
/// [`NO_FIT`] otherwise.
pub trait ComputeDevice: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    fn build_kernel(&mut self, source: &KernelSource) -> Result<KernelKey>;

    fn create_buffer(&mut self, access: BufferAccess, len: usize) -> Result<BufferKey>;

    fn write_buffer(&mut self, buffer: BufferKey, offset: usize, data: &[f32]) -> Result<()>;

    fn read_buffer(&mut self, buffer: BufferKey, offset: usize, out: &mut [f32]) -> Result<()>;

    fn set_kernel_arg(&mut self, kernel: KernelKey, index: usize, arg: KernelArg) -> Result<()>;

    /// Runs `kernel` with one work item per index in `0..global_work_size`
    fn dispatch(&mut self, kernel: KernelKey, global_work_size: usize) -> Result<()>;

    fn release_buffer(&mut self, buffer: BufferKey) -> Result<()>;

    fn release_kernel(&mut self, kernel: KernelKey) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferAccess {
    ReadOnly,
    WriteOnly,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KernelArg {
    Float(f32),
    Buffer(BufferKey),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Any,
    Gpu,
    Cpu,
}

/// Which device to open
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DevicePreference {
    pub kind: DeviceKind,
    /// Only devices whose name contains this string (case-insensitive) are considered
    pub name_contains: Option<String>,
}

impl DevicePreference {
    pub fn matches(&self, name: &str, kind: DeviceKind) -> bool {
        let kind_ok = match self.kind {
            DeviceKind::Any => true,
            k => k == kind,
        };
        let name_ok = self
            .name_contains
            .as_ref()
            .is_none_or(|n| name.to_lowercase().contains(&n.to_lowercase()));
        kind_ok && name_ok
    }
}

/// Identifies the kernel to build. The program text itself is opaque to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSource {
    pub entry_point: String,
    pub program: Option<String>,
}

impl Default for KernelSource {
    fn default() -> Self {
        Self {
            entry_point: BESTFIT_KERNEL.to_string(),
            program: None,
        }
    }
}

/// Configuration of the device-backed best-fit solver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Number of free spaces the buffers of a freshly opened bin can hold
    pub initial_capacity: usize,
    pub device: DevicePreference,
    pub kernel: KernelSource,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1000,
            device: DevicePreference::default(),
            kernel: KernelSource::default(),
        }
    }
}
