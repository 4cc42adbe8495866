use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow, bail, ensure};
use log::trace;
use slotmap::SlotMap;

use crate::device::{
    BESTFIT_KERNEL, BufferAccess, BufferKey, ComputeDevice, ComputePlatform, DeviceKind,
    DevicePreference, KernelArg, KernelKey, KernelSource, NO_FIT, SCORES_PER_SPACE,
};
use crate::geometry::{Orientation, SPACE_RECORD_LEN, Space, Vec3};

const HOST_DEVICE_NAME: &str = "host";
const N_KERNEL_ARGS: usize = 5;

/// Platform exposing a single in-process device, which runs the best-fit kernel on the calling thread.
///
/// Useful wherever no device drivers are available, and to observe the host side of the protocol:
/// all devices opened from one platform report to the same [`DeviceUsage`].
#[derive(Debug, Default)]
pub struct HostPlatform {
    usage: Arc<DeviceUsage>,
    /// Maximum number of floats allocated at any time, emulates device memory exhaustion
    memory_limit: Option<usize>,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_limit(memory_limit: usize) -> Self {
        Self {
            memory_limit: Some(memory_limit),
            ..Self::default()
        }
    }

    pub fn usage(&self) -> Arc<DeviceUsage> {
        self.usage.clone()
    }
}

impl ComputePlatform for HostPlatform {
    fn open_device(&self, preference: &DevicePreference) -> Result<Box<dyn ComputeDevice>> {
        ensure!(
            preference.matches(HOST_DEVICE_NAME, DeviceKind::Cpu),
            "no device matching {preference:?} (available: {HOST_DEVICE_NAME} [cpu])"
        );
        Ok(Box::new(HostDevice {
            buffers: SlotMap::with_key(),
            kernels: SlotMap::with_key(),
            usage: self.usage.clone(),
            memory_limit: self.memory_limit,
        }))
    }
}

/// Counters shared by all devices of a [`HostPlatform`]
#[derive(Debug, Default)]
pub struct DeviceUsage {
    live_buffers: AtomicUsize,
    live_kernels: AtomicUsize,
    allocated_floats: AtomicUsize,
    n_allocations: AtomicUsize,
    n_writes: AtomicUsize,
    n_dispatches: AtomicUsize,
}

impl DeviceUsage {
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    pub fn live_kernels(&self) -> usize {
        self.live_kernels.load(Ordering::SeqCst)
    }

    pub fn n_allocations(&self) -> usize {
        self.n_allocations.load(Ordering::SeqCst)
    }

    pub fn n_writes(&self) -> usize {
        self.n_writes.load(Ordering::SeqCst)
    }

    pub fn n_dispatches(&self) -> usize {
        self.n_dispatches.load(Ordering::SeqCst)
    }
}

struct HostBuffer {
    access: BufferAccess,
    data: Vec<f32>,
}

struct HostKernel {
    args: [Option<KernelArg>; N_KERNEL_ARGS],
}

pub struct HostDevice {
    buffers: SlotMap<BufferKey, HostBuffer>,
    kernels: SlotMap<KernelKey, HostKernel>,
    usage: Arc<DeviceUsage>,
    memory_limit: Option<usize>,
}

impl HostDevice {
    fn buffer(&self, key: BufferKey) -> Result<&HostBuffer> {
        self.buffers
            .get(key)
            .ok_or_else(|| anyhow!("unknown or released buffer {key:?}"))
    }

    fn float_arg(args: &[Option<KernelArg>], index: usize) -> Result<f32> {
        match args[index] {
            Some(KernelArg::Float(v)) => Ok(v),
            other => bail!("kernel argument {index} must be a float, got {other:?}"),
        }
    }

    fn buffer_arg(args: &[Option<KernelArg>], index: usize) -> Result<BufferKey> {
        match args[index] {
            Some(KernelArg::Buffer(b)) => Ok(b),
            other => bail!("kernel argument {index} must be a buffer, got {other:?}"),
        }
    }

    /// Scores every orientation of the box against every space record: the volume left unused if it fits, [`NO_FIT`] otherwise
    fn run_bestfit(&mut self, args: &[Option<KernelArg>], n_spaces: usize) -> Result<()> {
        let size = Vec3::new(
            Self::float_arg(args, 0)?,
            Self::float_arg(args, 1)?,
            Self::float_arg(args, 2)?,
        );
        let (input, output) = (Self::buffer_arg(args, 3)?, Self::buffer_arg(args, 4)?);

        let records = &self.buffer(input)?.data;
        ensure!(
            records.len() >= n_spaces * SPACE_RECORD_LEN,
            "input buffer holds {} floats, {} spaces requested",
            records.len(),
            n_spaces
        );
        let scores = records
            .chunks_exact(SPACE_RECORD_LEN)
            .take(n_spaces)
            .flat_map(|r| {
                let space = Space {
                    x: r[0],
                    y: r[1],
                    z: r[2],
                    w: r[3],
                    h: r[4],
                    d: r[5],
                };
                Orientation::ALL.map(|o| {
                    let oriented = o.apply(size);
                    match space.fits(oriented) {
                        true => space.waste(oriented),
                        false => NO_FIT,
                    }
                })
            })
            .collect::<Vec<f32>>();

        let out = self
            .buffers
            .get_mut(output)
            .ok_or_else(|| anyhow!("unknown or released buffer {output:?}"))?;
        ensure!(
            out.access != BufferAccess::ReadOnly,
            "kernel output buffer is read-only"
        );
        ensure!(
            out.data.len() >= n_spaces * SCORES_PER_SPACE,
            "output buffer holds {} floats, {} scores requested",
            out.data.len(),
            n_spaces * SCORES_PER_SPACE
        );
        out.data[..scores.len()].copy_from_slice(&scores);
        Ok(())
    }
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> &str {
        HOST_DEVICE_NAME
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn build_kernel(&mut self, source: &KernelSource) -> Result<KernelKey> {
        ensure!(
            source.entry_point == BESTFIT_KERNEL,
            "unknown kernel entry point: {} (the host device only provides {BESTFIT_KERNEL})",
            source.entry_point
        );
        self.usage.live_kernels.fetch_add(1, Ordering::SeqCst);
        Ok(self.kernels.insert(HostKernel {
            args: [None; N_KERNEL_ARGS],
        }))
    }

    fn create_buffer(&mut self, access: BufferAccess, len: usize) -> Result<BufferKey> {
        let allocated = self.usage.allocated_floats.load(Ordering::SeqCst);
        if let Some(limit) = self.memory_limit {
            ensure!(
                allocated + len <= limit,
                "out of device memory: {allocated} of {limit} floats in use, {len} requested"
            );
        }
        self.usage.allocated_floats.fetch_add(len, Ordering::SeqCst);
        self.usage.live_buffers.fetch_add(1, Ordering::SeqCst);
        self.usage.n_allocations.fetch_add(1, Ordering::SeqCst);
        trace!("[HOST] allocated buffer of {len} floats ({access:?})");
        Ok(self.buffers.insert(HostBuffer {
            access,
            data: vec![0.0; len],
        }))
    }

    fn write_buffer(&mut self, buffer: BufferKey, offset: usize, data: &[f32]) -> Result<()> {
        let buf = self
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| anyhow!("unknown or released buffer {buffer:?}"))?;
        let target = buf
            .data
            .get_mut(offset..offset + data.len())
            .with_context(|| format!("write of {} floats at {offset} out of bounds", data.len()))?;
        target.copy_from_slice(data);
        self.usage.n_writes.fetch_add(1, Ordering::SeqCst);
        trace!("[HOST] wrote {} floats at {offset}", data.len());
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferKey, offset: usize, out: &mut [f32]) -> Result<()> {
        let buf = self.buffer(buffer)?;
        let source = buf
            .data
            .get(offset..offset + out.len())
            .with_context(|| format!("read of {} floats at {offset} out of bounds", out.len()))?;
        out.copy_from_slice(source);
        Ok(())
    }

    fn set_kernel_arg(&mut self, kernel: KernelKey, index: usize, arg: KernelArg) -> Result<()> {
        ensure!(index < N_KERNEL_ARGS, "kernel argument index {index} out of range");
        let k = self
            .kernels
            .get_mut(kernel)
            .ok_or_else(|| anyhow!("unknown or released kernel {kernel:?}"))?;
        k.args[index] = Some(arg);
        Ok(())
    }

    fn dispatch(&mut self, kernel: KernelKey, global_work_size: usize) -> Result<()> {
        let args = self
            .kernels
            .get(kernel)
            .ok_or_else(|| anyhow!("unknown or released kernel {kernel:?}"))?
            .args;
        self.usage.n_dispatches.fetch_add(1, Ordering::SeqCst);
        self.run_bestfit(&args, global_work_size)
            .context("bestfit kernel failed")
    }

    fn release_buffer(&mut self, buffer: BufferKey) -> Result<()> {
        let buf = self
            .buffers
            .remove(buffer)
            .ok_or_else(|| anyhow!("buffer {buffer:?} released twice"))?;
        self.usage
            .allocated_floats
            .fetch_sub(buf.data.len(), Ordering::SeqCst);
        self.usage.live_buffers.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_kernel(&mut self, kernel: KernelKey) -> Result<()> {
        self.kernels
            .remove(kernel)
            .ok_or_else(|| anyhow!("kernel {kernel:?} released twice"))?;
        self.usage.live_kernels.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
