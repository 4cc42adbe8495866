use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, anyhow, ensure};
use itertools::Itertools;
use log::{debug, info, trace, warn};

use crate::device::{
    BufferAccess, BufferKey, ComputeDevice, ComputePlatform, GpuConfig, KernelArg, KernelKey,
    NO_FIT, SCORES_PER_SPACE,
};
use crate::entities::{Bin, BinTemplate, Item, Packing, SpaceDelta};
use crate::geometry::{Orientation, SPACE_RECORD_LEN};
use crate::solvers::{Candidate, SpaceSearch, Solver, pack};

/// Best-fit solver which offloads the scoring of all (free space, orientation) pairs to a [`ComputeDevice`].
///
/// Every open bin has its free spaces mirrored in a device buffer, kept in sync incrementally after each placement.
/// Produces the same packings as [`crate::solvers::BestFit3D`].
///
/// Concurrent solves are serialized on the device.
/// Buffers only live for the duration of a solve; the kernel lives until [`Solver::release`].
pub struct GpuBestFit {
    state: Mutex<DeviceState>,
    initial_capacity: usize,
}

struct DeviceState {
    device: Box<dyn ComputeDevice>,
    /// `None` once released
    kernel: Option<KernelKey>,
    live_buffers: Vec<BufferKey>,
}

impl GpuBestFit {
    pub fn new(platform: &dyn ComputePlatform, config: &GpuConfig) -> Result<Self> {
        ensure!(
            config.initial_capacity > 0,
            "initial buffer capacity must be at least one space"
        );
        let mut device = platform
            .open_device(&config.device)
            .context("failed to open compute device")?;
        let kernel = device
            .build_kernel(&config.kernel)
            .with_context(|| format!("failed to build kernel {}", config.kernel.entry_point))?;
        info!(
            "[GPU] using device {} ({:?}), kernel {}",
            device.name(),
            device.kind(),
            config.kernel.entry_point
        );
        Ok(Self {
            state: Mutex::new(DeviceState {
                device,
                kernel: Some(kernel),
                live_buffers: vec![],
            }),
            initial_capacity: config.initial_capacity,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("device state poisoned by a panicking solve"))
    }
}

impl Solver for GpuBestFit {
    fn name(&self) -> &str {
        "gpu-best-fit"
    }

    fn solve(&self, items: &[Item], template: &BinTemplate) -> Result<Packing> {
        let mut state = self.lock()?;
        let kernel = state
            .kernel
            .context("solver was released, its kernel is no longer available")?;

        let mut search = DeviceSearch {
            state: &mut *state,
            kernel,
            initial_capacity: self.initial_capacity,
            bins: vec![],
            scores: vec![],
        };
        let result = pack(&mut search, items, template);
        let freed = search.free_buffers();

        let packing = result?;
        freed?;
        debug!(
            "[GPU] packed {} items into {} bins",
            packing.n_placed(),
            packing.n_bins()
        );
        Ok(packing)
    }

    /// Frees all remaining device buffers and the kernel. Calls after the first one are no-ops.
    /// Also frees the resources left behind by a solve that panicked.
    fn release(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(kernel) = state.kernel.take() else {
            return Ok(());
        };
        let DeviceState {
            device,
            live_buffers,
            ..
        } = &mut *state;
        for buffer in live_buffers.drain(..) {
            device.release_buffer(buffer)?;
        }
        device.release_kernel(kernel)?;
        debug!("[GPU] released device resources");
        Ok(())
    }
}

impl Drop for GpuBestFit {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("[GPU] failed to release device resources: {e:#}");
        }
    }
}

/// Device buffers mirroring the free spaces of a single bin
struct BinBuffers {
    spaces: BufferKey,
    scores: BufferKey,
    /// Number of space records the buffers can hold
    capacity: usize,
}

struct DeviceSearch<'a> {
    state: &'a mut DeviceState,
    kernel: KernelKey,
    initial_capacity: usize,
    /// Indexed by bin index
    bins: Vec<BinBuffers>,
    scores: Vec<f32>,
}

impl DeviceSearch<'_> {
    fn allocate(&mut self, capacity: usize) -> Result<BinBuffers> {
        let device = &mut self.state.device;
        let spaces = device.create_buffer(BufferAccess::ReadOnly, capacity * SPACE_RECORD_LEN)?;
        self.state.live_buffers.push(spaces);
        let scores = match device.create_buffer(BufferAccess::WriteOnly, capacity * SCORES_PER_SPACE) {
            Ok(scores) => scores,
            Err(e) => {
                self.release(spaces)?;
                return Err(e);
            }
        };
        self.state.live_buffers.push(scores);
        Ok(BinBuffers {
            spaces,
            scores,
            capacity,
        })
    }

    fn release(&mut self, buffer: BufferKey) -> Result<()> {
        self.state.live_buffers.retain(|b| *b != buffer);
        self.state.device.release_buffer(buffer)
    }

    /// Grows the buffers of `bin` if its free spaces no longer fit. Returns true if they were reallocated.
    fn ensure_capacity(&mut self, bin: &Bin) -> Result<bool> {
        let needed = bin.free_spaces().len();
        let current = self.bins[bin.index].capacity;
        if needed <= current {
            return Ok(false);
        }
        let capacity = usize::max(current * 2, needed);
        trace!(
            "[GPU] bin {}: growing buffers from {current} to {capacity} spaces",
            bin.index
        );
        let grown = self.allocate(capacity)?;
        let old = std::mem::replace(&mut self.bins[bin.index], grown);
        self.release(old.spaces)?;
        self.release(old.scores)?;
        Ok(true)
    }

    /// Uploads all free spaces of `bin`
    fn full_rewrite(&mut self, bin: &Bin) -> Result<()> {
        let records = bin
            .free_spaces()
            .iter()
            .flat_map(|s| s.to_record(bin.index))
            .collect_vec();
        trace!(
            "[GPU] bin {}: full rewrite of {} spaces",
            bin.index,
            bin.free_spaces().len()
        );
        let buffer = self.bins[bin.index].spaces;
        self.state.device.write_buffer(buffer, 0, &records)
    }

    fn write_space(&mut self, bin: &Bin, idx: usize) -> Result<()> {
        let record = bin.free_spaces()[idx].to_record(bin.index);
        let buffer = self.bins[bin.index].spaces;
        self.state
            .device
            .write_buffer(buffer, idx * SPACE_RECORD_LEN, &record)
    }

    /// Runs the kernel over all free spaces of `bin` and returns the best (space, orientation, waste) found
    fn score_bin(&mut self, bin: &Bin, item: &Item) -> Result<Option<(usize, Orientation, f32)>> {
        let n_spaces = bin.free_spaces().len();
        if n_spaces == 0 {
            return Ok(None);
        }
        let buffers = &self.bins[bin.index];
        let (spaces, scores) = (buffers.spaces, buffers.scores);
        let device = &mut self.state.device;
        let kernel = self.kernel;

        device.set_kernel_arg(kernel, 0, KernelArg::Float(item.size.x))?;
        device.set_kernel_arg(kernel, 1, KernelArg::Float(item.size.y))?;
        device.set_kernel_arg(kernel, 2, KernelArg::Float(item.size.z))?;
        device.set_kernel_arg(kernel, 3, KernelArg::Buffer(spaces))?;
        device.set_kernel_arg(kernel, 4, KernelArg::Buffer(scores))?;
        device.dispatch(kernel, n_spaces)?;

        self.scores.resize(n_spaces * SCORES_PER_SPACE, NO_FIT);
        device.read_buffer(scores, 0, &mut self.scores)?;

        let mut best: Option<(usize, Orientation, f32)> = None;
        for (s_idx, chunk) in self.scores.chunks_exact(SCORES_PER_SPACE).enumerate() {
            for (o, &score) in Orientation::ALL.iter().zip(chunk) {
                // negative scores are NO_FIT, exact fits score zero
                if score < 0.0 {
                    continue;
                }
                if best.is_none_or(|(_, _, b)| score < b) {
                    best = Some((s_idx, *o, score));
                }
            }
        }
        Ok(best)
    }

    /// Releases the buffers of every bin opened during this solve
    fn free_buffers(mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.bins);
        for b in buffers {
            self.release(b.spaces)?;
            self.release(b.scores)?;
        }
        Ok(())
    }
}

impl SpaceSearch for DeviceSearch<'_> {
    fn tag(&self) -> &str {
        "GPU"
    }

    fn search(&mut self, bins: &[Bin], item: &Item) -> Result<Option<Candidate>> {
        let mut best: Option<Candidate> = None;
        for bin in bins {
            let scored = self
                .score_bin(bin, item)
                .with_context(|| format!("failed to score free spaces of bin {}", bin.index))?;
            if let Some((space, orientation, waste)) = scored {
                if best.is_none_or(|b| waste < b.waste) {
                    best = Some(Candidate {
                        bin: bin.index,
                        space,
                        orientation,
                        waste,
                    });
                }
            }
        }
        Ok(best)
    }

    fn bin_opened(&mut self, bin: &Bin) -> Result<()> {
        debug_assert!(bin.index == self.bins.len());
        let buffers = self
            .allocate(usize::max(self.initial_capacity, bin.free_spaces().len()))
            .with_context(|| format!("failed to allocate device buffers for bin {}", bin.index))?;
        self.bins.push(buffers);
        self.full_rewrite(bin)
            .with_context(|| format!("failed to upload free spaces of bin {}", bin.index))
    }

    fn spaces_changed(&mut self, bin: &Bin, delta: &SpaceDelta) -> Result<()> {
        if self.ensure_capacity(bin)? {
            return self.full_rewrite(bin)
                .with_context(|| format!("failed to upload free spaces of bin {}", bin.index));
        }
        if delta.moved.is_some() {
            self.write_space(bin, delta.vacated)?;
        }
        for idx in delta.appended.clone() {
            self.write_space(bin, idx)?;
        }
        Ok(())
    }

    fn spaces_rebuilt(&mut self, bin: &Bin) -> Result<()> {
        self.ensure_capacity(bin)?;
        self.full_rewrite(bin)
            .with_context(|| format!("failed to upload free spaces of bin {}", bin.index))
    }
}
