//! Per-call dispatch: capacity check, upload, launch, download.

// IMPORTANT: this is the streaming hot path. Do not call assert_invariant or any
// PPT logging here; it takes a lock.

use crate::backend::{ComputeBackend, DeviceClass};
use crate::buffers::{BufferManager, KernelBuild};
use crate::error::{ArgError, ArgResult};
use crate::fast_atan::fast_atan2f;
use crate::Sample;
use std::sync::Arc;

/// Batches at or above this size always use the device's default grouping.
///
/// Explicit grouping proved unreliable once batches outgrow the constant-memory
/// kernel variant.
pub const EXPLICIT_GROUP_CUTOFF: usize = 8192;

/// Local work-group size for a batch of `n` items.
///
/// CPU-class devices always get the runtime default (`None`). Other devices get
/// their preferred multiple when `n` is an exact multiple of it and below
/// [`EXPLICIT_GROUP_CUTOFF`].
pub fn select_local_size(n: usize, class: DeviceClass, preferred_multiple: usize) -> Option<usize> {
    if class.is_cpu() || preferred_multiple == 0 {
        return None;
    }
    if n % preferred_multiple == 0 && n < EXPLICIT_GROUP_CUTOFF {
        Some(preferred_multiple)
    } else {
        None
    }
}

/// CPU reference path: `output[i] = atan2(input[i].im, input[i].re)`.
///
/// Returns the number of items written, `min(input.len(), output.len())`.
pub fn compute_cpu(input: &[Sample], output: &mut [f32]) -> usize {
    for (out, sample) in output.iter_mut().zip(input) {
        *out = fast_atan2f(sample.im, sample.re);
    }
    input.len().min(output.len())
}

/// Result of one accelerated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub produced: usize,
    /// Kernel rebuild triggered by growing the buffers, if any.
    pub build: Option<KernelBuild>,
}

impl Dispatch {
    fn idle() -> Self {
        Self {
            produced: 0,
            build: None,
        }
    }
}

/// Runs batches on the compute device through a [`BufferManager`].
pub struct Dispatcher<B: ComputeBackend> {
    backend: Arc<B>,
    buffers: BufferManager<B>,
    class: DeviceClass,
    preferred_multiple: usize,
}

impl<B: ComputeBackend> Dispatcher<B> {
    pub fn new(backend: Arc<B>, debug: bool) -> Self {
        let class = backend.device_class();
        let preferred_multiple = backend.preferred_work_group_multiple();
        let buffers = BufferManager::new(Arc::clone(&backend), debug);
        Self {
            backend,
            buffers,
            class,
            preferred_multiple,
        }
    }

    pub fn buffers(&self) -> &BufferManager<B> {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferManager<B> {
        &mut self.buffers
    }

    pub fn device_class(&self) -> DeviceClass {
        self.class
    }

    pub fn preferred_multiple(&self) -> usize {
        self.preferred_multiple
    }

    /// Local work-group size this dispatcher would use for `n` items.
    pub fn local_size_for(&self, n: usize) -> Option<usize> {
        select_local_size(n, self.class, self.preferred_multiple)
    }

    /// Convert `input` into `output` on the device.
    ///
    /// Produces 0 items when no kernel is compiled yet. Grows the device buffers
    /// to exactly `input.len()` when the batch exceeds the current capacity.
    /// Transfers and the launch are blocking; their errors propagate.
    pub fn compute_accelerated(
        &mut self,
        input: &[Sample],
        output: &mut [f32],
        runtime_hint: usize,
    ) -> ArgResult<Dispatch> {
        let n = input.len();
        if output.len() < n {
            return Err(ArgError::BufferSizeMismatch {
                expected: n,
                actual: output.len(),
            });
        }
        if !self.buffers.has_kernel() || n == 0 {
            return Ok(Dispatch::idle());
        }

        let build = if n > self.buffers.current_buffer_size() {
            self.buffers.resize(n, runtime_hint)?
        } else {
            None
        };
        let local = self.local_size_for(n);

        let backend = &self.backend;
        let (input_buf, output_buf, kernel) = match self.buffers.parts_mut() {
            Some(parts) => parts,
            None => return Ok(Dispatch::idle()),
        };

        backend.enqueue_write(input_buf, bytemuck::cast_slice(input))?;
        backend.set_kernel_arg(kernel, 0, input_buf)?;
        backend.set_kernel_arg(kernel, 1, output_buf)?;
        backend.enqueue_launch(kernel, n, local)?;
        backend.enqueue_read(output_buf, bytemuck::cast_slice_mut(&mut output[..n]))?;

        Ok(Dispatch { produced: n, build })
    }

    /// Release device buffers and kernel.
    pub fn release(&mut self) {
        self.buffers.release();
    }
}
