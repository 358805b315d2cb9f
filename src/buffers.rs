//! Device buffer lifecycle: sizing, reallocation and kernel (re)build.
//!
//! [`BufferManager`] owns the input (complex) and output (angle) device buffers
//! and the kernel compiled for them. Capacity only changes through
//! [`BufferManager::resize`], which reallocates to exactly the requested size and
//! rebuilds the kernel, since the input's address space depends on whether the
//! batch still fits the constant-memory budget.

use crate::backend::{AccessMode, ComputeBackend};
use crate::error::{ArgError, ArgResult};
use crate::invariant_ppt::{
    assert_invariant, BUFFERS_RELEASED, CAPACITY_PROVISIONED, CLAMP_REPORTED, KERNEL_READY,
    REGIME_MATCHES_BUDGET, RESIZE_EXACT,
};
use crate::kernel::{kernel_source, max_const_items, MemoryRegime, ENTRY_POINT};
use crate::Sample;
use std::mem::size_of;
use std::sync::Arc;

macro_rules! note {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            log::info!($($arg)+)
        } else {
            log::debug!($($arg)+)
        }
    };
}

/// Outcome of a kernel build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelBuild {
    /// Item count the kernel was built for.
    pub item_count: usize,
    pub regime: MemoryRegime,
    pub max_const_items: usize,
    /// Batch limit the host runtime should adopt, when the constant-memory budget
    /// is below its current hint (or the hint is unset).
    pub capacity_limit: Option<usize>,
}

/// Owner of the device buffers and the kernel bound to their sizing regime.
pub struct BufferManager<B: ComputeBackend> {
    backend: Arc<B>,
    input: Option<B::Buffer>,
    output: Option<B::Buffer>,
    kernel: Option<B::Kernel>,
    regime: Option<MemoryRegime>,
    current_buffer_size: usize,
    max_const_items: usize,
    debug: bool,
}

impl<B: ComputeBackend> BufferManager<B> {
    /// Create an empty manager; nothing is allocated until [`initialize`](Self::initialize).
    pub fn new(backend: Arc<B>, debug: bool) -> Self {
        let max_const_items = max_const_items(backend.max_constant_buffer_size());
        Self {
            backend,
            input: None,
            output: None,
            kernel: None,
            regime: None,
            current_buffer_size: 0,
            max_const_items,
            debug,
        }
    }

    /// Allocate both buffers for `initial_capacity` items and build the kernel.
    pub fn initialize(&mut self, initial_capacity: usize, runtime_hint: usize) -> ArgResult<KernelBuild> {
        if initial_capacity == 0 {
            return Err(ArgError::InvalidCapacity(initial_capacity));
        }
        self.provision(initial_capacity, runtime_hint)
    }

    /// Reallocate to exactly `new_capacity` items and rebuild the kernel.
    ///
    /// Returns `Ok(None)` when the capacity is unchanged. Buffer contents are not
    /// carried over.
    pub fn resize(&mut self, new_capacity: usize, runtime_hint: usize) -> ArgResult<Option<KernelBuild>> {
        if new_capacity == 0 {
            return Err(ArgError::InvalidCapacity(new_capacity));
        }
        if new_capacity == self.current_buffer_size {
            return Ok(None);
        }
        note!(
            self.debug,
            "ComplexToArg resizing device buffers {} -> {} items",
            self.current_buffer_size,
            new_capacity
        );
        let build = self.provision(new_capacity, runtime_hint)?;
        assert_invariant(
            RESIZE_EXACT,
            self.current_buffer_size == new_capacity,
            "resize must provision exactly the requested capacity",
            Some("resize"),
        );
        Ok(Some(build))
    }

    fn provision(&mut self, items: usize, runtime_hint: usize) -> ArgResult<KernelBuild> {
        // Old buffers go first; no partially resized state survives an error.
        self.release();
        match self.allocate_and_build(items, runtime_hint) {
            Ok(build) => {
                self.current_buffer_size = items;
                assert_invariant(
                    CAPACITY_PROVISIONED,
                    self.input.is_some() && self.output.is_some() && self.kernel.is_some(),
                    "buffers and kernel present after provisioning",
                    Some("provision"),
                );
                Ok(build)
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    fn allocate_and_build(&mut self, items: usize, runtime_hint: usize) -> ArgResult<KernelBuild> {
        let overflow = |bytes| ArgError::Allocation {
            bytes,
            reason: format!("{} items overflow the address space", items),
        };
        let in_bytes = items
            .checked_mul(size_of::<Sample>())
            .ok_or_else(|| overflow(usize::MAX))?;
        let out_bytes = items
            .checked_mul(size_of::<f32>())
            .ok_or_else(|| overflow(usize::MAX))?;

        self.input = Some(self.backend.allocate(AccessMode::ReadOnly, in_bytes)?);
        self.output = Some(self.backend.allocate(AccessMode::ReadWrite, out_bytes)?);
        self.build_kernel(items, runtime_hint)
    }

    /// Compile the kernel for `item_count` items.
    ///
    /// Uses `__constant` input when the batch fits the constant-memory budget and
    /// `__global` otherwise. The returned [`KernelBuild::capacity_limit`] carries
    /// the batch limit the runtime should adopt. On a compile error the kernel
    /// stays unset.
    pub fn build_kernel(&mut self, item_count: usize, runtime_hint: usize) -> ArgResult<KernelBuild> {
        self.max_const_items = max_const_items(self.backend.max_constant_buffer_size());
        let regime = MemoryRegime::for_items(item_count, self.max_const_items);
        match regime {
            MemoryRegime::Constant => note!(
                self.debug,
                "ComplexToArg building kernel with __constant params for {} items",
                item_count
            ),
            MemoryRegime::Global => note!(
                self.debug,
                "ComplexToArg too many items ({} > {}) for constant memory, building kernel with __global params",
                item_count,
                self.max_const_items
            ),
        }

        let capacity_limit = if self.max_const_items > 0
            && (runtime_hint == 0 || self.max_const_items < runtime_hint)
        {
            note!(
                self.debug,
                "ComplexToArg limiting output batch to {} items for constant memory",
                self.max_const_items
            );
            Some(self.max_const_items)
        } else {
            note!(self.debug, "ComplexToArg keeping output batch hint of {}", runtime_hint);
            None
        };
        assert_invariant(
            CLAMP_REPORTED,
            capacity_limit.map_or(true, |limit| limit == self.max_const_items && limit > 0),
            "capacity limit equals the constant-memory item count",
            Some("build_kernel"),
        );

        self.kernel = None;
        self.regime = None;
        let source = kernel_source(regime);
        let kernel = self.backend.compile_kernel(&source, ENTRY_POINT)?;
        self.kernel = Some(kernel);
        self.regime = Some(regime);

        assert_invariant(
            REGIME_MATCHES_BUDGET,
            (regime == MemoryRegime::Constant) == (item_count <= self.max_const_items),
            "kernel regime matches the constant-memory budget",
            Some("build_kernel"),
        );
        assert_invariant(KERNEL_READY, self.kernel.is_some(), "kernel compiled", None);

        Ok(KernelBuild {
            item_count,
            regime,
            max_const_items: self.max_const_items,
            capacity_limit,
        })
    }

    /// Drop both buffers and the kernel. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.input.is_some() || self.output.is_some() || self.kernel.is_some() {
            log::debug!(
                "ComplexToArg releasing {}-item device buffers",
                self.current_buffer_size
            );
        }
        self.input = None;
        self.output = None;
        self.kernel = None;
        self.regime = None;
        self.current_buffer_size = 0;
        assert_invariant(
            BUFFERS_RELEASED,
            self.input.is_none() && self.output.is_none() && self.kernel.is_none(),
            "release leaves no device resources",
            Some("release"),
        );
    }

    /// Items currently provisioned in both buffers.
    pub fn current_buffer_size(&self) -> usize {
        self.current_buffer_size
    }

    /// Items that fit in the constant-memory budget.
    pub fn max_const_items(&self) -> usize {
        self.max_const_items
    }

    /// Regime of the compiled kernel, if any.
    pub fn regime(&self) -> Option<MemoryRegime> {
        self.regime
    }

    pub fn has_kernel(&self) -> bool {
        self.kernel.is_some()
    }

    pub fn is_allocated(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Input buffer, output buffer and kernel, when all three exist.
    pub(crate) fn parts_mut(&mut self) -> Option<(&mut B::Buffer, &B::Buffer, &mut B::Kernel)> {
        match (&mut self.input, &self.output, &mut self.kernel) {
            (Some(input), Some(output), Some(kernel)) => Some((input, output, kernel)),
            _ => None,
        }
    }
}

impl<B: ComputeBackend> Drop for BufferManager<B> {
    fn drop(&mut self) {
        self.release();
    }
}
