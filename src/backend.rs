//! Compute backend trait consumed by the buffer manager and dispatcher.
//!
//! The block never reaches into a platform, context or queue directly. Everything
//! it needs from the device goes through [`ComputeBackend`], which is injected at
//! construction as an `Arc<B>` and shared by [`BufferManager`](crate::buffers::BufferManager)
//! and [`Dispatcher`](crate::dispatch::Dispatcher).
//!
//! Buffer and kernel handles own their device resources: dropping a handle
//! releases it.

use crate::error::ArgResult;

/// Coarse device class; work-group heuristics depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Host CPU exposed as a compute device.
    Cpu,
    /// Discrete or integrated GPU.
    Gpu,
    /// Other accelerator (FPGA, DSP, ...).
    Accelerator,
}

impl DeviceClass {
    /// True for CPU-class devices.
    pub fn is_cpu(self) -> bool {
        matches!(self, DeviceClass::Cpu)
    }
}

/// Access mode of a device buffer, from the kernel's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Kernel only reads (host uploads).
    ReadOnly,
    /// Kernel reads and writes (host downloads).
    ReadWrite,
}

/// Device operations the block depends on.
///
/// Every enqueue is blocking: the call returns once the device has finished.
pub trait ComputeBackend: Send + Sync {
    /// Owning handle to a device allocation.
    type Buffer: Send;
    /// Owning handle to a compiled kernel entry point.
    type Kernel: Send;

    /// Class of the selected device.
    fn device_class(&self) -> DeviceClass;

    /// Preferred work-group-size multiple reported by the device.
    fn preferred_work_group_multiple(&self) -> usize;

    /// Constant-memory budget in bytes.
    fn max_constant_buffer_size(&self) -> u64;

    /// Allocate `bytes` of device memory.
    fn allocate(&self, mode: AccessMode, bytes: usize) -> ArgResult<Self::Buffer>;

    /// Compile `source` and return the kernel named `entry`.
    fn compile_kernel(&self, source: &str, entry: &str) -> ArgResult<Self::Kernel>;

    /// Bind `buffer` as argument `index` of `kernel`.
    fn set_kernel_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> ArgResult<()>;

    /// Copy `data` into the start of `buffer`.
    fn enqueue_write(&self, buffer: &mut Self::Buffer, data: &[u8]) -> ArgResult<()>;

    /// Copy `out.len()` bytes from the start of `buffer` into `out`.
    fn enqueue_read(&self, buffer: &Self::Buffer, out: &mut [u8]) -> ArgResult<()>;

    /// Run `kernel` over `global` work-items; `None` leaves grouping to the device.
    fn enqueue_launch(
        &self,
        kernel: &Self::Kernel,
        global: usize,
        local: Option<usize>,
    ) -> ArgResult<()>;
}
