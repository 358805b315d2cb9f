//! OpenCL compute backend.
//!
//! Only available with the `opencl` feature:
//! ```bash
//! cargo build --features opencl
//! ```
//!
//! Device selection follows the block's construction parameters: a platform
//! type filter, then either the first matching device or the device at
//! (`platform_id`, `device_id`). Buffers are untyped byte buffers; the kernel's
//! struct view of the input is `#[repr(C)]`-compatible with [`Sample`](crate::Sample).

use crate::backend::{AccessMode, ComputeBackend, DeviceClass};
use crate::config::{BlockConfig, DeviceSelector, PlatformType};
use crate::error::{ArgError, ArgResult};

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU,
};
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, ClMem, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE};
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{cl_device_type, CL_BLOCKING};

use std::ptr;

/// Tiny kernel compiled once to query the preferred work-group multiple.
const PROBE_KERNEL_SOURCE: &str =
    "__kernel void probe(__global float * restrict c) { c[get_global_id(0)] = 0.0f; }\n";

/// Device byte buffer.
pub struct ClBuffer {
    inner: Buffer<u8>,
}

/// Compiled kernel entry point.
pub struct ClKernel {
    inner: Kernel,
}

// SAFETY: OpenCL 1.2+ guarantees thread safety for memory objects and kernels;
// the opencl3 wrappers only hold opaque runtime handles. Kernel argument setting
// is the one non-thread-safe call and it takes `&mut ClKernel`.
unsafe impl Send for ClBuffer {}
unsafe impl Send for ClKernel {}

/// OpenCL device, context and in-order command queue.
pub struct OpenClBackend {
    device: Device,
    context: Context,
    queue: CommandQueue,
    device_name: String,
    class: DeviceClass,
    preferred_multiple: usize,
    constant_budget: u64,
}

// SAFETY: see above; context and command queue are thread-safe in OpenCL 1.2+.
unsafe impl Send for OpenClBackend {}
unsafe impl Sync for OpenClBackend {}

impl std::fmt::Debug for OpenClBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClBackend")
            .field("device_name", &self.device_name)
            .field("class", &self.class)
            .field("preferred_multiple", &self.preferred_multiple)
            .field("constant_budget", &self.constant_budget)
            .finish_non_exhaustive()
    }
}

fn device_type_filter(platform_type: PlatformType) -> cl_device_type {
    match platform_type {
        PlatformType::Any => CL_DEVICE_TYPE_ALL,
        PlatformType::Gpu => CL_DEVICE_TYPE_GPU,
        PlatformType::Cpu => CL_DEVICE_TYPE_CPU,
        PlatformType::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
    }
}

fn select_device(config: &BlockConfig) -> ArgResult<Device> {
    let filter = device_type_filter(config.platform_type);
    let platforms = get_platforms().map_err(|e| ArgError::DeviceNotFound(e.to_string()))?;

    let id = match config.device_selector {
        DeviceSelector::Specific => {
            let platform = platforms.get(config.platform_id as usize).ok_or_else(|| {
                ArgError::DeviceNotFound(format!("no platform {}", config.platform_id))
            })?;
            let ids = platform
                .get_devices(filter)
                .map_err(|e| ArgError::DeviceNotFound(e.to_string()))?;
            ids.get(config.device_id as usize).copied().ok_or_else(|| {
                ArgError::DeviceNotFound(format!(
                    "no device {} on platform {}",
                    config.device_id, config.platform_id
                ))
            })?
        }
        DeviceSelector::Any => platforms
            .iter()
            .find_map(|p| p.get_devices(filter).ok().and_then(|ids| ids.first().copied()))
            .ok_or_else(|| {
                ArgError::DeviceNotFound(format!("no {:?} device on any platform", config.platform_type))
            })?,
    };
    Ok(Device::new(id))
}

impl OpenClBackend {
    /// Open the device named by `config`.
    pub fn new(config: &BlockConfig) -> ArgResult<Self> {
        let device = select_device(config)?;
        let device_name = device.name().unwrap_or_default().trim().to_string();
        let dev_type: cl_device_type = device.dev_type().unwrap_or(0);
        let class = if dev_type & CL_DEVICE_TYPE_CPU != 0 {
            DeviceClass::Cpu
        } else if dev_type & CL_DEVICE_TYPE_GPU != 0 {
            DeviceClass::Gpu
        } else {
            DeviceClass::Accelerator
        };
        let constant_budget = device
            .max_constant_buffer_size()
            .map_err(|e| ArgError::DeviceNotFound(e.to_string()))?;

        let context =
            Context::from_device(&device).map_err(|e| ArgError::DeviceNotFound(e.to_string()))?;
        // OpenCL 1.2 queue creation; some platforms lack the 2.0 entry point.
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| ArgError::DeviceNotFound(e.to_string()))?;

        let preferred_multiple = Program::create_and_build_from_source(&context, PROBE_KERNEL_SOURCE, "")
            .ok()
            .and_then(|program| Kernel::create(&program, "probe").ok())
            .and_then(|kernel| kernel.get_work_group_size_multiple(device.id()).ok())
            .unwrap_or(1)
            .max(1);

        if config.debug {
            log::info!(
                "OpenCL device '{}' ({:?}): constant memory {} bytes, preferred work-group multiple {}",
                device_name,
                class,
                constant_budget,
                preferred_multiple
            );
        }

        Ok(Self {
            device,
            context,
            queue,
            device_name,
            class,
            preferred_multiple,
            constant_budget,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl ComputeBackend for OpenClBackend {
    type Buffer = ClBuffer;
    type Kernel = ClKernel;

    fn device_class(&self) -> DeviceClass {
        self.class
    }

    fn preferred_work_group_multiple(&self) -> usize {
        self.preferred_multiple
    }

    fn max_constant_buffer_size(&self) -> u64 {
        self.constant_budget
    }

    fn allocate(&self, mode: AccessMode, bytes: usize) -> ArgResult<ClBuffer> {
        let flags = match mode {
            AccessMode::ReadOnly => CL_MEM_READ_ONLY,
            AccessMode::ReadWrite => CL_MEM_READ_WRITE,
        };
        let inner = unsafe {
            Buffer::<u8>::create(&self.context, flags, bytes, ptr::null_mut()).map_err(|e| {
                ArgError::Allocation {
                    bytes,
                    reason: e.to_string(),
                }
            })?
        };
        Ok(ClBuffer { inner })
    }

    fn compile_kernel(&self, source: &str, entry: &str) -> ArgResult<ClKernel> {
        let program = Program::create_and_build_from_source(&self.context, source, "")
            .map_err(ArgError::KernelBuild)?;
        let inner = Kernel::create(&program, entry).map_err(|e| ArgError::KernelBuild(e.to_string()))?;
        Ok(ClKernel { inner })
    }

    fn set_kernel_arg(&self, kernel: &mut ClKernel, index: u32, buffer: &ClBuffer) -> ArgResult<()> {
        unsafe {
            kernel
                .inner
                .set_arg(index, &buffer.inner.get())
                .map_err(|e| ArgError::Launch(e.to_string()))
        }
    }

    fn enqueue_write(&self, buffer: &mut ClBuffer, data: &[u8]) -> ArgResult<()> {
        let event = unsafe {
            self.queue
                .enqueue_write_buffer(&mut buffer.inner, CL_BLOCKING, 0, data, &[])
                .map_err(|e| ArgError::Transfer(e.to_string()))?
        };
        event.wait().map_err(|e| ArgError::Transfer(e.to_string()))
    }

    fn enqueue_read(&self, buffer: &ClBuffer, out: &mut [u8]) -> ArgResult<()> {
        let event = unsafe {
            self.queue
                .enqueue_read_buffer(&buffer.inner, CL_BLOCKING, 0, out, &[])
                .map_err(|e| ArgError::Transfer(e.to_string()))?
        };
        event.wait().map_err(|e| ArgError::Transfer(e.to_string()))
    }

    fn enqueue_launch(&self, kernel: &ClKernel, global: usize, local: Option<usize>) -> ArgResult<()> {
        let global_sizes = [global];
        let local_sizes = [local.unwrap_or(0)];
        let local_ptr = if local.is_some() {
            local_sizes.as_ptr()
        } else {
            ptr::null()
        };
        let event = unsafe {
            self.queue
                .enqueue_nd_range_kernel(
                    kernel.inner.get(),
                    1,
                    ptr::null(),
                    global_sizes.as_ptr(),
                    local_ptr,
                    &[],
                )
                .map_err(|e| ArgError::Launch(e.to_string()))?
        };
        event.wait().map_err(|e| ArgError::Launch(e.to_string()))
    }
}
