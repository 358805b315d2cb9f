//! Streaming complex-to-arg block with a device-accelerated dispatch path.
//!
//! [`ComplexToArg`] converts complex samples into their phase angle in radians,
//! either on the host or through a [`ComputeBackend`] (OpenCL with the `opencl`
//! feature, or the in-process [`SimulatedDevice`]). [`Runtime`] drives a block
//! the way a streaming scheduler would.

pub mod backend;
pub mod block;
pub mod buffers;
pub mod complex_to_arg;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fast_atan;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod iq_wav;
pub mod kernel;
#[cfg(feature = "opencl")]
pub mod opencl;
pub mod rt;
pub mod sim;

/// Complex input sample: interleaved `f32` real and imaginary parts.
pub type Sample = num_complex::Complex32;

pub use backend::{AccessMode, ComputeBackend, DeviceClass};
pub use block::{Block, WorkOutput};
pub use buffers::{BufferManager, KernelBuild};
pub use complex_to_arg::{BlockState, ComplexToArg};
pub use config::{BlockConfig, DeviceSelector, PlatformType, ProcessingPath};
pub use dispatch::{compute_cpu, select_local_size, Dispatch, Dispatcher};
pub use error::{ArgError, ArgResult};
pub use events::BlockEvent;
pub use kernel::MemoryRegime;
#[cfg(feature = "opencl")]
pub use opencl::OpenClBackend;
pub use rt::Runtime;
pub use sim::SimulatedDevice;
