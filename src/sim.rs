//! Simulated compute device for development and testing.
//!
//! Executes the `complextoarg` kernel on the host while enforcing the OpenCL
//! rules the block relies on: bound arguments, `global % local == 0`, and a
//! `__constant` input that fits the constant-memory budget. Every allocation,
//! compile, transfer and launch is recorded so tests can observe the dispatch
//! decisions, and each device operation can be made to fail on demand.

use crate::backend::{AccessMode, ComputeBackend, DeviceClass};
use crate::error::{ArgError, ArgResult};
use crate::kernel::{regime_of, MemoryRegime};
use std::sync::{Arc, Mutex, MutexGuard};

type Memory = Arc<Mutex<Vec<u8>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// One recorded kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchRecord {
    pub global: usize,
    pub local: Option<usize>,
    pub regime: MemoryRegime,
}

/// Counters and history of device activity.
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    /// Buffers currently allocated.
    pub live_buffers: usize,
    /// Total allocations since creation.
    pub allocations: usize,
    /// Byte size of every allocation, in order.
    pub allocation_sizes: Vec<usize>,
    /// Every successfully compiled kernel source, in order.
    pub compiled: Vec<String>,
    pub launches: Vec<LaunchRecord>,
    pub bytes_written: usize,
    pub bytes_read: usize,
}

impl SimStats {
    /// Regime of the most recent compile.
    pub fn last_regime(&self) -> Option<MemoryRegime> {
        self.compiled.last().and_then(|src| regime_of(src))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    compile: bool,
    allocation: bool,
    transfer: bool,
    launch: bool,
}

/// Device allocation owned by the holder; dropping it frees the simulated memory.
pub struct SimBuffer {
    mode: AccessMode,
    memory: Memory,
    stats: Arc<Mutex<SimStats>>,
}

impl SimBuffer {
    /// Allocation size in bytes.
    pub fn len(&self) -> usize {
        lock(&self.memory).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Drop for SimBuffer {
    fn drop(&mut self) {
        let mut stats = lock(&self.stats);
        stats.live_buffers = stats.live_buffers.saturating_sub(1);
    }
}

/// Compiled simulated kernel with its bound arguments.
pub struct SimKernel {
    regime: MemoryRegime,
    args: [Option<Memory>; 2],
}

impl SimKernel {
    pub fn regime(&self) -> MemoryRegime {
        self.regime
    }
}

/// Software compute device.
pub struct SimulatedDevice {
    class: DeviceClass,
    work_group_multiple: usize,
    constant_budget: u64,
    stats: Arc<Mutex<SimStats>>,
    faults: Mutex<Faults>,
}

impl SimulatedDevice {
    /// A GPU-class device: preferred multiple 64, 64 KiB constant memory.
    pub fn new() -> Self {
        Self {
            class: DeviceClass::Gpu,
            work_group_multiple: 64,
            constant_budget: 64 * 1024,
            stats: Arc::new(Mutex::new(SimStats::default())),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_work_group_multiple(mut self, multiple: usize) -> Self {
        self.work_group_multiple = multiple;
        self
    }

    pub fn with_constant_budget(mut self, bytes: u64) -> Self {
        self.constant_budget = bytes;
        self
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> SimStats {
        lock(&self.stats).clone()
    }

    /// Make every kernel compile fail until cleared.
    pub fn fail_compiles(&self, fail: bool) {
        lock(&self.faults).compile = fail;
    }

    pub fn fail_allocations(&self, fail: bool) {
        lock(&self.faults).allocation = fail;
    }

    pub fn fail_transfers(&self, fail: bool) {
        lock(&self.faults).transfer = fail;
    }

    pub fn fail_launches(&self, fail: bool) {
        lock(&self.faults).launch = fail;
    }

    fn faults(&self) -> Faults {
        *lock(&self.faults)
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for SimulatedDevice {
    type Buffer = SimBuffer;
    type Kernel = SimKernel;

    fn device_class(&self) -> DeviceClass {
        self.class
    }

    fn preferred_work_group_multiple(&self) -> usize {
        self.work_group_multiple
    }

    fn max_constant_buffer_size(&self) -> u64 {
        self.constant_budget
    }

    fn allocate(&self, mode: AccessMode, bytes: usize) -> ArgResult<SimBuffer> {
        if self.faults().allocation {
            return Err(ArgError::Allocation {
                bytes,
                reason: "simulated out of device memory".to_string(),
            });
        }
        if bytes == 0 {
            return Err(ArgError::Allocation {
                bytes,
                reason: "zero-sized buffer".to_string(),
            });
        }
        {
            let mut stats = lock(&self.stats);
            stats.live_buffers += 1;
            stats.allocations += 1;
            stats.allocation_sizes.push(bytes);
        }
        Ok(SimBuffer {
            mode,
            memory: Arc::new(Mutex::new(vec![0u8; bytes])),
            stats: Arc::clone(&self.stats),
        })
    }

    fn compile_kernel(&self, source: &str, entry: &str) -> ArgResult<SimKernel> {
        if self.faults().compile {
            return Err(ArgError::KernelBuild(
                "simulated build failure".to_string(),
            ));
        }
        if !source.contains(&format!("__kernel void {}(", entry)) {
            return Err(ArgError::KernelBuild(format!(
                "no kernel named '{}' in program",
                entry
            )));
        }
        let regime = regime_of(source).ok_or_else(|| {
            ArgError::KernelBuild("unsupported kernel signature".to_string())
        })?;
        lock(&self.stats).compiled.push(source.to_string());
        Ok(SimKernel {
            regime,
            args: [None, None],
        })
    }

    fn set_kernel_arg(&self, kernel: &mut SimKernel, index: u32, buffer: &SimBuffer) -> ArgResult<()> {
        let slot = kernel
            .args
            .get_mut(index as usize)
            .ok_or_else(|| ArgError::Launch(format!("argument index {} out of range", index)))?;
        *slot = Some(Arc::clone(&buffer.memory));
        Ok(())
    }

    fn enqueue_write(&self, buffer: &mut SimBuffer, data: &[u8]) -> ArgResult<()> {
        if self.faults().transfer {
            return Err(ArgError::Transfer("simulated write failure".to_string()));
        }
        let mut memory = lock(&buffer.memory);
        if data.len() > memory.len() {
            return Err(ArgError::Transfer(format!(
                "write of {} bytes overruns {}-byte buffer",
                data.len(),
                memory.len()
            )));
        }
        memory[..data.len()].copy_from_slice(data);
        drop(memory);
        lock(&self.stats).bytes_written += data.len();
        Ok(())
    }

    fn enqueue_read(&self, buffer: &SimBuffer, out: &mut [u8]) -> ArgResult<()> {
        if self.faults().transfer {
            return Err(ArgError::Transfer("simulated read failure".to_string()));
        }
        let memory = lock(&buffer.memory);
        if out.len() > memory.len() {
            return Err(ArgError::Transfer(format!(
                "read of {} bytes overruns {}-byte buffer",
                out.len(),
                memory.len()
            )));
        }
        out.copy_from_slice(&memory[..out.len()]);
        drop(memory);
        lock(&self.stats).bytes_read += out.len();
        Ok(())
    }

    fn enqueue_launch(&self, kernel: &SimKernel, global: usize, local: Option<usize>) -> ArgResult<()> {
        if self.faults().launch {
            return Err(ArgError::Launch("simulated launch failure".to_string()));
        }
        if global == 0 {
            return Err(ArgError::Launch("global work size is zero".to_string()));
        }
        if let Some(local) = local {
            if local == 0 || global % local != 0 {
                return Err(ArgError::Launch(format!(
                    "global size {} is not a multiple of local size {}",
                    global, local
                )));
            }
        }
        let (input, output) = match &kernel.args {
            [Some(input), Some(output)] => (input, output),
            _ => return Err(ArgError::Launch("kernel arguments not bound".to_string())),
        };

        let in_bytes = global * 8;
        if kernel.regime == MemoryRegime::Constant && in_bytes as u64 > self.constant_budget {
            return Err(ArgError::Launch(format!(
                "__constant argument of {} bytes exceeds {}-byte budget",
                in_bytes, self.constant_budget
            )));
        }

        let angles: Vec<f32> = {
            let input = lock(input);
            if input.len() < in_bytes {
                return Err(ArgError::Launch("input buffer smaller than global range".to_string()));
            }
            input[..in_bytes]
                .chunks_exact(8)
                .map(|c| {
                    let real = f32::from_ne_bytes([c[0], c[1], c[2], c[3]]);
                    let imag = f32::from_ne_bytes([c[4], c[5], c[6], c[7]]);
                    imag.atan2(real)
                })
                .collect()
        };

        {
            let mut output = lock(output);
            if output.len() < global * 4 {
                return Err(ArgError::Launch("output buffer smaller than global range".to_string()));
            }
            for (dst, angle) in output.chunks_exact_mut(4).zip(&angles) {
                dst.copy_from_slice(&angle.to_ne_bytes());
            }
        }

        lock(&self.stats).launches.push(LaunchRecord {
            global,
            local,
            regime: kernel.regime,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{kernel_source, ENTRY_POINT};

    fn bound_kernel(dev: &SimulatedDevice, regime: MemoryRegime, items: usize) -> (SimKernel, SimBuffer, SimBuffer) {
        let mut kernel = dev.compile_kernel(&kernel_source(regime), ENTRY_POINT).unwrap();
        let input = dev.allocate(AccessMode::ReadOnly, items * 8).unwrap();
        let output = dev.allocate(AccessMode::ReadWrite, items * 4).unwrap();
        dev.set_kernel_arg(&mut kernel, 0, &input).unwrap();
        dev.set_kernel_arg(&mut kernel, 1, &output).unwrap();
        (kernel, input, output)
    }

    #[test]
    fn dropping_buffers_frees_them() {
        let dev = SimulatedDevice::new();
        let a = dev.allocate(AccessMode::ReadOnly, 16).unwrap();
        let b = dev.allocate(AccessMode::ReadWrite, 8).unwrap();
        assert_eq!(dev.stats().live_buffers, 2);
        drop(a);
        assert_eq!(dev.stats().live_buffers, 1);
        drop(b);
        assert_eq!(dev.stats().live_buffers, 0);
        assert_eq!(dev.stats().allocations, 2);
    }

    #[test]
    fn wrong_entry_point_fails_build() {
        let dev = SimulatedDevice::new();
        let err = dev
            .compile_kernel(&kernel_source(MemoryRegime::Global), "missing")
            .err()
            .unwrap();
        assert!(matches!(err, ArgError::KernelBuild(_)));
    }

    #[test]
    fn launch_rejects_uneven_local_size() {
        let dev = SimulatedDevice::new();
        let (kernel, _i, _o) = bound_kernel(&dev, MemoryRegime::Global, 100);
        let err = dev.enqueue_launch(&kernel, 100, Some(64)).err().unwrap();
        assert!(matches!(err, ArgError::Launch(_)));
    }

    #[test]
    fn constant_input_over_budget_is_rejected() {
        let dev = SimulatedDevice::new().with_constant_budget(64);
        let (kernel, _i, _o) = bound_kernel(&dev, MemoryRegime::Constant, 9);
        assert!(dev.enqueue_launch(&kernel, 8, None).is_ok());
        assert!(dev.enqueue_launch(&kernel, 9, None).is_err());
    }

    #[test]
    fn unbound_kernel_is_rejected() {
        let dev = SimulatedDevice::new();
        let kernel = dev
            .compile_kernel(&kernel_source(MemoryRegime::Global), ENTRY_POINT)
            .unwrap();
        assert!(dev.enqueue_launch(&kernel, 4, None).is_err());
    }

    #[test]
    fn kernel_computes_angles() {
        let dev = SimulatedDevice::new();
        let (kernel, mut input, output) = bound_kernel(&dev, MemoryRegime::Global, 2);
        let mut bytes = Vec::new();
        for v in [0.0f32, 1.0, -1.0, 0.0] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        dev.enqueue_write(&mut input, &bytes).unwrap();
        dev.enqueue_launch(&kernel, 2, None).unwrap();
        let mut out = [0u8; 8];
        dev.enqueue_read(&output, &mut out).unwrap();
        let first = f32::from_ne_bytes([out[0], out[1], out[2], out[3]]);
        let second = f32::from_ne_bytes([out[4], out[5], out[6], out[7]]);
        assert!((first - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((second - std::f32::consts::PI).abs() < 1e-6);
        let stats = dev.stats();
        assert_eq!(stats.bytes_written, 16);
        assert_eq!(stats.bytes_read, 8);
        assert_eq!(stats.launches.len(), 1);
    }

    #[test]
    fn injected_faults_surface_as_errors() {
        let dev = SimulatedDevice::new();
        dev.fail_allocations(true);
        assert!(dev.allocate(AccessMode::ReadOnly, 8).is_err());
        dev.fail_allocations(false);
        let mut buf = dev.allocate(AccessMode::ReadOnly, 8).unwrap();
        dev.fail_transfers(true);
        assert!(matches!(
            dev.enqueue_write(&mut buf, &[0u8; 8]),
            Err(ArgError::Transfer(_))
        ));
    }
}
