//! Error types for the block, its buffer manager and the compute backends.

use thiserror::Error;

/// Result type for block and backend operations.
pub type ArgResult<T> = Result<T, ArgError>;

/// Errors that can occur while setting up or running the block.
///
/// Nothing in this crate retries. Setup-class errors leave the block without a
/// kernel; transfer and launch errors end the current run.
#[derive(Error, Debug)]
pub enum ArgError {
    /// Kernel source failed to compile (build log attached).
    #[error("kernel build failed: {0}")]
    KernelBuild(String),

    /// Device buffer allocation failed.
    #[error("device allocation of {bytes} bytes failed: {reason}")]
    Allocation { bytes: usize, reason: String },

    /// Host/device copy failed.
    #[error("device transfer failed: {0}")]
    Transfer(String),

    /// Kernel launch failed.
    #[error("kernel launch failed: {0}")]
    Launch(String),

    /// A buffer capacity of zero was requested.
    #[error("invalid capacity: {0} items")]
    InvalidCapacity(usize),

    /// The scheduler called a block that neither produced nor consumed.
    #[error("block '{0}' is not ready (no kernel compiled)")]
    NotReady(&'static str),

    /// No OpenCL device matched the construction parameters.
    #[error("compute device not found: {0}")]
    DeviceNotFound(String),

    /// Output slice is shorter than the input slice.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// WAV recording does not hold two-channel IQ data.
    #[error("invalid IQ recording: {0}")]
    InvalidRecording(String),

    /// WAV read/write failure.
    #[error("wav i/o: {0}")]
    Wav(#[from] hound::Error),
}

impl ArgError {
    /// Check if this error leaves the block without a usable kernel.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, ArgError::KernelBuild(_) | ArgError::Allocation { .. })
    }
}
