//! Streaming block interface between a scheduler and a processing block.

use crate::error::ArgResult;

/// Items a `work` call produced and consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkOutput {
    pub produced: usize,
    pub consumed: usize,
}

impl WorkOutput {
    /// Neither produced nor consumed anything.
    pub fn is_stalled(&self) -> bool {
        self.produced == 0 && self.consumed == 0
    }
}

/// A streaming block; implement this for your processing blocks.
///
/// The scheduler calls `work` from one thread at a time per block instance.
pub trait Block: Send {
    type Input: Copy + Send + 'static;
    type Output: Copy + Default + Send + 'static;

    fn name(&self) -> &'static str;

    /// Acquire resources. Called before the first `work`.
    fn start(&mut self) -> ArgResult<()>;

    /// Release resources. Must be idempotent.
    fn stop(&mut self) -> ArgResult<()>;

    /// Inputs required to produce `noutput_items` outputs.
    fn forecast(&self, noutput_items: usize) -> usize;

    /// Batch sizes should be a multiple of this.
    fn output_multiple(&self) -> usize {
        1
    }

    /// Process all of `input` into the front of `output`.
    ///
    /// `output` must hold at least `input.len()` items; spare capacity is left untouched.
    fn work(&mut self, input: &[Self::Input], output: &mut [Self::Output]) -> ArgResult<WorkOutput>;
}
