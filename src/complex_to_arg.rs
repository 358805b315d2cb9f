//! Complex-to-arg block: phase angle of complex samples, on a compute device.
//!
//! Lifecycle: `Uninitialized → Ready` on a successful [`start`](Block::start)
//! (buffers allocated, kernel compiled), `Ready → Stopped` on
//! [`stop`](Block::stop). A stopped block is usable again after another `start`.
//!
//! `work` always reports `consumed == produced`. When no kernel is compiled the
//! block produces nothing and consumes nothing, so no input is dropped while the
//! device is not ready.

use crate::backend::ComputeBackend;
use crate::block::{Block, WorkOutput};
use crate::buffers::KernelBuild;
use crate::config::{effective_hint, BlockConfig, ProcessingPath};
use crate::dispatch::{compute_cpu, Dispatcher};
use crate::error::{ArgError, ArgResult};
use crate::events::{new_event_queue, publish, BlockEvent};
use crate::Sample;
use rtrb::{Consumer, Producer};
use std::sync::Arc;

/// Lifecycle state of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Uninitialized,
    Ready,
    Stopped,
}

/// Streaming block converting [`Sample`]s into angles in radians.
pub struct ComplexToArg<B: ComputeBackend> {
    config: BlockConfig,
    dispatcher: Dispatcher<B>,
    state: BlockState,
    max_output_items: usize,
    events: Option<Producer<BlockEvent>>,
}

impl<B: ComputeBackend> ComplexToArg<B> {
    pub const NAME: &'static str = "complex_to_arg";

    /// Create the block; device resources are acquired by `start`.
    pub fn new(backend: Arc<B>, config: BlockConfig) -> Self {
        let dispatcher = Dispatcher::new(backend, config.debug);
        let max_output_items = config.max_output_items;
        Self {
            config,
            dispatcher,
            state: BlockState::Uninitialized,
            max_output_items,
            events: None,
        }
    }

    /// Create the block together with the consumer end of its event queue.
    pub fn with_events(backend: Arc<B>, config: BlockConfig) -> (Self, Consumer<BlockEvent>) {
        let (tx, rx) = new_event_queue();
        let mut block = Self::new(backend, config);
        block.events = Some(tx);
        (block, rx)
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Current max-output-items hint, lowered by capacity limits.
    pub fn max_output_items(&self) -> usize {
        self.max_output_items
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    /// Items currently provisioned on the device.
    pub fn current_buffer_size(&self) -> usize {
        self.dispatcher.buffers().current_buffer_size()
    }

    /// Reallocate device buffers to exactly `new_capacity` items.
    ///
    /// Only a started block can be resized; call [`start`](Block::start) first.
    pub fn resize(&mut self, new_capacity: usize) -> ArgResult<()> {
        if self.state != BlockState::Ready {
            return Err(ArgError::NotReady(Self::NAME));
        }
        let result = self
            .dispatcher
            .buffers_mut()
            .resize(new_capacity, self.max_output_items);
        match result {
            Ok(Some(build)) => {
                self.apply_build(build);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Host reference path; no device interaction.
    pub fn compute_cpu(&self, input: &[Sample], output: &mut [f32]) -> usize {
        compute_cpu(input, output)
    }

    /// Device path; produces 0 items while no kernel is compiled.
    pub fn compute_accelerated(&mut self, input: &[Sample], output: &mut [f32]) -> ArgResult<usize> {
        match self
            .dispatcher
            .compute_accelerated(input, output, self.max_output_items)
        {
            Ok(dispatch) => {
                if let Some(build) = dispatch.build {
                    self.apply_build(build);
                }
                Ok(dispatch.produced)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn apply_build(&mut self, build: KernelBuild) {
        if let Some(tx) = self.events.as_mut() {
            publish(
                tx,
                BlockEvent::KernelRebuilt {
                    items: build.item_count,
                    regime: build.regime,
                },
            );
        }
        if let Some(limit) = build.capacity_limit {
            self.max_output_items = limit;
            if let Some(tx) = self.events.as_mut() {
                publish(tx, BlockEvent::CapacityLimitDiscovered { limit });
            }
        }
    }

    fn fail(&mut self, err: ArgError) -> ArgError {
        if err.is_setup_failure() {
            log::error!("{}: {}", Self::NAME, err);
            self.state = BlockState::Uninitialized;
        }
        err
    }
}

impl<B: ComputeBackend> Block for ComplexToArg<B> {
    type Input = Sample;
    type Output = f32;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn start(&mut self) -> ArgResult<()> {
        if self.state == BlockState::Ready {
            return Ok(());
        }
        let initial = effective_hint(self.max_output_items);
        let result = self
            .dispatcher
            .buffers_mut()
            .initialize(initial, self.max_output_items);
        match result {
            Ok(build) => {
                self.state = BlockState::Ready;
                self.apply_build(build);
                Ok(())
            }
            Err(err) => {
                self.state = BlockState::Uninitialized;
                Err(self.fail(err))
            }
        }
    }

    fn stop(&mut self) -> ArgResult<()> {
        let held = self.dispatcher.buffers().is_allocated() || self.dispatcher.buffers().has_kernel();
        self.dispatcher.release();
        if held {
            if let Some(tx) = self.events.as_mut() {
                publish(tx, BlockEvent::BuffersReleased);
            }
        }
        self.state = BlockState::Stopped;
        Ok(())
    }

    fn forecast(&self, noutput_items: usize) -> usize {
        noutput_items
    }

    fn output_multiple(&self) -> usize {
        if self.dispatcher.device_class().is_cpu() {
            1
        } else {
            self.dispatcher.preferred_multiple().max(1)
        }
    }

    fn work(&mut self, input: &[Sample], output: &mut [f32]) -> ArgResult<WorkOutput> {
        let n = input.len();
        if output.len() < n {
            return Err(ArgError::BufferSizeMismatch {
                expected: n,
                actual: output.len(),
            });
        }
        let output = &mut output[..n];
        let produced = match self.config.path {
            ProcessingPath::Cpu => self.compute_cpu(input, output),
            ProcessingPath::Accelerated => self.compute_accelerated(input, output)?,
        };
        Ok(WorkOutput {
            produced,
            consumed: produced,
        })
    }
}

impl<B: ComputeBackend> Drop for ComplexToArg<B> {
    fn drop(&mut self) {
        if self.current_buffer_size() > 0 {
            let _ = self.stop();
        }
    }
}
