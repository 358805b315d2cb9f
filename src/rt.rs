//! RT module: single-threaded streaming scheduler for one block.
//!
//! Stands in for the host framework's scheduler: it cuts an input stream into
//! batches no larger than the max-output-items hint, honors the block's output
//! multiple and forecast, and applies capacity limits the block publishes.

// IMPORTANT: Do not call assert_invariant or any PPT logging in RT paths to avoid locks/allocs.

use crate::block::{Block, WorkOutput};
use crate::config::effective_hint;
use crate::error::{ArgError, ArgResult};
use crate::events::BlockEvent;
use rtrb::Consumer;

/// The runtime engine.
pub struct Runtime<K: Block> {
    block: K,
    max_output_items: usize,
    events: Option<Consumer<BlockEvent>>,
    scratch: Vec<K::Output>,
    items_produced: u64,
}

impl<K: Block> Runtime<K> {
    /// Create a runtime around `block`; `max_output_items == 0` means unset.
    pub fn new(block: K, max_output_items: usize) -> Self {
        Self {
            block,
            max_output_items,
            events: None,
            scratch: Vec::new(),
            items_produced: 0,
        }
    }

    /// Create a runtime that also drains the block's event queue.
    pub fn with_events(block: K, max_output_items: usize, events: Consumer<BlockEvent>) -> Self {
        let mut runtime = Self::new(block, max_output_items);
        runtime.events = Some(events);
        runtime
    }

    /// Raw hint (0 = unset).
    pub fn max_output_items(&self) -> usize {
        self.max_output_items
    }

    /// Lower (or raise) the batch hint.
    pub fn set_max_output_items(&mut self, items: usize) {
        self.max_output_items = items;
    }

    pub fn block(&self) -> &K {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut K {
        &mut self.block
    }

    pub fn into_block(self) -> K {
        self.block
    }

    pub fn items_produced(&self) -> u64 {
        self.items_produced
    }

    pub fn start(&mut self) -> ArgResult<()> {
        self.block.start()
    }

    pub fn stop(&mut self) -> ArgResult<()> {
        self.block.stop()
    }

    /// Batch length for `remaining` available items.
    pub fn batch_len(&self, remaining: usize) -> usize {
        let mut n = remaining.min(effective_hint(self.max_output_items));
        let multiple = self.block.output_multiple().max(1);
        if n >= multiple {
            n -= n % multiple;
        }
        n
    }

    /// Run one `work` call over all of `input`; `out` must hold at least as many items.
    pub fn process_block(&mut self, input: &[K::Input], out: &mut [K::Output]) -> ArgResult<WorkOutput> {
        if out.len() < input.len() {
            return Err(ArgError::BufferSizeMismatch {
                expected: input.len(),
                actual: out.len(),
            });
        }
        let result = self.block.work(input, out)?;
        self.items_produced += result.produced as u64;
        self.apply_events();
        Ok(result)
    }

    /// Stream all of `input` through the block.
    pub fn run(&mut self, input: &[K::Input]) -> ArgResult<Vec<K::Output>> {
        let mut output = Vec::with_capacity(input.len());
        let mut offset = 0;
        while offset < input.len() {
            let n = self.batch_len(input.len() - offset);
            let required = self.block.forecast(n);
            if required > input.len() - offset {
                break;
            }
            let mut scratch = std::mem::take(&mut self.scratch);
            scratch.resize(n.max(required), K::Output::default());
            let result = self.process_block(&input[offset..offset + required], &mut scratch);
            let result = match result {
                Ok(result) => result,
                Err(err) => {
                    self.scratch = scratch;
                    return Err(err);
                }
            };
            output.extend_from_slice(&scratch[..result.produced]);
            self.scratch = scratch;
            if result.is_stalled() {
                return Err(ArgError::NotReady(self.block.name()));
            }
            offset += result.consumed;
        }
        Ok(output)
    }

    fn apply_events(&mut self) {
        let Some(rx) = self.events.as_mut() else {
            return;
        };
        while let Ok(event) = rx.pop() {
            if let BlockEvent::CapacityLimitDiscovered { limit } = event {
                if limit > 0 {
                    self.max_output_items = limit;
                }
            }
        }
    }
}

/// Stream `input` through a started runtime and collect the output.
pub fn render_offline<K: Block>(runtime: &mut Runtime<K>, input: &[K::Input]) -> ArgResult<Vec<K::Output>> {
    runtime.run(input)
}

/// Run process_block with panic containment.
pub fn process_block_safe<K: Block>(
    runtime: &mut Runtime<K>,
    input: &[K::Input],
    out: &mut [K::Output],
) -> ArgResult<WorkOutput> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        runtime.process_block(input, out)
    }));
    match result {
        Ok(result) => result,
        Err(_) => {
            // Fail closed: silence output
            out.fill(K::Output::default());
            Ok(WorkOutput::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Copies input to output; stalls once `stall_after` items went through.
    struct Passthrough {
        multiple: usize,
        stall_after: usize,
        seen: usize,
        calls: Vec<usize>,
    }

    impl Passthrough {
        fn new(multiple: usize) -> Self {
            Self {
                multiple,
                stall_after: usize::MAX,
                seen: 0,
                calls: Vec::new(),
            }
        }
    }

    impl Block for Passthrough {
        type Input = f32;
        type Output = f32;

        fn name(&self) -> &'static str {
            "passthrough"
        }

        fn start(&mut self) -> ArgResult<()> {
            Ok(())
        }

        fn stop(&mut self) -> ArgResult<()> {
            Ok(())
        }

        fn forecast(&self, noutput_items: usize) -> usize {
            noutput_items
        }

        fn output_multiple(&self) -> usize {
            self.multiple
        }

        fn work(&mut self, input: &[f32], output: &mut [f32]) -> ArgResult<WorkOutput> {
            let n = input.len();
            self.calls.push(n);
            if self.seen >= self.stall_after {
                return Ok(WorkOutput::default());
            }
            output[..n].copy_from_slice(input);
            self.seen += n;
            Ok(WorkOutput {
                produced: n,
                consumed: n,
            })
        }
    }

    #[test]
    fn rt_batches_respect_hint_and_multiple() {
        let mut runtime = Runtime::new(Passthrough::new(64), 200);
        let input: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let output = render_offline(&mut runtime, &input).unwrap();
        assert_eq!(output, input);
        let calls = &runtime.block().calls;
        assert!(calls[..calls.len() - 1].iter().all(|&n| n == 192));
        assert_eq!(calls.iter().sum::<usize>(), 1000);
    }

    #[test]
    fn rt_unset_hint_uses_default() {
        let runtime = Runtime::new(Passthrough::new(1), 0);
        assert_eq!(runtime.batch_len(100_000), 8192);
    }

    #[test]
    fn rt_tail_shorter_than_multiple_is_still_processed() {
        let runtime = Runtime::new(Passthrough::new(64), 0);
        assert_eq!(runtime.batch_len(10), 10);
    }

    #[test]
    fn rt_stall_is_reported() {
        let mut block = Passthrough::new(1);
        block.stall_after = 16;
        let mut runtime = Runtime::new(block, 16);
        let input = vec![1.0; 64];
        assert!(matches!(runtime.run(&input), Err(ArgError::NotReady("passthrough"))));
        assert_eq!(runtime.items_produced(), 16);
    }

    #[test]
    fn rt_capacity_events_lower_hint() {
        let (mut tx, rx) = crate::events::new_event_queue();
        let mut runtime = Runtime::with_events(Passthrough::new(1), 8192, rx);
        crate::events::publish(&mut tx, BlockEvent::CapacityLimitDiscovered { limit: 100 });
        let input = vec![0.5; 300];
        runtime.run(&input).unwrap();
        assert_eq!(runtime.max_output_items(), 100);
        // First call ran before the event was drained.
        assert_eq!(runtime.block().calls, vec![300]);
    }

    #[test]
    fn rt_short_output_rejected() {
        let mut runtime = Runtime::new(Passthrough::new(1), 0);
        let mut out = vec![0.0; 4];
        assert!(runtime.process_block(&[1.0; 8], &mut out).is_err());
    }

    #[test]
    fn rt_spare_output_capacity_is_untouched() {
        let mut runtime = Runtime::new(Passthrough::new(1), 0);
        let mut out = vec![-1.0; 8];
        let result = runtime.process_block(&[2.0; 4], &mut out).unwrap();
        assert_eq!(result.produced, 4);
        assert_eq!(out, [2.0, 2.0, 2.0, 2.0, -1.0, -1.0, -1.0, -1.0]);
    }
}
