use complex_arg_cl::buffers::BufferManager;
use complex_arg_cl::kernel::{max_const_items, regime_of};
use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::MemoryRegime;
use proptest::prelude::*;
use std::sync::Arc;

fn manager(budget: u64) -> (Arc<SimulatedDevice>, BufferManager<SimulatedDevice>) {
    let dev = Arc::new(SimulatedDevice::new().with_constant_budget(budget));
    let mgr = BufferManager::new(Arc::clone(&dev), false);
    (dev, mgr)
}

#[test]
fn batch_equal_to_budget_uses_constant_memory() {
    let (dev, mut mgr) = manager(64 * 1024);
    let build = mgr.initialize(8192, 8192).unwrap();
    assert_eq!(build.regime, MemoryRegime::Constant);
    let source = &dev.stats().compiled[0];
    assert_eq!(regime_of(source), Some(MemoryRegime::Constant));
}

#[test]
fn one_past_budget_uses_global_memory() {
    let (dev, mut mgr) = manager(64 * 1024);
    let build = mgr.initialize(8193, 8192).unwrap();
    assert_eq!(build.regime, MemoryRegime::Global);
    assert_eq!(regime_of(&dev.stats().compiled[0]), Some(MemoryRegime::Global));
}

#[test]
fn growing_past_budget_switches_regime() {
    let (_dev, mut mgr) = manager(1024);
    mgr.initialize(128, 0).unwrap();
    assert_eq!(mgr.regime(), Some(MemoryRegime::Constant));
    mgr.resize(129, 0).unwrap();
    assert_eq!(mgr.regime(), Some(MemoryRegime::Global));
    mgr.resize(64, 0).unwrap();
    assert_eq!(mgr.regime(), Some(MemoryRegime::Constant));
}

proptest! {
    #[test]
    fn regime_follows_budget(budget in 0u64..200_000, items in 1usize..30_000) {
        let (_dev, mut mgr) = manager(budget);
        let build = mgr.initialize(items, 8192).unwrap();
        let limit = max_const_items(budget);
        prop_assert_eq!(build.max_const_items, limit);
        prop_assert_eq!(build.regime == MemoryRegime::Constant, items <= limit);
        if limit > 0 && limit < 8192 {
            prop_assert_eq!(build.capacity_limit, Some(limit));
        } else {
            prop_assert_eq!(build.capacity_limit, None);
        }
    }
}
