//! Contract tests for setup-path invariants.
//!
//! Drive the buffer lifecycle through the public API, then check that every
//! invariant the lifecycle is supposed to enforce was actually asserted.

use complex_arg_cl::invariant_ppt::{
    contract_test, BUFFERS_RELEASED, CAPACITY_PROVISIONED, CLAMP_REPORTED, KERNEL_READY,
    REGIME_MATCHES_BUDGET, RESIZE_EXACT,
};
use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::{Block, BlockConfig, ComplexToArg, Sample};
use std::sync::Arc;

#[test]
fn contract_full_lifecycle() {
    let dev = Arc::new(SimulatedDevice::new().with_constant_budget(4096));
    let mut block = ComplexToArg::new(dev, BlockConfig::default().with_max_output_items(8192));
    block.start().unwrap();
    block.resize(1024).unwrap();
    let input = vec![Sample::new(1.0, 1.0); 2048];
    let mut out = vec![0.0f32; 2048];
    block.work(&input, &mut out).unwrap();
    block.stop().unwrap();

    contract_test(
        "buffer lifecycle",
        &[
            CAPACITY_PROVISIONED,
            REGIME_MATCHES_BUDGET,
            CLAMP_REPORTED,
            BUFFERS_RELEASED,
            RESIZE_EXACT,
            KERNEL_READY,
        ],
    );
}

#[test]
fn contract_release_only() {
    let dev = Arc::new(SimulatedDevice::new());
    let mut block = ComplexToArg::new(dev, BlockConfig::default());
    block.stop().unwrap();
    contract_test("release without start", &[BUFFERS_RELEASED]);
}
