use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::{Block, BlockConfig, ComplexToArg, DeviceClass, Runtime};
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #[test]
    fn forecast_is_identity(n in 0usize..1_000_000) {
        let block = ComplexToArg::new(Arc::new(SimulatedDevice::new()), BlockConfig::default());
        prop_assert_eq!(block.forecast(n), n);
    }

    #[test]
    fn runtime_batches_are_multiples_of_output_multiple(
        multiple in 1usize..256,
        hint in 0usize..20_000,
        remaining in 1usize..50_000,
    ) {
        let dev = Arc::new(SimulatedDevice::new().with_work_group_multiple(multiple));
        let block = ComplexToArg::new(dev, BlockConfig::default());
        let runtime = Runtime::new(block, hint);
        let n = runtime.batch_len(remaining);
        let limit = if hint == 0 { 8192 } else { hint };
        prop_assert!(n <= remaining.min(limit));
        if remaining.min(limit) >= multiple {
            prop_assert_eq!(n % multiple, 0);
            prop_assert!(n > 0);
        } else {
            prop_assert_eq!(n, remaining.min(limit));
        }
    }
}

#[test]
fn cpu_class_device_has_unit_output_multiple() {
    let dev = Arc::new(
        SimulatedDevice::new()
            .with_class(DeviceClass::Cpu)
            .with_work_group_multiple(128),
    );
    let block = ComplexToArg::new(dev, BlockConfig::default());
    assert_eq!(block.output_multiple(), 1);
}
