use complex_arg_cl::rt::{render_offline, Runtime};
use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::{BlockConfig, ComplexToArg, Sample};
use std::f32::consts::PI;
use std::sync::Arc;

fn main() {
    env_logger::init();

    // Complex tone at 1/16 of the sample rate: phase advances by π/8 per sample.
    let step = 2.0 * PI / 16.0;
    let input: Vec<Sample> = (0..20_000)
        .map(|i| Sample::from_polar(1.0, i as f32 * step))
        .collect();

    // 16 KiB of constant memory: 2048 samples, below the 8192 default hint.
    let dev = Arc::new(SimulatedDevice::new().with_constant_budget(16 * 1024));
    let config = BlockConfig::default().with_max_output_items(8192);
    let (block, events) = ComplexToArg::with_events(Arc::clone(&dev), config);
    let mut runtime = Runtime::with_events(block, config.max_output_items, events);
    runtime.start().unwrap();

    let phases = render_offline(&mut runtime, &input).unwrap();
    runtime.stop().unwrap();

    println!("Processed {} samples", phases.len());
    println!("Batch hint after start: {}", runtime.max_output_items());
    for (i, phase) in phases.iter().take(9).enumerate() {
        println!("  phase[{}] = {:+.5}", i, phase);
    }
    let stats = dev.stats();
    println!(
        "Device: {} launches, {} kernel builds, last regime {:?}",
        stats.launches.len(),
        stats.compiled.len(),
        stats.last_regime()
    );
}
