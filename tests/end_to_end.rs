use complex_arg_cl::rt::{process_block_safe, render_offline};
use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::{Block, BlockConfig, ComplexToArg, ProcessingPath, Runtime, Sample};
use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

fn axes() -> [Sample; 4] {
    [
        Sample::new(1.0, 0.0),
        Sample::new(0.0, 1.0),
        Sample::new(-1.0, 0.0),
        Sample::new(0.0, -1.0),
    ]
}

const AXIS_ANGLES: [f32; 4] = [0.0, FRAC_PI_2, PI, -FRAC_PI_2];

fn check_axes(out: &[f32], tolerance: f32) {
    for (got, want) in out.iter().zip(AXIS_ANGLES) {
        assert!((got - want).abs() < tolerance, "got {} want {}", got, want);
    }
}

#[test]
fn axes_on_cpu_path() {
    let mut blk = ComplexToArg::new(
        Arc::new(SimulatedDevice::new()),
        BlockConfig::default().with_path(ProcessingPath::Cpu),
    );
    let mut out = [0.0f32; 4];
    let w = blk.work(&axes(), &mut out).unwrap();
    assert_eq!((w.produced, w.consumed), (4, 4));
    check_axes(&out, 1e-4);
}

#[test]
fn axes_on_accelerated_path() {
    let dev = Arc::new(SimulatedDevice::new());
    let mut blk = ComplexToArg::new(Arc::clone(&dev), BlockConfig::default());
    blk.start().unwrap();
    let mut out = [0.0f32; 4];
    let w = blk.work(&axes(), &mut out).unwrap();
    assert_eq!((w.produced, w.consumed), (4, 4));
    check_axes(&out, 1e-6);
    let stats = dev.stats();
    assert_eq!(stats.bytes_written, 32);
    assert_eq!(stats.bytes_read, 16);
}

#[test]
fn runtime_adopts_capacity_limit() {
    // 8000 bytes of constant memory: 1000 samples.
    let dev = Arc::new(SimulatedDevice::new().with_constant_budget(8000));
    let config = BlockConfig::default().with_max_output_items(8192);
    let (blk, rx) = ComplexToArg::with_events(Arc::clone(&dev), config);
    let mut runtime = Runtime::with_events(blk, config.max_output_items, rx);
    runtime.start().unwrap();

    let input: Vec<Sample> = (0..10_000)
        .map(|i| Sample::from_polar(1.0, (i % 360) as f32 * PI / 180.0 - PI + 0.001))
        .collect();
    let output = render_offline(&mut runtime, &input).unwrap();
    assert_eq!(output.len(), input.len());
    assert_eq!(runtime.max_output_items(), 1000);
    assert_eq!(runtime.block().max_output_items(), 1000);
    assert_eq!(runtime.items_produced(), 10_000);

    let launches = dev.stats().launches;
    assert_eq!(launches[0].global, 8192);
    assert!(launches[1..].iter().all(|l| l.global <= 1000));
    for (s, a) in input.iter().zip(&output) {
        assert!((a - s.im.atan2(s.re)).abs() < 1e-6);
    }
}

#[test]
fn runtime_drives_cpu_path() {
    let blk = ComplexToArg::new(
        Arc::new(SimulatedDevice::new()),
        BlockConfig::default().with_path(ProcessingPath::Cpu),
    );
    let mut runtime = Runtime::new(blk, 0);
    runtime.start().unwrap();
    let input: Vec<Sample> = axes().iter().cycle().take(20_000).copied().collect();
    let output = render_offline(&mut runtime, &input).unwrap();
    assert_eq!(output.len(), 20_000);
    check_axes(&output[4096..4100], 1e-4);
}

#[test]
fn safe_processing_surfaces_errors() {
    let dev = Arc::new(SimulatedDevice::new());
    let blk = ComplexToArg::new(Arc::clone(&dev), BlockConfig::default());
    let mut runtime = Runtime::new(blk, 0);
    runtime.start().unwrap();
    dev.fail_launches(true);
    let mut out = [0.0f32; 4];
    assert!(process_block_safe(&mut runtime, &axes(), &mut out).is_err());
}

#[test]
fn spare_output_capacity_on_both_paths() {
    let dev = Arc::new(SimulatedDevice::new());
    let mut accel = ComplexToArg::new(Arc::clone(&dev), BlockConfig::default());
    accel.start().unwrap();
    let mut cpu = ComplexToArg::new(dev, BlockConfig::default().with_path(ProcessingPath::Cpu));

    for (blk, tolerance) in [(&mut accel, 1e-6), (&mut cpu, 1e-4)] {
        let mut out = [9.0f32; 8];
        let w = blk.work(&axes(), &mut out).unwrap();
        assert_eq!((w.produced, w.consumed), (4, 4));
        check_axes(&out[..4], tolerance);
        assert!(out[4..].iter().all(|&v| v == 9.0));
    }
}
