use complex_arg_cl::iq_wav::{read_iq_wav, write_phase_wav};
use complex_arg_cl::rt::{render_offline, Runtime};
use complex_arg_cl::sim::SimulatedDevice;
use complex_arg_cl::{BlockConfig, ComplexToArg, ProcessingPath};
use std::sync::Arc;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <iq.wav> <phase.wav> [--cpu]", args[0]);
        std::process::exit(2);
    }
    let path = if args.iter().any(|a| a == "--cpu") {
        ProcessingPath::Cpu
    } else {
        ProcessingPath::Accelerated
    };

    let recording = match read_iq_wav(&args[1]) {
        Ok(rec) => rec,
        Err(err) => {
            eprintln!("failed to read {}: {}", args[1], err);
            std::process::exit(1);
        }
    };

    let config = BlockConfig::default().with_path(path);
    let (block, events) = ComplexToArg::with_events(Arc::new(SimulatedDevice::new()), config);
    let mut runtime = Runtime::with_events(block, config.max_output_items, events);
    if let Err(err) = runtime.start() {
        eprintln!("block failed to start: {}", err);
        std::process::exit(1);
    }

    let phases = match render_offline(&mut runtime, &recording.samples) {
        Ok(phases) => phases,
        Err(err) => {
            eprintln!("processing failed: {}", err);
            std::process::exit(1);
        }
    };
    let _ = runtime.stop();

    if let Err(err) = write_phase_wav(&args[2], &phases, recording.sample_rate) {
        eprintln!("failed to write {}: {}", args[2], err);
        std::process::exit(1);
    }
    println!(
        "{} samples at {} Hz -> {}",
        phases.len(),
        recording.sample_rate,
        args[2]
    );
}
