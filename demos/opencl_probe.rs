use complex_arg_cl::opencl::OpenClBackend;
use complex_arg_cl::{Block, BlockConfig, ComplexToArg, ComputeBackend, Sample};
use std::sync::Arc;

fn main() {
    env_logger::init();

    // Same raw parameters the host framework passes: platform type, device
    // selector, platform id, device id, debug.
    let config = BlockConfig::from_raw(1, 1, 0, 0, 1);
    let backend = match OpenClBackend::new(&config) {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            eprintln!("no usable OpenCL device: {}", err);
            std::process::exit(1);
        }
    };
    println!("Device: {}", backend.device_name());
    println!("  class: {:?}", backend.device_class());
    println!("  constant memory: {} bytes", backend.max_constant_buffer_size());
    println!("  preferred multiple: {}", backend.preferred_work_group_multiple());

    let mut block = ComplexToArg::new(Arc::clone(&backend), config);
    if let Err(err) = block.start() {
        eprintln!("start failed: {}", err);
        std::process::exit(1);
    }
    let input = [
        Sample::new(1.0, 0.0),
        Sample::new(0.0, 1.0),
        Sample::new(-1.0, 0.0),
        Sample::new(0.0, -1.0),
    ];
    let mut out = [0.0f32; 4];
    match block.work(&input, &mut out) {
        Ok(w) => println!("work produced {}: {:?}", w.produced, out),
        Err(err) => eprintln!("work failed: {}", err),
    }
    let _ = block.stop();
}
