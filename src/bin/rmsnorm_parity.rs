//! Parity sweep between the fused RMS normalization kernel and the f64
//! reference implementation.
//!
//! Takes no arguments. Runs every channel dimension against every float
//! precision, printing one table row per configuration, and exits non-zero
//! on the first tolerance failure.

use normr::runtime::cpu::{CpuDevice, CpuRuntime};
use normr::runtime::Runtime;
use normr::verify;

const SEED: u64 = 42;

fn main() {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);

    println!("rmsnorm parity sweep (seed {SEED}, eps 1e-5)");
    println!();

    match verify::sweep(&client, SEED, true) {
        Ok(reports) => {
            println!();
            println!("all {} configurations within tolerance", reports.len());
        }
        Err(err) => {
            eprintln!("parity failure: {err}");
            std::process::exit(1);
        }
    }
}
