//! Shared helpers for integration tests

use normr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use normr::runtime::Runtime;

/// Create a CPU device and client pair
pub fn create_cpu_client() -> (CpuDevice, CpuClient) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device);
    (device, client)
}

/// Assert element-wise closeness of two f64 slices
#[allow(dead_code)]
pub fn assert_allclose_f64(actual: &[f64], expected: &[f64], rtol: f64, atol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &b)) in actual.iter().zip(expected.iter()).enumerate() {
        let bound = atol + rtol * b.abs();
        assert!(
            (a - b).abs() <= bound,
            "element {i}: {a} vs {b} (|diff| {} > {bound})",
            (a - b).abs()
        );
    }
}

/// Assert element-wise closeness of two f32 slices
#[allow(dead_code)]
pub fn assert_allclose_f32(actual: &[f32], expected: &[f32], rtol: f32, atol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &b)) in actual.iter().zip(expected.iter()).enumerate() {
        let bound = atol + rtol * b.abs();
        assert!(
            (a - b).abs() <= bound,
            "element {i}: {a} vs {b} (|diff| {} > {bound})",
            (a - b).abs()
        );
    }
}
