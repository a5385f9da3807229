//! Integration tests for the RMS normalization forward operations

mod common;

use common::{assert_allclose_f64, create_cpu_client};
use normr::dtype::DType;
use normr::ops::{NormalizationOps, RandomOps};
use normr::runtime::cpu::CpuRuntime;
use normr::tensor::Tensor;

/// Reference computation in pure host f64, written independently of the
/// kernels under test.
fn host_rms_norm(input: &[f64], weight: Option<&[f64]>, channels: usize, eps: f64) -> Vec<f64> {
    let rows = input.len() / channels;
    let mut out = vec![0.0; input.len()];
    for r in 0..rows {
        let row = &input[r * channels..(r + 1) * channels];
        let ms = row.iter().map(|x| x * x).sum::<f64>() / channels as f64;
        let rstd = 1.0 / (ms + eps).sqrt();
        for c in 0..channels {
            let w = weight.map_or(1.0, |w| w[c]);
            out[r * channels + c] = row[c] * rstd * w;
        }
    }
    out
}

#[test]
fn fused_forward_matches_host_math() {
    let (device, client) = create_cpu_client();

    let data = vec![3.0f64, 4.0, -1.0, 2.0, 0.5, -0.5];
    let x = Tensor::<CpuRuntime>::from_slice(&data, &[3, 2], &device);
    let y = client.rms_norm(&x, None, 1e-5).unwrap();

    let expected = host_rms_norm(&data, None, 2, 1e-5);
    assert_allclose_f64(&y.to_vec::<f64>(), &expected, 1e-6, 1e-9);
}

#[test]
fn fused_forward_applies_weight() {
    let (device, client) = create_cpu_client();

    let data = vec![1.0f64, 1.0, 1.0, 1.0];
    let x = Tensor::<CpuRuntime>::from_slice(&data, &[2, 2], &device);
    let w_data = vec![2.0f64, 0.5];
    let w = Tensor::<CpuRuntime>::from_slice(&w_data, &[2], &device);

    let y = client.rms_norm(&x, Some(&w), 1e-5).unwrap();
    let expected = host_rms_norm(&data, Some(&w_data), 2, 1e-5);
    assert_allclose_f64(&y.to_vec::<f64>(), &expected, 1e-6, 1e-9);
}

#[test]
fn rank_one_input_is_a_single_row() {
    let (device, client) = create_cpu_client();

    let data = vec![3.0f64, 4.0];
    let x1 = Tensor::<CpuRuntime>::from_slice(&data, &[2], &device);
    let x2 = Tensor::<CpuRuntime>::from_slice(&data, &[1, 2], &device);

    let y1 = client.rms_norm(&x1, None, 1e-5).unwrap();
    let y2 = client.rms_norm(&x2, None, 1e-5).unwrap();

    assert_eq!(y1.shape(), &[2]);
    assert_eq!(y1.to_vec::<f64>(), y2.to_vec::<f64>());
}

#[test]
fn rstd_is_f32_per_row() {
    let (device, client) = create_cpu_client();

    let x = Tensor::<CpuRuntime>::from_slice(&[3.0f64, 4.0, 6.0, 8.0], &[2, 2], &device);
    let (_, rstd) = client.rms_norm_with_rstd(&x, None, 0.0).unwrap();

    assert_eq!(rstd.dtype(), DType::F32);
    assert_eq!(rstd.shape(), &[2]);

    let r = rstd.to_vec::<f32>();
    assert!((r[0] - 1.0 / 12.5f32.sqrt()).abs() < 1e-6);
    assert!((r[1] - 1.0 / 50.0f32.sqrt()).abs() < 1e-6);
}

#[test]
fn reference_forward_matches_host_math() {
    let (device, client) = create_cpu_client();

    let data: Vec<f64> = (0..20).map(|i| (i as f64) * 0.7 - 7.0).collect();
    let x = Tensor::<CpuRuntime>::from_slice(&data, &[4, 5], &device);
    let y = client.rms_norm_reference(&x, None, 1e-5).unwrap();

    let expected = host_rms_norm(&data, None, 5, 1e-5);
    assert_allclose_f64(&y.to_vec::<f64>(), &expected, 1e-12, 1e-12);
}

#[test]
fn non_contiguous_input_matches_contiguous_copy() {
    let (device, client) = create_cpu_client();

    let data: Vec<f32> = (0..12).map(|i| (i as f32) - 6.0).collect();
    let x = Tensor::<CpuRuntime>::from_slice(&data, &[4, 3], &device);
    let xt = x.transpose(0, 1).unwrap();
    let xt_contig = xt.contiguous().unwrap();

    let y_view = client.rms_norm(&xt, None, 1e-5).unwrap();
    let y_copy = client.rms_norm(&xt_contig, None, 1e-5).unwrap();

    assert_eq!(y_view.shape(), &[3, 4]);
    assert_eq!(y_view.to_vec::<f32>(), y_copy.to_vec::<f32>());
}

#[test]
fn weight_shape_is_validated() {
    let (device, client) = create_cpu_client();

    let x = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2], &device);
    let w = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 1.0, 1.0], &[3], &device);
    assert!(client.rms_norm(&x, Some(&w), 1e-5).is_err());
}

#[test]
fn weight_dtype_is_validated() {
    let (device, client) = create_cpu_client();

    let x = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[1, 2], &device);
    let w = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0], &[2], &device);
    assert!(client.rms_norm(&x, Some(&w), 1e-5).is_err());
}

#[test]
fn negative_eps_is_rejected() {
    let (device, client) = create_cpu_client();

    let x = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[1, 2], &device);
    assert!(client.rms_norm(&x, None, -1.0).is_err());
}

#[test]
fn zero_row_input_produces_empty_output() {
    let (device, client) = create_cpu_client();

    let empty = Tensor::<CpuRuntime>::zeros(&[0, 4], DType::F32, &device);

    let y = client.rms_norm(&empty, None, 1e-5).unwrap();
    assert_eq!(y.shape(), &[0, 4]);
    assert!(y.to_vec::<f32>().is_empty());

    let y_ref = client.rms_norm_reference(&empty, None, 1e-5).unwrap();
    assert_eq!(y_ref.numel(), 0);
}

#[test]
fn scalar_input_is_rejected() {
    let (device, client) = create_cpu_client();

    let x = Tensor::<CpuRuntime>::from_slice(&[1.0f32], &[], &device);
    assert!(client.rms_norm(&x, None, 1e-5).is_err());
}

#[test]
fn seeded_randn_is_reproducible() {
    let (_, client) = create_cpu_client();

    let a = client.randn_seeded(&[16], DType::F64, 7).unwrap();
    let b = client.randn_seeded(&[16], DType::F64, 7).unwrap();
    let c = client.randn_seeded(&[16], DType::F64, 8).unwrap();

    assert_eq!(a.to_vec::<f64>(), b.to_vec::<f64>());
    assert_ne!(a.to_vec::<f64>(), c.to_vec::<f64>());
}

#[cfg(feature = "f16")]
#[test]
fn f16_forward_tracks_f32() {
    let (device, client) = create_cpu_client();

    let data: Vec<f64> = (0..32).map(|i| ((i * 13 % 7) as f64) * 0.5 - 1.5).collect();
    let x32 = Tensor::<CpuRuntime>::from_slice(
        &data.iter().map(|&v| v as f32).collect::<Vec<f32>>(),
        &[4, 8],
        &device,
    );
    let x16 = Tensor::<CpuRuntime>::from_slice(
        &data.iter().map(|&v| half::f16::from_f64(v)).collect::<Vec<half::f16>>(),
        &[4, 8],
        &device,
    );

    let y32 = client.rms_norm(&x32, None, 1e-5).unwrap().to_f64_vec().unwrap();
    let y16 = client.rms_norm(&x16, None, 1e-5).unwrap().to_f64_vec().unwrap();
    assert_allclose_f64(&y16, &y32, 1e-2, 5e-2);
}
