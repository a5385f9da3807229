//! Integration tests for RMS normalization gradients

mod common;

use common::{assert_allclose_f64, create_cpu_client};
use normr::autograd::{backward_with_grad, Var};
use normr::dtype::DType;
use normr::norm::{ReferenceRmsNorm, RmsNorm};
use normr::ops::{NormalizationOps, RandomOps};
use normr::runtime::cpu::CpuRuntime;
use normr::tensor::Tensor;

/// Loss used for finite-difference checks: L = sum(rms_norm(x) * g)
fn loss(
    client: &normr::runtime::cpu::CpuClient,
    data: &[f64],
    grad: &[f64],
    shape: &[usize],
    device: &normr::runtime::cpu::CpuDevice,
    eps: f32,
) -> f64 {
    let x = Tensor::<CpuRuntime>::from_slice(data, shape, device);
    let y = client.rms_norm_reference(&x, None, eps).unwrap();
    y.to_vec::<f64>()
        .iter()
        .zip(grad.iter())
        .map(|(y, g)| y * g)
        .sum()
}

#[test]
fn reference_backward_matches_finite_differences() {
    let (device, client) = create_cpu_client();
    let eps = 1e-5f32;

    let data: Vec<f64> = (0..12).map(|i| ((i * 5 % 7) as f64) * 0.4 - 1.2).collect();
    let grad: Vec<f64> = (0..12).map(|i| ((i * 3 % 5) as f64) * 0.25 - 0.5).collect();
    let shape = [3, 4];

    let x = Tensor::<CpuRuntime>::from_slice(&data, &shape, &device);
    let g = Tensor::<CpuRuntime>::from_slice(&grad, &shape, &device);
    let (dx, _) = client
        .rms_norm_reference_backward(&g, &x, None, eps)
        .unwrap();
    let dx = dx.to_vec::<f64>();

    let h = 1e-6;
    for i in 0..data.len() {
        let mut plus = data.clone();
        let mut minus = data.clone();
        plus[i] += h;
        minus[i] -= h;
        let numeric = (loss(&client, &plus, &grad, &shape, &device, eps)
            - loss(&client, &minus, &grad, &shape, &device, eps))
            / (2.0 * h);
        assert!(
            (dx[i] - numeric).abs() < 1e-6,
            "element {i}: analytic {} vs numeric {numeric}",
            dx[i]
        );
    }
}

#[test]
fn fused_backward_tracks_reference_backward() {
    let (device, client) = create_cpu_client();
    let eps = 1e-5f32;

    for dim in [8usize, 32, 128] {
        let x = client.randn_seeded(&[16, dim], DType::F32, 3).unwrap();
        let g = client.randn_seeded(&[16, dim], DType::F32, 4).unwrap();
        let w = Tensor::<CpuRuntime>::ones(&[dim], DType::F32, &device);

        let (_, rstd) = client.rms_norm_with_rstd(&x, Some(&w), eps).unwrap();
        let (dx_fused, dw_fused) = client
            .rms_norm_backward(&g, &x, Some(&w), &rstd)
            .unwrap();
        let (dx_ref, dw_ref) = client
            .rms_norm_reference_backward(&g, &x, Some(&w), eps)
            .unwrap();

        assert_allclose_f64(
            &dx_fused.to_f64_vec().unwrap(),
            &dx_ref.to_f64_vec().unwrap(),
            3e-4,
            1e-3,
        );
        assert_allclose_f64(
            &dw_fused.unwrap().to_f64_vec().unwrap(),
            &dw_ref.unwrap().to_f64_vec().unwrap(),
            3e-4,
            1e-3,
        );
    }
}

#[test]
fn layer_backward_produces_input_and_weight_gradients() {
    let (device, client) = create_cpu_client();

    let layer = RmsNorm::<CpuRuntime>::new(16, 1e-5, true, DType::F32, &device).unwrap();
    let x = Var::new(client.randn_seeded(&[4, 16], DType::F32, 11).unwrap(), true);

    let y = layer.forward(&x, &client).unwrap();
    let g = client.randn_seeded(&[4, 16], DType::F32, 12).unwrap();
    let grads = backward_with_grad(&y, &g, &client).unwrap();

    let dx = grads.get(x.id()).expect("input gradient");
    assert_eq!(dx.shape(), &[4, 16]);

    let w = layer.weight().unwrap();
    let dw = grads.get(w.id()).expect("weight gradient");
    assert_eq!(dw.shape(), &[16]);
}

#[test]
fn non_affine_layer_backward_has_no_weight_gradient() {
    let (device, client) = create_cpu_client();

    let layer = RmsNorm::<CpuRuntime>::new(8, 1e-5, false, DType::F64, &device).unwrap();
    let x = Var::new(client.randn_seeded(&[2, 8], DType::F64, 5).unwrap(), true);

    let y = layer.forward(&x, &client).unwrap();
    let g = client.randn_seeded(&[2, 8], DType::F64, 6).unwrap();
    let grads = backward_with_grad(&y, &g, &client).unwrap();

    assert!(grads.get(x.id()).is_some());
    assert_eq!(grads.len(), 2); // output seed + input gradient
}

#[test]
fn fused_and_reference_layers_agree_through_autograd() {
    let (device, client) = create_cpu_client();
    let dim = 64;

    let input = client.randn_seeded(&[8, dim], DType::F32, 21).unwrap();
    let x_fused = Var::new(input.clone(), true);
    let x_ref = Var::new(input, true);

    let fused = RmsNorm::<CpuRuntime>::new(dim, 1e-5, true, DType::F32, &device).unwrap();
    let reference =
        ReferenceRmsNorm::<CpuRuntime>::new(dim, 1e-5, true, DType::F32, &device).unwrap();

    let y_fused = fused.forward(&x_fused, &client).unwrap();
    let y_ref = reference.forward(&x_ref, &client).unwrap();

    let g = client.randn_seeded(&[8, dim], DType::F32, 22).unwrap();
    let grads_fused = backward_with_grad(&y_fused, &g, &client).unwrap();
    let grads_ref = backward_with_grad(&y_ref, &g, &client).unwrap();

    assert_allclose_f64(
        &grads_fused.get(x_fused.id()).unwrap().to_f64_vec().unwrap(),
        &grads_ref.get(x_ref.id()).unwrap().to_f64_vec().unwrap(),
        3e-4,
        1e-3,
    );
}
