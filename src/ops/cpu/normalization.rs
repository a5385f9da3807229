//! CPU implementation of RMS normalization operations.

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::ops::NormalizationOps;
use crate::runtime::cpu::{
    helpers::{dispatch_dtype, ensure_contiguous},
    kernels, CpuClient, CpuRuntime,
};
use crate::tensor::Tensor;

/// Interpret the input as `(rows, channels)`: channels is the size of the
/// last dimension, rows the product of the rest (the empty product gives 1
/// for rank-1 input). `rows` is 0 when a leading dimension is 0; the kernels
/// loop over rows, so a zero-row input is a no-op.
fn norm_shape(input: &Tensor<CpuRuntime>) -> Result<(usize, usize)> {
    let shape = input.shape();
    if shape.is_empty() {
        return Err(Error::InvalidDimension { dim: -1, ndim: 0 });
    }

    let channels = shape[shape.len() - 1];
    if channels == 0 {
        return Err(Error::InvalidArgument {
            arg: "input",
            reason: "last dimension must be non-empty".to_string(),
        });
    }

    let rows: usize = shape[..shape.len() - 1].iter().product();
    Ok((rows, channels))
}

fn validate_eps(eps: f32) -> Result<()> {
    if !eps.is_finite() || eps < 0.0 {
        return Err(Error::InvalidArgument {
            arg: "eps",
            reason: format!("must be finite and non-negative, got {eps}"),
        });
    }
    Ok(())
}

/// Validate an optional weight and return it contiguous.
fn validate_weight(
    input: &Tensor<CpuRuntime>,
    weight: Option<&Tensor<CpuRuntime>>,
    channels: usize,
) -> Result<Option<Tensor<CpuRuntime>>> {
    let Some(w) = weight else {
        return Ok(None);
    };

    if w.dtype() != input.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: input.dtype(),
            rhs: w.dtype(),
        });
    }
    if w.shape() != [channels] {
        return Err(Error::shape_mismatch(&[channels], w.shape()));
    }

    Ok(Some(ensure_contiguous(w)?))
}

fn validate_grad_shapes(
    grad_out: &Tensor<CpuRuntime>,
    input: &Tensor<CpuRuntime>,
) -> Result<()> {
    if grad_out.dtype() != input.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: input.dtype(),
            rhs: grad_out.dtype(),
        });
    }
    if grad_out.shape() != input.shape() {
        return Err(Error::shape_mismatch(input.shape(), grad_out.shape()));
    }
    Ok(())
}

/// Convert the f64 weight-gradient accumulator into a tensor of the weight's
/// dtype.
fn grad_weight_from_f64(
    client: &CpuClient,
    acc: &[f64],
    dtype: DType,
) -> Result<Tensor<CpuRuntime>> {
    fn narrowed<T: Element>(
        acc: &[f64],
        device: &crate::runtime::cpu::CpuDevice,
    ) -> Result<Tensor<CpuRuntime>> {
        let data: Vec<T> = acc.iter().map(|&v| T::from_f64(v)).collect();
        Tensor::try_from_slice(&data, &[data.len()], device)
    }

    dispatch_dtype!(dtype, T => {
        narrowed::<T>(acc, &client.device)
    }, "rms_norm_backward")
}

impl NormalizationOps<CpuRuntime> for CpuClient {
    fn rms_norm(
        &self,
        input: &Tensor<CpuRuntime>,
        weight: Option<&Tensor<CpuRuntime>>,
        eps: f32,
    ) -> Result<Tensor<CpuRuntime>> {
        let (out, _rstd) = self.rms_norm_with_rstd(input, weight, eps)?;
        Ok(out)
    }

    fn rms_norm_with_rstd(
        &self,
        input: &Tensor<CpuRuntime>,
        weight: Option<&Tensor<CpuRuntime>>,
        eps: f32,
    ) -> Result<(Tensor<CpuRuntime>, Tensor<CpuRuntime>)> {
        validate_eps(eps)?;
        let (rows, channels) = norm_shape(input)?;
        let weight_contig = validate_weight(input, weight, channels)?;

        let dtype = input.dtype();
        let input_contig = ensure_contiguous(input)?;
        let out = Tensor::<CpuRuntime>::try_empty(input.shape(), dtype, &self.device)?;
        // rstd is always F32, the fused kernels' accumulation precision
        let rstd = Tensor::<CpuRuntime>::try_empty(&[rows], DType::F32, &self.device)?;

        let input_ptr = input_contig.storage().ptr();
        let weight_ptr = weight_contig.as_ref().map_or(0, |w| w.storage().ptr());
        let out_ptr = out.storage().ptr();
        let rstd_ptr = rstd.storage().ptr();

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::rms_norm_kernel::<T>(
                    input_ptr as *const T,
                    weight_ptr as *const T,
                    out_ptr as *mut T,
                    rstd_ptr as *mut f32,
                    rows,
                    channels,
                    eps,
                );
            }
        }, "rms_norm");

        Ok((out, rstd))
    }

    fn rms_norm_backward(
        &self,
        grad_out: &Tensor<CpuRuntime>,
        input: &Tensor<CpuRuntime>,
        weight: Option<&Tensor<CpuRuntime>>,
        rstd: &Tensor<CpuRuntime>,
    ) -> Result<(Tensor<CpuRuntime>, Option<Tensor<CpuRuntime>>)> {
        validate_grad_shapes(grad_out, input)?;
        let (rows, channels) = norm_shape(input)?;
        let weight_contig = validate_weight(input, weight, channels)?;

        if rstd.dtype() != DType::F32 {
            return Err(Error::DTypeMismatch {
                lhs: DType::F32,
                rhs: rstd.dtype(),
            });
        }
        if rstd.shape() != [rows] {
            return Err(Error::shape_mismatch(&[rows], rstd.shape()));
        }

        let dtype = input.dtype();
        let input_contig = ensure_contiguous(input)?;
        let grad_out_contig = ensure_contiguous(grad_out)?;
        let rstd_contig = ensure_contiguous(rstd)?;
        let grad_input = Tensor::<CpuRuntime>::try_empty(input.shape(), dtype, &self.device)?;

        // Weight gradient accumulates in f64 across rows
        let mut dw_acc = if weight_contig.is_some() {
            vec![0.0f64; channels]
        } else {
            Vec::new()
        };

        let grad_out_ptr = grad_out_contig.storage().ptr();
        let input_ptr = input_contig.storage().ptr();
        let weight_ptr = weight_contig.as_ref().map_or(0, |w| w.storage().ptr());
        let rstd_ptr = rstd_contig.storage().ptr();
        let grad_input_ptr = grad_input.storage().ptr();
        let dw_ptr = if dw_acc.is_empty() {
            std::ptr::null_mut()
        } else {
            dw_acc.as_mut_ptr()
        };

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::rms_norm_backward_kernel::<T>(
                    grad_out_ptr as *const T,
                    input_ptr as *const T,
                    weight_ptr as *const T,
                    rstd_ptr as *const f32,
                    grad_input_ptr as *mut T,
                    dw_ptr,
                    rows,
                    channels,
                );
            }
        }, "rms_norm_backward");

        let grad_weight = if dw_acc.is_empty() {
            None
        } else {
            Some(grad_weight_from_f64(self, &dw_acc, dtype)?)
        };

        Ok((grad_input, grad_weight))
    }

    fn rms_norm_reference(
        &self,
        input: &Tensor<CpuRuntime>,
        weight: Option<&Tensor<CpuRuntime>>,
        eps: f32,
    ) -> Result<Tensor<CpuRuntime>> {
        validate_eps(eps)?;
        let (rows, channels) = norm_shape(input)?;
        let weight_contig = validate_weight(input, weight, channels)?;

        let dtype = input.dtype();
        let input_contig = ensure_contiguous(input)?;
        let out = Tensor::<CpuRuntime>::try_empty(input.shape(), dtype, &self.device)?;

        let input_ptr = input_contig.storage().ptr();
        let weight_ptr = weight_contig.as_ref().map_or(0, |w| w.storage().ptr());
        let out_ptr = out.storage().ptr();

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::rms_norm_reference_kernel::<T>(
                    input_ptr as *const T,
                    weight_ptr as *const T,
                    out_ptr as *mut T,
                    rows,
                    channels,
                    eps,
                );
            }
        }, "rms_norm_reference");

        Ok(out)
    }

    fn rms_norm_reference_backward(
        &self,
        grad_out: &Tensor<CpuRuntime>,
        input: &Tensor<CpuRuntime>,
        weight: Option<&Tensor<CpuRuntime>>,
        eps: f32,
    ) -> Result<(Tensor<CpuRuntime>, Option<Tensor<CpuRuntime>>)> {
        validate_eps(eps)?;
        validate_grad_shapes(grad_out, input)?;
        let (rows, channels) = norm_shape(input)?;
        let weight_contig = validate_weight(input, weight, channels)?;

        let dtype = input.dtype();
        let input_contig = ensure_contiguous(input)?;
        let grad_out_contig = ensure_contiguous(grad_out)?;
        let grad_input = Tensor::<CpuRuntime>::try_empty(input.shape(), dtype, &self.device)?;

        let mut dw_acc = if weight_contig.is_some() {
            vec![0.0f64; channels]
        } else {
            Vec::new()
        };

        let grad_out_ptr = grad_out_contig.storage().ptr();
        let input_ptr = input_contig.storage().ptr();
        let weight_ptr = weight_contig.as_ref().map_or(0, |w| w.storage().ptr());
        let grad_input_ptr = grad_input.storage().ptr();
        let dw_ptr = if dw_acc.is_empty() {
            std::ptr::null_mut()
        } else {
            dw_acc.as_mut_ptr()
        };

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::rms_norm_reference_backward_kernel::<T>(
                    grad_out_ptr as *const T,
                    input_ptr as *const T,
                    weight_ptr as *const T,
                    grad_input_ptr as *mut T,
                    dw_ptr,
                    rows,
                    channels,
                    eps,
                );
            }
        }, "rms_norm_reference_backward");

        let grad_weight = if dw_acc.is_empty() {
            None
        } else {
            Some(grad_weight_from_f64(self, &dw_acc, dtype)?)
        };

        Ok((grad_input, grad_weight))
    }
}

#[cfg(test)]
mod tests {
    use crate::dtype::DType;
    use crate::ops::{NormalizationOps, RandomOps};
    use crate::runtime::cpu::CpuRuntime;
    use crate::runtime::Runtime;
    use crate::tensor::Tensor;

    fn client() -> (
        crate::runtime::cpu::CpuDevice,
        crate::runtime::cpu::CpuClient,
    ) {
        let device = CpuRuntime::default_device();
        let client = CpuRuntime::default_client(&device);
        (device, client)
    }

    #[test]
    fn test_rms_norm_known_values() {
        let (device, client) = client();

        // Row [3, 4] with eps 0: rms = sqrt(12.5)
        let input = Tensor::<CpuRuntime>::from_slice(&[3.0f64, 4.0], &[1, 2], &device);
        let out = client.rms_norm(&input, None, 0.0).unwrap();

        let rms = 12.5f64.sqrt();
        let data = out.to_vec::<f64>();
        assert!((data[0] - 3.0 / rms).abs() < 1e-6);
        assert!((data[1] - 4.0 / rms).abs() < 1e-6);
    }

    #[test]
    fn test_rms_norm_rank1_is_single_row() {
        let (device, client) = client();

        let flat = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[4], &device);
        let row = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 4], &device);

        let a = client.rms_norm(&flat, None, 1e-5).unwrap();
        let b = client.rms_norm(&row, None, 1e-5).unwrap();
        assert_eq!(a.to_vec::<f32>(), b.to_vec::<f32>());
    }

    #[test]
    fn test_rstd_shape_and_dtype() {
        let (_, client) = client();

        let input = client.randn_seeded(&[2, 3, 8], DType::F64, 1).unwrap();
        let (out, rstd) = client.rms_norm_with_rstd(&input, None, 1e-5).unwrap();

        assert_eq!(out.shape(), &[2, 3, 8]);
        assert_eq!(rstd.shape(), &[6]);
        assert_eq!(rstd.dtype(), DType::F32);
    }

    #[test]
    fn test_weight_scales_output() {
        let (device, client) = client();

        let input = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0], &[1, 2], &device);
        let weight = Tensor::<CpuRuntime>::from_slice(&[2.0f64, 3.0], &[2], &device);

        let plain = client.rms_norm(&input, None, 1e-5).unwrap().to_vec::<f64>();
        let scaled = client
            .rms_norm(&input, Some(&weight), 1e-5)
            .unwrap()
            .to_vec::<f64>();

        assert!((scaled[0] - 2.0 * plain[0]).abs() < 1e-12);
        assert!((scaled[1] - 3.0 * plain[1]).abs() < 1e-12);
    }

    #[test]
    fn test_backward_no_weight_returns_no_weight_grad() {
        let (_, client) = client();

        let input = client.randn_seeded(&[4, 16], DType::F32, 2).unwrap();
        let grad = client.randn_seeded(&[4, 16], DType::F32, 3).unwrap();

        let (_, rstd) = client.rms_norm_with_rstd(&input, None, 1e-5).unwrap();
        let (dx, dw) = client.rms_norm_backward(&grad, &input, None, &rstd).unwrap();

        assert_eq!(dx.shape(), input.shape());
        assert!(dw.is_none());

        let (_, dw_ref) = client
            .rms_norm_reference_backward(&grad, &input, None, 1e-5)
            .unwrap();
        assert!(dw_ref.is_none());
    }

    #[test]
    fn test_fused_tracks_reference_f32() {
        let (_, client) = client();

        let input = client.randn_seeded(&[8, 128], DType::F32, 42).unwrap();
        let weight = client.randn_seeded(&[128], DType::F32, 43).unwrap();
        let grad = client.randn_seeded(&[8, 128], DType::F32, 44).unwrap();

        let (fused, rstd) = client
            .rms_norm_with_rstd(&input, Some(&weight), 1e-5)
            .unwrap();
        let reference = client.rms_norm_reference(&input, Some(&weight), 1e-5).unwrap();

        for (a, b) in fused
            .to_f64_vec()
            .unwrap()
            .iter()
            .zip(reference.to_f64_vec().unwrap().iter())
        {
            assert!((a - b).abs() <= 1e-3 + 3e-4 * b.abs());
        }

        let (dx_f, dw_f) = client
            .rms_norm_backward(&grad, &input, Some(&weight), &rstd)
            .unwrap();
        let (dx_r, dw_r) = client
            .rms_norm_reference_backward(&grad, &input, Some(&weight), 1e-5)
            .unwrap();

        for (a, b) in dx_f
            .to_f64_vec()
            .unwrap()
            .iter()
            .zip(dx_r.to_f64_vec().unwrap().iter())
        {
            assert!((a - b).abs() <= 1e-3 + 3e-4 * b.abs());
        }
        for (a, b) in dw_f
            .unwrap()
            .to_f64_vec()
            .unwrap()
            .iter()
            .zip(dw_r.unwrap().to_f64_vec().unwrap().iter())
        {
            assert!((a - b).abs() <= 1e-3 + 3e-4 * b.abs());
        }
    }

    #[test]
    fn test_zero_row_input_is_noop() {
        let (device, client) = client();

        let empty = Tensor::<CpuRuntime>::zeros(&[0, 4], DType::F32, &device);
        let weight = Tensor::<CpuRuntime>::ones(&[4], DType::F32, &device);

        let out = client.rms_norm(&empty, None, 1e-5).unwrap();
        assert_eq!(out.shape(), &[0, 4]);
        assert!(out.to_vec::<f32>().is_empty());

        let (out, rstd) = client
            .rms_norm_with_rstd(&empty, Some(&weight), 1e-5)
            .unwrap();
        assert_eq!(out.numel(), 0);
        assert_eq!(rstd.shape(), &[0]);

        let (dx, dw) = client
            .rms_norm_backward(&empty, &empty, Some(&weight), &rstd)
            .unwrap();
        assert_eq!(dx.shape(), &[0, 4]);
        // No rows to accumulate over: the weight gradient is all zeros
        assert_eq!(dw.unwrap().to_vec::<f32>(), vec![0.0f32; 4]);

        let ref_out = client.rms_norm_reference(&empty, None, 1e-5).unwrap();
        assert_eq!(ref_out.numel(), 0);
        let (ref_dx, ref_dw) = client
            .rms_norm_reference_backward(&empty, &empty, None, 1e-5)
            .unwrap();
        assert_eq!(ref_dx.numel(), 0);
        assert!(ref_dw.is_none());
    }

    #[test]
    fn test_scalar_input_rejected() {
        let (device, client) = client();

        let scalar = Tensor::<CpuRuntime>::full_scalar(&[], DType::F32, 1.0, &device);
        assert!(client.rms_norm(&scalar, None, 1e-5).is_err());
    }

    #[test]
    fn test_bad_weight_shape_rejected() {
        let (device, client) = client();

        let input = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2], &device);
        let weight = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 1.0, 1.0], &[3], &device);
        assert!(client.rms_norm(&input, Some(&weight), 1e-5).is_err());
    }

    #[test]
    fn test_negative_eps_rejected() {
        let (device, client) = client();

        let input = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[1, 2], &device);
        assert!(client.rms_norm(&input, None, -1.0).is_err());
    }

    #[test]
    fn test_non_contiguous_input_handled() {
        let (_, client) = client();

        let input = client.randn_seeded(&[8, 8], DType::F64, 5).unwrap();
        let transposed = input.transpose(0, 1).unwrap();
        let materialized = transposed.contiguous().unwrap();

        let from_view = client.rms_norm(&transposed, None, 1e-5).unwrap();
        let from_copy = client.rms_norm(&materialized, None, 1e-5).unwrap();

        assert_eq!(from_view.to_vec::<f64>(), from_copy.to_vec::<f64>());
    }
}
