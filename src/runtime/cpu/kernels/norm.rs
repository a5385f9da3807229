//! RMS normalization kernels
//!
//! Two families live here. The fused kernels accumulate row statistics in
//! f32, matching what a single-pass GPU kernel would do. The reference
//! kernels accumulate in f64 and serve as the ground truth the fused path is
//! compared against.
//!
//! All kernels treat the input as `rows` rows of `channels` elements and
//! normalize each row:
//!
//! ```text
//! rstd   = 1 / sqrt(mean(x^2) + eps)
//! out_j  = x_j * rstd * w_j
//! ```
//!
//! A null `weight` pointer means unit weight (no elementwise affine).

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

// ============================================================================
// Fused kernels (f32 accumulation)
// ============================================================================

/// Fused RMS normalization forward
///
/// Writes the per-row reciprocal standard deviation into `rstd` for reuse by
/// the backward kernel.
///
/// # Safety
/// - `input` and `out` must be valid pointers to `rows * channels` elements
/// - `weight` must be null or a valid pointer to `channels` elements
/// - `rstd` must be a valid pointer to `rows` elements
#[inline]
pub unsafe fn rms_norm_kernel<T: Element>(
    input: *const T,
    weight: *const T,
    out: *mut T,
    rstd: *mut f32,
    rows: usize,
    channels: usize,
    eps: f32,
) {
    #[cfg(feature = "rayon")]
    {
        let input_addr = input as usize;
        let weight_addr = weight as usize;
        let out_addr = out as usize;
        let rstd_addr = rstd as usize;

        (0..rows).into_par_iter().for_each(|row| unsafe {
            rms_norm_row::<T>(
                input_addr as *const T,
                weight_addr as *const T,
                out_addr as *mut T,
                rstd_addr as *mut f32,
                row,
                channels,
                eps,
            );
        });
        return;
    }

    #[cfg(not(feature = "rayon"))]
    for row in 0..rows {
        rms_norm_row::<T>(input, weight, out, rstd, row, channels, eps);
    }
}

#[inline]
unsafe fn rms_norm_row<T: Element>(
    input: *const T,
    weight: *const T,
    out: *mut T,
    rstd: *mut f32,
    row: usize,
    channels: usize,
    eps: f32,
) {
    let row_start = row * channels;

    let mut sum_sq = 0.0f32;
    for i in 0..channels {
        let x = (*input.add(row_start + i)).to_f32();
        sum_sq += x * x;
    }

    let r = 1.0 / (sum_sq / channels as f32 + eps).sqrt();
    *rstd.add(row) = r;

    if weight.is_null() {
        for i in 0..channels {
            let x = (*input.add(row_start + i)).to_f32();
            *out.add(row_start + i) = T::from_f32(x * r);
        }
    } else {
        for i in 0..channels {
            let x = (*input.add(row_start + i)).to_f32();
            let w = (*weight.add(i)).to_f32();
            *out.add(row_start + i) = T::from_f32(x * r * w);
        }
    }
}

/// Fused RMS normalization backward
///
/// Consumes the `rstd` buffer produced by the forward pass. For each row:
///
/// ```text
/// c      = (1/n) * sum_i(g_i * w_i * x_i)
/// dx_j   = r * g_j * w_j - x_j * r^3 * c
/// dw_j  += g_j * x_j * r     (summed over rows, in f64)
/// ```
///
/// # Safety
/// - `grad_out`, `input`, and `grad_input` must be valid pointers to
///   `rows * channels` elements
/// - `weight` must be null or a valid pointer to `channels` elements
/// - `rstd` must be a valid pointer to `rows` elements
/// - `grad_weight` must be null or a valid pointer to `channels` f64
///   elements, zero-initialized by the caller
#[inline]
#[allow(clippy::too_many_arguments)]
pub unsafe fn rms_norm_backward_kernel<T: Element>(
    grad_out: *const T,
    input: *const T,
    weight: *const T,
    rstd: *const f32,
    grad_input: *mut T,
    grad_weight: *mut f64,
    rows: usize,
    channels: usize,
) {
    for row in 0..rows {
        let row_start = row * channels;
        let r = *rstd.add(row);

        let mut c = 0.0f32;
        for i in 0..channels {
            let g = (*grad_out.add(row_start + i)).to_f32();
            let x = (*input.add(row_start + i)).to_f32();
            let w = if weight.is_null() {
                1.0
            } else {
                (*weight.add(i)).to_f32()
            };
            c += g * w * x;
        }
        c /= channels as f32;

        let r3c = r * r * r * c;
        for i in 0..channels {
            let g = (*grad_out.add(row_start + i)).to_f32();
            let x = (*input.add(row_start + i)).to_f32();
            let w = if weight.is_null() {
                1.0
            } else {
                (*weight.add(i)).to_f32()
            };
            *grad_input.add(row_start + i) = T::from_f32(r * g * w - x * r3c);

            if !grad_weight.is_null() {
                *grad_weight.add(i) += (g as f64) * (x as f64) * (r as f64);
            }
        }
    }
}

// ============================================================================
// Reference kernels (f64 accumulation)
// ============================================================================

/// Reference RMS normalization forward, accumulating in f64
///
/// # Safety
/// - `input` and `out` must be valid pointers to `rows * channels` elements
/// - `weight` must be null or a valid pointer to `channels` elements
#[inline]
pub unsafe fn rms_norm_reference_kernel<T: Element>(
    input: *const T,
    weight: *const T,
    out: *mut T,
    rows: usize,
    channels: usize,
    eps: f32,
) {
    #[cfg(feature = "rayon")]
    {
        let input_addr = input as usize;
        let weight_addr = weight as usize;
        let out_addr = out as usize;

        (0..rows).into_par_iter().for_each(|row| unsafe {
            rms_norm_reference_row::<T>(
                input_addr as *const T,
                weight_addr as *const T,
                out_addr as *mut T,
                row,
                channels,
                eps,
            );
        });
        return;
    }

    #[cfg(not(feature = "rayon"))]
    for row in 0..rows {
        rms_norm_reference_row::<T>(input, weight, out, row, channels, eps);
    }
}

#[inline]
unsafe fn rms_norm_reference_row<T: Element>(
    input: *const T,
    weight: *const T,
    out: *mut T,
    row: usize,
    channels: usize,
    eps: f32,
) {
    let row_start = row * channels;
    let eps = eps as f64;

    let mut sum_sq = 0.0f64;
    for i in 0..channels {
        let x = (*input.add(row_start + i)).to_f64();
        sum_sq += x * x;
    }

    let r = 1.0 / (sum_sq / channels as f64 + eps).sqrt();

    if weight.is_null() {
        for i in 0..channels {
            let x = (*input.add(row_start + i)).to_f64();
            *out.add(row_start + i) = T::from_f64(x * r);
        }
    } else {
        for i in 0..channels {
            let x = (*input.add(row_start + i)).to_f64();
            let w = (*weight.add(i)).to_f64();
            *out.add(row_start + i) = T::from_f64(x * r * w);
        }
    }
}

/// Reference RMS normalization backward, accumulating in f64
///
/// Recomputes the per-row rstd from the input instead of consuming a saved
/// buffer, so the reference path has no dependency on the fused forward.
///
/// # Safety
/// - `grad_out`, `input`, and `grad_input` must be valid pointers to
///   `rows * channels` elements
/// - `weight` must be null or a valid pointer to `channels` elements
/// - `grad_weight` must be null or a valid pointer to `channels` f64
///   elements, zero-initialized by the caller
#[inline]
#[allow(clippy::too_many_arguments)]
pub unsafe fn rms_norm_reference_backward_kernel<T: Element>(
    grad_out: *const T,
    input: *const T,
    weight: *const T,
    grad_input: *mut T,
    grad_weight: *mut f64,
    rows: usize,
    channels: usize,
    eps: f32,
) {
    let eps = eps as f64;

    for row in 0..rows {
        let row_start = row * channels;

        let mut sum_sq = 0.0f64;
        for i in 0..channels {
            let x = (*input.add(row_start + i)).to_f64();
            sum_sq += x * x;
        }
        let r = 1.0 / (sum_sq / channels as f64 + eps).sqrt();

        let mut c = 0.0f64;
        for i in 0..channels {
            let g = (*grad_out.add(row_start + i)).to_f64();
            let x = (*input.add(row_start + i)).to_f64();
            let w = if weight.is_null() {
                1.0
            } else {
                (*weight.add(i)).to_f64()
            };
            c += g * w * x;
        }
        c /= channels as f64;

        let r3c = r * r * r * c;
        for i in 0..channels {
            let g = (*grad_out.add(row_start + i)).to_f64();
            let x = (*input.add(row_start + i)).to_f64();
            let w = if weight.is_null() {
                1.0
            } else {
                (*weight.add(i)).to_f64()
            };
            *grad_input.add(row_start + i) = T::from_f64(r * g * w - x * r3c);

            if !grad_weight.is_null() {
                *grad_weight.add(i) += g * x * r;
            }
        }
    }
}
