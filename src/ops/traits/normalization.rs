//! RMS normalization operations trait.

use crate::error::Result;
use crate::runtime::Runtime;
use crate::tensor::Tensor;

/// RMS normalization, fused and reference variants
///
/// All operations normalize over the last dimension: the input is treated as
/// `rows` rows of `channels` elements, where `channels` is the size of the
/// last dimension and `rows` is the product of the others (1 for a rank-1
/// input).
///
/// ```text
/// rstd  = 1 / sqrt(mean(x^2) + eps)
/// y_j   = x_j * rstd * w_j
/// ```
///
/// `weight` is optional everywhere; `None` means unit weight (no elementwise
/// affine). When present it must be 1-D of length `channels` with the
/// input's dtype.
///
/// The fused variants accumulate row statistics in f32, the way a one-pass
/// GPU kernel would. The reference variants accumulate in f64 and are the
/// ground truth the fused path is verified against.
pub trait NormalizationOps<R: Runtime> {
    /// Fused RMS normalization forward
    fn rms_norm(
        &self,
        input: &Tensor<R>,
        weight: Option<&Tensor<R>>,
        eps: f32,
    ) -> Result<Tensor<R>>;

    /// Fused RMS normalization forward, also returning the per-row
    /// reciprocal standard deviation
    ///
    /// The rstd tensor is always F32 of shape `[rows]`, regardless of the
    /// input dtype. It is consumed by [`Self::rms_norm_backward`].
    fn rms_norm_with_rstd(
        &self,
        input: &Tensor<R>,
        weight: Option<&Tensor<R>>,
        eps: f32,
    ) -> Result<(Tensor<R>, Tensor<R>)>;

    /// Fused RMS normalization backward
    ///
    /// For each row, with `r` the saved rstd and `n = channels`:
    ///
    /// ```text
    /// c     = (1/n) * sum_i(g_i * w_i * x_i)
    /// dx_j  = r * g_j * w_j - x_j * r^3 * c
    /// dw_j  = sum_rows(g_j * x_j * r)
    /// ```
    ///
    /// Returns `(grad_input, grad_weight)`; `grad_weight` is `Some` exactly
    /// when `weight` is.
    fn rms_norm_backward(
        &self,
        grad_out: &Tensor<R>,
        input: &Tensor<R>,
        weight: Option<&Tensor<R>>,
        rstd: &Tensor<R>,
    ) -> Result<(Tensor<R>, Option<Tensor<R>>)>;

    /// Reference RMS normalization forward (f64 accumulation)
    fn rms_norm_reference(
        &self,
        input: &Tensor<R>,
        weight: Option<&Tensor<R>>,
        eps: f32,
    ) -> Result<Tensor<R>>;

    /// Reference RMS normalization backward (f64 accumulation)
    ///
    /// Recomputes rstd from the input rather than consuming a saved buffer,
    /// so the reference path is fully independent of the fused forward.
    fn rms_norm_reference_backward(
        &self,
        grad_out: &Tensor<R>,
        input: &Tensor<R>,
        weight: Option<&Tensor<R>>,
        eps: f32,
    ) -> Result<(Tensor<R>, Option<Tensor<R>>)>;
}
