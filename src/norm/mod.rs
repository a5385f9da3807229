//! RMS normalization layers
//!
//! [`RmsNorm`] runs the fused single-pass kernel; [`ReferenceRmsNorm`] runs
//! the naive f64 implementation. Both share the same construction surface
//! and normalize over the last dimension of their input, so the parity
//! harness can drive them interchangeably.

use crate::autograd::{var_rms_norm, var_rms_norm_reference, Var};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::NormalizationOps;
use crate::runtime::{Runtime, RuntimeClient};
use crate::tensor::Tensor;

fn make_weight<R: Runtime>(
    dim: usize,
    elementwise_affine: bool,
    dtype: DType,
    device: &R::Device,
) -> Result<Option<Var<R>>> {
    if dim == 0 {
        return Err(Error::InvalidArgument {
            arg: "dim",
            reason: "normalized dimension must be non-zero".to_string(),
        });
    }
    if !elementwise_affine {
        return Ok(None);
    }
    let weight = Tensor::<R>::try_ones(&[dim], dtype, device)?;
    Ok(Some(Var::new(weight, true)))
}

fn check_last_dim<R: Runtime>(input: &Var<R>, dim: usize) -> Result<()> {
    let last = input.shape().last().copied().unwrap_or(0);
    if last != dim {
        return Err(Error::shape_mismatch(&[dim], input.shape()));
    }
    Ok(())
}

/// RMS normalization layer over the fused execution path
///
/// Normalizes the last dimension of the input:
///
/// ```text
/// y = x * rsqrt(mean(x^2) + eps) * w
/// ```
///
/// When `elementwise_affine` is set the layer owns a learnable weight
/// initialized to ones; otherwise the weight multiply is omitted entirely.
pub struct RmsNorm<R: Runtime> {
    dim: usize,
    eps: f32,
    weight: Option<Var<R>>,
}

impl<R: Runtime> RmsNorm<R> {
    /// Create a new layer normalizing the last `dim` elements
    pub fn new(
        dim: usize,
        eps: f32,
        elementwise_affine: bool,
        dtype: DType,
        device: &R::Device,
    ) -> Result<Self> {
        Ok(Self {
            dim,
            eps,
            weight: make_weight(dim, elementwise_affine, dtype, device)?,
        })
    }

    /// The normalized dimension size
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The epsilon added to the mean square before the rsqrt
    #[inline]
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// The learnable weight, if `elementwise_affine` was requested
    #[inline]
    pub fn weight(&self) -> Option<&Var<R>> {
        self.weight.as_ref()
    }

    /// Normalize `input` over its last dimension
    ///
    /// Accepts any rank ending in `dim`; the output has the input's shape.
    pub fn forward<C>(&self, input: &Var<R>, client: &C) -> Result<Var<R>>
    where
        C: RuntimeClient<R> + NormalizationOps<R>,
        R::Client: NormalizationOps<R>,
    {
        check_last_dim(input, self.dim)?;
        var_rms_norm(client, input, self.weight.as_ref(), self.eps)
    }
}

/// RMS normalization layer over the reference (f64) execution path
///
/// Identical interface to [`RmsNorm`]; serves as the correctness oracle the
/// fused path is verified against.
pub struct ReferenceRmsNorm<R: Runtime> {
    dim: usize,
    eps: f32,
    weight: Option<Var<R>>,
}

impl<R: Runtime> ReferenceRmsNorm<R> {
    /// Create a new layer normalizing the last `dim` elements
    pub fn new(
        dim: usize,
        eps: f32,
        elementwise_affine: bool,
        dtype: DType,
        device: &R::Device,
    ) -> Result<Self> {
        Ok(Self {
            dim,
            eps,
            weight: make_weight(dim, elementwise_affine, dtype, device)?,
        })
    }

    /// The normalized dimension size
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The epsilon added to the mean square before the rsqrt
    #[inline]
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// The learnable weight, if `elementwise_affine` was requested
    #[inline]
    pub fn weight(&self) -> Option<&Var<R>> {
        self.weight.as_ref()
    }

    /// Normalize `input` over its last dimension
    pub fn forward<C>(&self, input: &Var<R>, client: &C) -> Result<Var<R>>
    where
        C: RuntimeClient<R> + NormalizationOps<R>,
        R::Client: NormalizationOps<R>,
    {
        check_last_dim(input, self.dim)?;
        var_rms_norm_reference(client, input, self.weight.as_ref(), self.eps)
    }
}
