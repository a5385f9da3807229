//! Backward implementations for RMS normalization

use crate::autograd::GradFn;
use crate::error::Result;
use crate::ops::NormalizationOps;
use crate::runtime::Runtime;
use crate::tensor::{Tensor, TensorId};
use std::sync::Arc;

// ============================================================================
// RmsNormBackward
// ============================================================================

/// Backward for the fused RMS normalization forward
///
/// Saves the input, the optional weight, and the per-row rstd produced by
/// the forward pass. Gradients are computed by the fused backward kernel
/// (f32 row statistics, f64 weight accumulation).
pub struct RmsNormBackward<R: Runtime> {
    input_ids: Vec<TensorId>,
    input_grad_fns: Vec<Option<Arc<dyn GradFn<R>>>>,
    input: Tensor<R>,
    weight: Option<Tensor<R>>,
    rstd: Tensor<R>,
    input_needs_grad: bool,
    weight_needs_grad: bool,
}

impl<R: Runtime> RmsNormBackward<R> {
    /// Create a new RmsNormBackward
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_ids: Vec<TensorId>,
        input_grad_fns: Vec<Option<Arc<dyn GradFn<R>>>>,
        input: Tensor<R>,
        weight: Option<Tensor<R>>,
        rstd: Tensor<R>,
        input_needs_grad: bool,
        weight_needs_grad: bool,
    ) -> Self {
        Self {
            input_ids,
            input_grad_fns,
            input,
            weight,
            rstd,
            input_needs_grad,
            weight_needs_grad,
        }
    }
}

impl<R: Runtime> GradFn<R> for RmsNormBackward<R>
where
    R::Client: NormalizationOps<R>,
{
    fn backward(&self, grad_output: &Tensor<R>) -> Result<Vec<Option<Tensor<R>>>> {
        let client = R::default_client(grad_output.device());

        let (grad_input, grad_weight) = client.rms_norm_backward(
            grad_output,
            &self.input,
            self.weight.as_ref(),
            &self.rstd,
        )?;

        let mut grads = Vec::with_capacity(self.input_ids.len());
        grads.push(self.input_needs_grad.then_some(grad_input));
        if self.weight.is_some() {
            grads.push(if self.weight_needs_grad {
                grad_weight
            } else {
                None
            });
        }
        Ok(grads)
    }

    fn inputs(&self) -> &[TensorId] {
        &self.input_ids
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn<R>>>> {
        self.input_grad_fns.clone()
    }

    fn name(&self) -> &'static str {
        "RmsNormBackward"
    }
}

// ============================================================================
// RmsNormRefBackward
// ============================================================================

/// Backward for the reference RMS normalization forward
///
/// Stores eps instead of a saved rstd buffer; the reference backward kernel
/// recomputes rstd per row in f64, keeping this path independent of the
/// fused forward.
pub struct RmsNormRefBackward<R: Runtime> {
    input_ids: Vec<TensorId>,
    input_grad_fns: Vec<Option<Arc<dyn GradFn<R>>>>,
    input: Tensor<R>,
    weight: Option<Tensor<R>>,
    eps: f32,
    input_needs_grad: bool,
    weight_needs_grad: bool,
}

impl<R: Runtime> RmsNormRefBackward<R> {
    /// Create a new RmsNormRefBackward
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_ids: Vec<TensorId>,
        input_grad_fns: Vec<Option<Arc<dyn GradFn<R>>>>,
        input: Tensor<R>,
        weight: Option<Tensor<R>>,
        eps: f32,
        input_needs_grad: bool,
        weight_needs_grad: bool,
    ) -> Self {
        Self {
            input_ids,
            input_grad_fns,
            input,
            weight,
            eps,
            input_needs_grad,
            weight_needs_grad,
        }
    }
}

impl<R: Runtime> GradFn<R> for RmsNormRefBackward<R>
where
    R::Client: NormalizationOps<R>,
{
    fn backward(&self, grad_output: &Tensor<R>) -> Result<Vec<Option<Tensor<R>>>> {
        let client = R::default_client(grad_output.device());

        let (grad_input, grad_weight) = client.rms_norm_reference_backward(
            grad_output,
            &self.input,
            self.weight.as_ref(),
            self.eps,
        )?;

        let mut grads = Vec::with_capacity(self.input_ids.len());
        grads.push(self.input_needs_grad.then_some(grad_input));
        if self.weight.is_some() {
            grads.push(if self.weight_needs_grad {
                grad_weight
            } else {
                None
            });
        }
        Ok(grads)
    }

    fn inputs(&self) -> &[TensorId] {
        &self.input_ids
    }

    fn input_grad_fns(&self) -> Vec<Option<Arc<dyn GradFn<R>>>> {
        self.input_grad_fns.clone()
    }

    fn name(&self) -> &'static str {
        "RmsNormRefBackward"
    }
}
