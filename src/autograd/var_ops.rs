//! Graph-building operations on [`Var`]
//!
//! Each function runs the forward computation through the client and, when
//! any input requires gradients, attaches the matching `GradFn` so the
//! backward pass can replay the operation in reverse.

use super::ops::{AddBackward, MulBackward, RmsNormBackward, RmsNormRefBackward, SubBackward};
use super::Var;
use crate::error::Result;
use crate::ops::{NormalizationOps, TensorOps};
use crate::runtime::{Runtime, RuntimeClient};
use std::sync::Arc;

/// Element-wise addition of two variables
pub fn var_add<R, C>(client: &C, a: &Var<R>, b: &Var<R>) -> Result<Var<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + TensorOps<R>,
    R::Client: TensorOps<R>,
{
    let out = client.add(a.tensor(), b.tensor())?;

    if !a.requires_grad() && !b.requires_grad() {
        return Ok(Var::new(out, false));
    }

    let grad_fn = AddBackward::new(
        a.id(),
        b.id(),
        a.grad_fn().cloned(),
        b.grad_fn().cloned(),
    );
    Ok(Var::from_op(out, Arc::new(grad_fn)))
}

/// Element-wise subtraction of two variables
pub fn var_sub<R, C>(client: &C, a: &Var<R>, b: &Var<R>) -> Result<Var<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + TensorOps<R>,
    R::Client: TensorOps<R>,
{
    let out = client.sub(a.tensor(), b.tensor())?;

    if !a.requires_grad() && !b.requires_grad() {
        return Ok(Var::new(out, false));
    }

    let grad_fn = SubBackward::new(
        a.id(),
        b.id(),
        a.grad_fn().cloned(),
        b.grad_fn().cloned(),
    );
    Ok(Var::from_op(out, Arc::new(grad_fn)))
}

/// Element-wise multiplication of two variables
pub fn var_mul<R, C>(client: &C, a: &Var<R>, b: &Var<R>) -> Result<Var<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + TensorOps<R>,
    R::Client: TensorOps<R>,
{
    let out = client.mul(a.tensor(), b.tensor())?;

    if !a.requires_grad() && !b.requires_grad() {
        return Ok(Var::new(out, false));
    }

    let grad_fn = MulBackward::new(
        a.id(),
        b.id(),
        a.tensor().clone(),
        b.tensor().clone(),
        a.grad_fn().cloned(),
        b.grad_fn().cloned(),
    );
    Ok(Var::from_op(out, Arc::new(grad_fn)))
}

/// Fused RMS normalization of a variable over its last dimension
///
/// Saves the per-row rstd from the forward so the backward does not have to
/// recompute it.
pub fn var_rms_norm<R, C>(
    client: &C,
    input: &Var<R>,
    weight: Option<&Var<R>>,
    eps: f32,
) -> Result<Var<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + NormalizationOps<R>,
    R::Client: NormalizationOps<R>,
{
    let weight_tensor = weight.map(|w| w.tensor());
    let needs_grad =
        input.requires_grad() || weight.is_some_and(|w| w.requires_grad());

    if !needs_grad {
        let out = client.rms_norm(input.tensor(), weight_tensor, eps)?;
        return Ok(Var::new(out, false));
    }

    let (out, rstd) = client.rms_norm_with_rstd(input.tensor(), weight_tensor, eps)?;

    let mut input_ids = vec![input.id()];
    let mut input_grad_fns = vec![input.grad_fn().cloned()];
    if let Some(w) = weight {
        input_ids.push(w.id());
        input_grad_fns.push(w.grad_fn().cloned());
    }

    let grad_fn = RmsNormBackward::new(
        input_ids,
        input_grad_fns,
        input.tensor().clone(),
        weight.map(|w| w.tensor().clone()),
        rstd,
        input.requires_grad(),
        weight.is_some_and(|w| w.requires_grad()),
    );
    Ok(Var::from_op(out, Arc::new(grad_fn)))
}

/// Reference RMS normalization of a variable (f64 accumulation)
pub fn var_rms_norm_reference<R, C>(
    client: &C,
    input: &Var<R>,
    weight: Option<&Var<R>>,
    eps: f32,
) -> Result<Var<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + NormalizationOps<R>,
    R::Client: NormalizationOps<R>,
{
    let weight_tensor = weight.map(|w| w.tensor());
    let out = client.rms_norm_reference(input.tensor(), weight_tensor, eps)?;

    let needs_grad =
        input.requires_grad() || weight.is_some_and(|w| w.requires_grad());
    if !needs_grad {
        return Ok(Var::new(out, false));
    }

    let mut input_ids = vec![input.id()];
    let mut input_grad_fns = vec![input.grad_fn().cloned()];
    if let Some(w) = weight {
        input_ids.push(w.id());
        input_grad_fns.push(w.grad_fn().cloned());
    }

    let grad_fn = RmsNormRefBackward::new(
        input_ids,
        input_grad_fns,
        input.tensor().clone(),
        weight.map(|w| w.tensor().clone()),
        eps,
        input.requires_grad(),
        weight.is_some_and(|w| w.requires_grad()),
    );
    Ok(Var::from_op(out, Arc::new(grad_fn)))
}
