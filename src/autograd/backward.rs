//! Backward pass implementation
//!
//! Implements reverse-mode automatic differentiation using topological sort
//! to traverse the computation graph and accumulate gradients.

use super::{GradFn, GradStore, Var};
use crate::error::{Error, Result};
use crate::ops::TensorOps;
use crate::runtime::{Runtime, RuntimeClient};
use crate::tensor::{Tensor, TensorId};
use std::collections::HashSet;
use std::sync::Arc;

/// Compute gradients of a scalar loss via reverse-mode autodiff
///
/// Seeds the output gradient with 1 and delegates to
/// [`backward_with_grad`].
///
/// # Example
///
/// ```ignore
/// let x = Var::new(Tensor::from_slice(&[2.0f32], &[1], &device), true);
/// let y = Var::new(Tensor::from_slice(&[3.0f32], &[1], &device), true);
/// let z = x.mul(&y, &client)?;
///
/// let grads = backward(&z, &client)?;
/// let grad_x = grads.get(x.id()).unwrap(); // = y = 3.0
/// ```
pub fn backward<R, C>(loss: &Var<R>, client: &C) -> Result<GradStore<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + TensorOps<R>,
{
    if loss.numel() != 1 {
        return Err(Error::shape_mismatch(&[1], loss.shape()));
    }

    let one = Tensor::<R>::try_ones(loss.shape(), loss.tensor().dtype(), loss.tensor().device())?;
    backward_with_grad(loss, &one, client)
}

/// Compute gradients via reverse-mode autodiff with an explicit upstream
/// gradient
///
/// This is the entry point for non-scalar outputs: the caller supplies
/// `grad`, the gradient of some downstream quantity with respect to
/// `output`, with `output`'s shape and dtype. A verification run uses it to
/// push the same random upstream gradient through two implementations of
/// the same operation.
pub fn backward_with_grad<R, C>(
    output: &Var<R>,
    grad: &Tensor<R>,
    client: &C,
) -> Result<GradStore<R>>
where
    R: Runtime,
    C: RuntimeClient<R> + TensorOps<R>,
{
    if grad.shape() != output.shape() {
        return Err(Error::shape_mismatch(output.shape(), grad.shape()));
    }
    if grad.dtype() != output.tensor().dtype() {
        return Err(Error::DTypeMismatch {
            lhs: output.tensor().dtype(),
            rhs: grad.dtype(),
        });
    }
    if !output.requires_grad() {
        return Err(Error::Internal(
            "backward() called on variable that doesn't require grad".into(),
        ));
    }

    let mut grad_store = GradStore::new();
    grad_store.insert(output.id(), grad.clone());

    let topo_order = topological_sort(output);

    // Traverse in reverse topological order (from output to inputs)
    for (var_id, grad_fn_opt, input_ids) in topo_order.into_iter().rev() {
        let grad_output = match grad_store.get(var_id) {
            Some(g) => g.clone(),
            None => continue, // No gradient flowing to this node
        };

        if let Some(grad_fn) = grad_fn_opt {
            let input_grads = grad_fn.backward(&grad_output)?;

            for (input_id, input_grad_opt) in input_ids.iter().zip(input_grads.into_iter()) {
                if let Some(input_grad) = input_grad_opt {
                    grad_store.try_accumulate(*input_id, input_grad, |existing, new| {
                        client.add(&existing, &new)
                    })?;
                }
            }
        }
    }

    Ok(grad_store)
}

/// Entry for topological sort: (var_id, grad_fn, input_ids)
type TopoEntry<R> = (TensorId, Option<Arc<dyn GradFn<R>>>, Vec<TensorId>);

/// Build topological sort of computation graph using DFS post-order traversal
///
/// Returns nodes in topological order (inputs before outputs).
fn topological_sort<R: Runtime>(output: &Var<R>) -> Vec<TopoEntry<R>> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();

    fn dfs<R: Runtime>(
        id: TensorId,
        grad_fn: Option<Arc<dyn GradFn<R>>>,
        visited: &mut HashSet<TensorId>,
        result: &mut Vec<TopoEntry<R>>,
    ) {
        if visited.contains(&id) {
            return;
        }
        visited.insert(id);

        let input_ids: Vec<TensorId> = grad_fn
            .as_ref()
            .map(|gf| gf.inputs().to_vec())
            .unwrap_or_default();

        // Visit inputs first (dependencies), then this node (post-order)
        if let Some(gf) = &grad_fn {
            for (input_id, input_grad_fn) in input_ids.iter().zip(gf.input_grad_fns()) {
                dfs(*input_id, input_grad_fn, visited, result);
            }
        }

        result.push((id, grad_fn, input_ids));
    }

    dfs(
        output.id(),
        output.grad_fn().cloned(),
        &mut visited,
        &mut result,
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    #[test]
    fn test_backward_requires_scalar() {
        let device = CpuDevice::new();
        let client = CpuRuntime::default_client(&device);

        let tensor = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[2], &device);
        let var = Var::new(tensor, true);

        assert!(backward(&var, &client).is_err());
    }

    #[test]
    fn test_backward_leaf_variable() {
        let device = CpuDevice::new();
        let client = CpuRuntime::default_client(&device);

        let tensor = Tensor::<CpuRuntime>::from_slice(&[5.0f32], &[1], &device);
        let var = Var::new(tensor, true);

        let grads = backward(&var, &client).unwrap();

        // Gradient of loss w.r.t. itself is 1
        let grad = grads.get(var.id()).unwrap();
        assert_eq!(grad.to_vec::<f32>(), vec![1.0f32]);
    }

    #[test]
    fn test_backward_with_grad_seeds_output() {
        let device = CpuDevice::new();
        let client = CpuRuntime::default_client(&device);

        let tensor = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[3], &device);
        let var = Var::new(tensor, true);
        let seed = Tensor::<CpuRuntime>::from_slice(&[0.5f64, -1.0, 2.0], &[3], &device);

        let grads = backward_with_grad(&var, &seed, &client).unwrap();
        assert_eq!(
            grads.get(var.id()).unwrap().to_vec::<f64>(),
            vec![0.5, -1.0, 2.0]
        );
    }

    #[test]
    fn test_backward_with_grad_shape_checked() {
        let device = CpuDevice::new();
        let client = CpuRuntime::default_client(&device);

        let tensor = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[2], &device);
        let var = Var::new(tensor, true);
        let bad_seed = Tensor::<CpuRuntime>::from_slice(&[1.0f32], &[1], &device);

        assert!(backward_with_grad(&var, &bad_seed, &client).is_err());
    }
}
