//! Gradient storage and accumulation

use crate::error::Result;
use crate::runtime::Runtime;
use crate::tensor::{Tensor, TensorId};
use std::collections::HashMap;

/// Storage for gradients computed during backward pass
///
/// Gradients are stored by tensor ID and accumulated when a tensor
/// is used multiple times in the computation graph.
pub struct GradStore<R: Runtime> {
    grads: HashMap<TensorId, Tensor<R>>,
}

impl<R: Runtime> GradStore<R> {
    /// Create a new empty gradient store
    pub fn new() -> Self {
        Self {
            grads: HashMap::new(),
        }
    }

    /// Get the gradient for a tensor
    pub fn get(&self, id: TensorId) -> Option<&Tensor<R>> {
        self.grads.get(&id)
    }

    /// Insert a gradient (overwrites if exists)
    pub fn insert(&mut self, id: TensorId, grad: Tensor<R>) {
        self.grads.insert(id, grad);
    }

    /// Check if a gradient exists
    pub fn contains(&self, id: TensorId) -> bool {
        self.grads.contains_key(&id)
    }

    /// Remove and return a gradient
    pub fn remove(&mut self, id: TensorId) -> Option<Tensor<R>> {
        self.grads.remove(&id)
    }

    /// Number of stored gradients
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Clear all gradients
    pub fn clear(&mut self) {
        self.grads.clear();
    }

    /// Accumulate a gradient for a tensor
    ///
    /// Stores the gradient if none exists yet; otherwise sums it with the
    /// existing one via `add_fn`. Summing is the chain rule for a tensor
    /// used multiple times in the graph.
    pub fn try_accumulate<F>(&mut self, id: TensorId, grad: Tensor<R>, add_fn: F) -> Result<()>
    where
        F: FnOnce(Tensor<R>, Tensor<R>) -> Result<Tensor<R>>,
    {
        if let Some(existing) = self.grads.remove(&id) {
            let accumulated = add_fn(existing, grad)?;
            self.grads.insert(id, accumulated);
        } else {
            self.grads.insert(id, grad);
        }
        Ok(())
    }
}

impl<R: Runtime> Default for GradStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
