//! Reduction operations trait.

use crate::error::Result;
use crate::runtime::Runtime;
use crate::tensor::Tensor;

/// Reductions over all elements of a tensor
///
/// Each operation returns a scalar (0-dimensional) tensor of the input's
/// dtype. Sum and mean accumulate in f64 internally, so reductions over
/// half-precision tensors do not drift.
pub trait ReduceOps<R: Runtime> {
    /// Sum of all elements
    fn sum(&self, a: &Tensor<R>) -> Result<Tensor<R>>;

    /// Arithmetic mean of all elements
    fn mean(&self, a: &Tensor<R>) -> Result<Tensor<R>>;

    /// Maximum element
    fn max(&self, a: &Tensor<R>) -> Result<Tensor<R>>;
}
