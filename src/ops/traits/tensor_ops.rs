//! Element-wise arithmetic operations trait.

use crate::error::Result;
use crate::runtime::Runtime;
use crate::tensor::Tensor;

/// Element-wise arithmetic operations
///
/// Binary operations require operands of identical shape and dtype.
pub trait TensorOps<R: Runtime> {
    /// Element-wise addition: `a + b`
    fn add(&self, a: &Tensor<R>, b: &Tensor<R>) -> Result<Tensor<R>>;

    /// Element-wise subtraction: `a - b`
    fn sub(&self, a: &Tensor<R>, b: &Tensor<R>) -> Result<Tensor<R>>;

    /// Element-wise multiplication: `a * b`
    fn mul(&self, a: &Tensor<R>, b: &Tensor<R>) -> Result<Tensor<R>>;

    /// Element-wise absolute value: `|a|`
    fn abs(&self, a: &Tensor<R>) -> Result<Tensor<R>>;

    /// Element-wise negation: `-a`
    fn neg(&self, a: &Tensor<R>) -> Result<Tensor<R>>;
}
