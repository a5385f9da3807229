//! Automatic differentiation (autograd)
//!
//! Reverse-mode automatic differentiation for tensor computations. A
//! [`Var`] wraps a tensor and records how it was produced; calling
//! [`backward`] (or [`backward_with_grad`] for non-scalar outputs) walks the
//! recorded graph in reverse topological order and accumulates gradients
//! into a [`GradStore`].

mod backward;
mod grad_fn;
mod grad_store;
mod var;
mod var_ops;

pub mod ops;

pub use backward::{backward, backward_with_grad};
pub use grad_fn::GradFn;
pub use grad_store::GradStore;
pub use var::Var;
pub use var_ops::{var_add, var_mul, var_rms_norm, var_rms_norm_reference, var_sub};
