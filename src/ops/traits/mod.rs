//! Operation trait definitions

mod normalization;
mod random;
mod reduce;
mod tensor_ops;

pub use normalization::NormalizationOps;
pub use random::RandomOps;
pub use reduce::ReduceOps;
pub use tensor_ops::TensorOps;
