//! Backward (GradFn) implementations for autograd-tracked operations

mod arithmetic;
mod norm;

pub use arithmetic::{AddBackward, MulBackward, SubBackward};
pub use norm::{RmsNormBackward, RmsNormRefBackward};
