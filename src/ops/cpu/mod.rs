//! CPU implementations of the operation traits

mod normalization;
mod random;
mod reduce;
mod tensor_ops;
