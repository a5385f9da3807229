//! CPU implementation of reduction operations.

use crate::error::Result;
use crate::ops::{ReduceOp, ReduceOps};
use crate::runtime::cpu::{helpers::reduce_all_impl, CpuClient, CpuRuntime};
use crate::tensor::Tensor;

impl ReduceOps<CpuRuntime> for CpuClient {
    fn sum(&self, a: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        reduce_all_impl(self, ReduceOp::Sum, a, "sum")
    }

    fn mean(&self, a: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        reduce_all_impl(self, ReduceOp::Mean, a, "mean")
    }

    fn max(&self, a: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        reduce_all_impl(self, ReduceOp::Max, a, "max")
    }
}
