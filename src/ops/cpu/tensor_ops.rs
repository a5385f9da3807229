//! CPU implementation of element-wise arithmetic operations.

use crate::error::Result;
use crate::ops::{BinaryOp, TensorOps};
use crate::runtime::cpu::{
    helpers::{binary_op_impl, unary_op_impl, UnaryKind},
    CpuClient, CpuRuntime,
};
use crate::tensor::Tensor;

impl TensorOps<CpuRuntime> for CpuClient {
    fn add(&self, a: &Tensor<CpuRuntime>, b: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        binary_op_impl(self, BinaryOp::Add, a, b, "add")
    }

    fn sub(&self, a: &Tensor<CpuRuntime>, b: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        binary_op_impl(self, BinaryOp::Sub, a, b, "sub")
    }

    fn mul(&self, a: &Tensor<CpuRuntime>, b: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        binary_op_impl(self, BinaryOp::Mul, a, b, "mul")
    }

    fn abs(&self, a: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        unary_op_impl(self, UnaryKind::Abs, a, "abs")
    }

    fn neg(&self, a: &Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>> {
        unary_op_impl(self, UnaryKind::Neg, a, "neg")
    }
}

#[cfg(test)]
mod tests {
    use crate::ops::TensorOps;
    use crate::runtime::cpu::CpuRuntime;
    use crate::runtime::Runtime;
    use crate::tensor::Tensor;

    #[test]
    fn test_add_sub_mul() {
        let device = CpuRuntime::default_device();
        let client = CpuRuntime::default_client(&device);

        let a = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0], &[3], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[4.0f32, 5.0, 6.0], &[3], &device);

        assert_eq!(client.add(&a, &b).unwrap().to_vec::<f32>(), [5.0, 7.0, 9.0]);
        assert_eq!(
            client.sub(&a, &b).unwrap().to_vec::<f32>(),
            [-3.0, -3.0, -3.0]
        );
        assert_eq!(
            client.mul(&a, &b).unwrap().to_vec::<f32>(),
            [4.0, 10.0, 18.0]
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let device = CpuRuntime::default_device();
        let client = CpuRuntime::default_client(&device);

        let a = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[2], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0], &[3], &device);
        assert!(client.add(&a, &b).is_err());
    }

    #[test]
    fn test_dtype_mismatch_rejected() {
        let device = CpuRuntime::default_device();
        let client = CpuRuntime::default_client(&device);

        let a = Tensor::<CpuRuntime>::from_slice(&[1.0f32, 2.0], &[2], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2], &device);
        assert!(client.mul(&a, &b).is_err());
    }

    #[test]
    fn test_abs_on_transposed_view() {
        let device = CpuRuntime::default_device();
        let client = CpuRuntime::default_client(&device);

        let a = Tensor::<CpuRuntime>::from_slice(
            &[-1.0f64, 2.0, -3.0, 4.0, -5.0, 6.0],
            &[2, 3],
            &device,
        );
        let at = a.transpose(0, 1).unwrap();
        let out = client.abs(&at).unwrap();
        assert_eq!(out.shape(), &[3, 2]);
        assert_eq!(out.to_vec::<f64>(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
