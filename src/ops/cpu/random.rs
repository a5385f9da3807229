//! CPU implementation of random sampling operations.

use crate::dtype::DType;
use crate::error::Result;
use crate::ops::RandomOps;
use crate::runtime::cpu::{helpers::dispatch_dtype, kernels, CpuClient, CpuRuntime};
use crate::tensor::Tensor;

impl RandomOps<CpuRuntime> for CpuClient {
    fn randn(&self, shape: &[usize], dtype: DType) -> Result<Tensor<CpuRuntime>> {
        let out = Tensor::<CpuRuntime>::try_empty(shape, dtype, &self.device)?;
        let len = out.numel();
        let out_ptr = out.storage().ptr();

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::randn_kernel::<T>(out_ptr as *mut T, len);
            }
        }, "randn");

        Ok(out)
    }

    fn randn_seeded(&self, shape: &[usize], dtype: DType, seed: u64) -> Result<Tensor<CpuRuntime>> {
        let out = Tensor::<CpuRuntime>::try_empty(shape, dtype, &self.device)?;
        let len = out.numel();
        let out_ptr = out.storage().ptr();

        dispatch_dtype!(dtype, T => {
            unsafe {
                kernels::randn_seeded_kernel::<T>(out_ptr as *mut T, len, seed);
            }
        }, "randn_seeded");

        Ok(out)
    }
}
