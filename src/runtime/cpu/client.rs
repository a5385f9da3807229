//! CPU client implementation

use super::device::CpuDevice;
use super::runtime::CpuRuntime;
use crate::runtime::RuntimeClient;

/// CPU client for operation dispatch
///
/// The operation traits in `crate::ops` are implemented on this type; see
/// `crate::ops::cpu` for the implementations.
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
}

impl CpuClient {
    /// Create a new CPU client
    pub fn new(device: CpuDevice) -> Self {
        Self { device }
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) {
        // CPU operations are synchronous, nothing to do
    }
}
