//! Runtime backends for tensor computation
//!
//! This module defines the `Runtime` trait and the CPU implementation.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific compute unit)
//! └── Client (dispatches operations)
//! ```
//!
//! Operations are defined as traits in `crate::ops` and implemented on the
//! runtime's client type, so the normalization layers and the parity harness
//! are generic over the backend.

pub mod cpu;

use crate::error::Result;

/// Core trait for compute backends
///
/// `Runtime` abstracts over compute devices. It uses static dispatch via
/// generics for zero-cost abstraction.
///
/// # Associated Types
///
/// - `Device`: Identifies a specific compute unit
/// - `Client`: Handles operation dispatch and synchronization
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching operations
    type Client: RuntimeClient<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate device memory
    ///
    /// Returns a device pointer (u64) that can be used for operations.
    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64>;

    /// Deallocate device memory
    fn deallocate(ptr: u64, size_bytes: usize, device: &Self::Device);

    /// Copy data from host to device
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device);

    /// Copy data from device to host
    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device);

    /// Copy strided data to a contiguous buffer
    ///
    /// This is how a non-contiguous tensor is made contiguous.
    ///
    /// # Parameters
    /// - `src_ptr`: Source buffer pointer
    /// - `src_byte_offset`: Byte offset into the source buffer
    /// - `dst_ptr`: Destination buffer pointer
    /// - `shape`: Shape of the tensor
    /// - `strides`: Strides of the source tensor (in elements, not bytes)
    /// - `elem_size`: Size of each element in bytes
    fn copy_strided(
        src_ptr: u64,
        src_byte_offset: usize,
        dst_ptr: u64,
        shape: &[usize],
        strides: &[isize],
        elem_size: usize,
        device: &Self::Device,
    );

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the default client for a device
    fn default_client(device: &Self::Device) -> Self::Client;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle operation dispatch
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Synchronize: wait for all pending operations to complete
    fn synchronize(&self);
}
