//! DeviceClient trait definition

use async_trait::async_trait;

use super::DeviceError;
use crate::matrix::MatrixConfig;

/// Read/write access to one device's matrix configuration
///
/// Implementations hold no per-call state; the manager guarantees at most one
/// write is in flight, reads may overlap a write.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Human-readable endpoint for logs and messages
    fn endpoint(&self) -> String;

    /// Read the live matrix configuration
    async fn read_matrix_config(&self) -> Result<MatrixConfig, DeviceError>;

    /// Replace the live matrix configuration
    async fn write_matrix_config(&self, config: &MatrixConfig) -> Result<(), DeviceError>;
}
