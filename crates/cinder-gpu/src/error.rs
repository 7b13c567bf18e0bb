//! GPU error types.

use crate::device::DeviceError;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Error reported by the device collaborator.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Resource or heap creation failed.
    #[error("creation failed: {0}")]
    Creation(String),

    /// Invalid argument (bad handle, out-of-range offset, kind mismatch).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation invoked in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Mapping an inaccessible resource or an out-of-range byte range.
    #[error("map failed: {0}")]
    Map(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
