//! Error types for the Orbit engine
//!
//! This module defines the error types used throughout the engine,
//! covering setup, admission, bounds/schema and completion failures.

use std::fmt;
use std::time::Duration;

/// Result type for Orbit engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orbit engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (wrong storage class, unknown handle, etc.)
    InvalidResource(String),

    /// Initialization failed (configuration, geometry, argument table, ring)
    InitializationFailed(String),

    /// Admission wait exceeded its deadline: the device stopped completing work
    DeviceHang {
        /// How long the producer waited before giving up
        waited: Duration,
    },

    /// Index or byte range outside the valid range of a resource
    OutOfBounds {
        /// Offending index (or end of the offending byte range)
        index: u64,
        /// Valid length of the resource
        len: u64,
    },

    /// Argument table referenced with a slot its schema does not define
    SchemaViolation(String),

    /// Frame slot written outside its claim window
    SlotNotClaimed(usize),

    /// A completion notification was lost and a permit is gone for good
    LostCompletion,

    /// The frame reached the queue but could not be presented
    PresentFailed(String),
}

impl Error {
    /// Whether the error invalidates the pipeline instance it came from.
    ///
    /// Setup failures and lost completions cannot be recovered from locally.
    /// A device hang only aborts the current tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InitializationFailed(_) | Error::OutOfMemory | Error::LostCompletion
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceHang { waited } => {
                write!(f, "Device hang: no frame completed within {:?}", waited)
            }
            Error::OutOfBounds { index, len } => {
                write!(f, "Out of bounds: index {} (length {})", index, len)
            }
            Error::SchemaViolation(msg) => write!(f, "Schema violation: {}", msg),
            Error::SlotNotClaimed(slot) => write!(f, "Frame slot {} is not claimed", slot),
            Error::LostCompletion => {
                write!(f, "Lost completion: admission capacity permanently reduced")
            }
            Error::PresentFailed(msg) => write!(f, "Present failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
