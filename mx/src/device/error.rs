//! Device error types

use std::time::Duration;
use thiserror::Error;

/// Errors talking to the device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Device {endpoint} unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Device rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Device protocol error: {0}")]
    Protocol(String),

    #[error("Device timed out after {0:?}")]
    Timeout(Duration),
}

impl DeviceError {
    /// Check if the device could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DeviceError::Unreachable { .. } | DeviceError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unreachable() {
        assert!(DeviceError::Timeout(Duration::from_secs(1)).is_unreachable());
        assert!(
            DeviceError::Unreachable {
                endpoint: "avr.local".to_string(),
                message: "refused".to_string(),
            }
            .is_unreachable()
        );
        assert!(
            !DeviceError::Rejected {
                status: 400,
                message: "bad zone".to_string(),
            }
            .is_unreachable()
        );
    }

    #[test]
    fn test_display() {
        let err = DeviceError::Rejected {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Device rejected request (503): busy");
    }
}
