//! Config manager messages
//!
//! Message enums for the manager and uploader actors, plus the values they
//! hand back to callers.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::actor::{ActorError, ActorMonitor, Reply};
use crate::device::DeviceError;
use crate::matrix::{MatrixConfig, ParseError};

/// Errors from config manager operations
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Upload progress as seen by callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub is_uploading: bool,
    /// Reason of the most recent failed upload; cleared when a new upload is accepted
    pub last_error: Option<String>,
}

/// Answer to an upload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRequest {
    /// The upload was started
    Accepted,
    /// Another upload is in flight; nothing changed
    Busy,
}

impl fmt::Display for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadRequest::Accepted => write!(f, "accepted"),
            UploadRequest::Busy => write!(f, "busy"),
        }
    }
}

/// Result of one upload attempt, reported by the uploader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Done { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

/// Where the device's current configuration was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Stored(PathBuf),
    Unknown,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Stored(path) => write!(f, "{}", path.display()),
            ConfigSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// Stored configuration matching the device, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentConfig {
    pub config: Option<MatrixConfig>,
    pub source: ConfigSource,
}

impl CurrentConfig {
    pub fn matched(config: MatrixConfig, path: PathBuf) -> Self {
        Self {
            config: Some(config),
            source: ConfigSource::Stored(path),
        }
    }

    pub fn unknown() -> Self {
        Self {
            config: None,
            source: ConfigSource::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self.source, ConfigSource::Stored(_))
    }
}

/// Messages handled by the ConfigManager actor
pub enum ManagerMsg {
    // Calls
    ListConfigurations {
        reply: Reply<Result<Vec<PathBuf>, ParseError>>,
    },
    GetCurrentMatrixConfig {
        reply: Reply<Result<CurrentConfig, ManagerError>>,
    },
    GetUploadState {
        reply: Reply<UploadState>,
    },
    Upload {
        path: PathBuf,
        reply: Reply<UploadRequest>,
    },
    MonitorUploader {
        reply: Reply<ActorMonitor>,
    },

    // Casts from the uploader
    UploadFinished(UploadOutcome),
}

/// Messages handled by the ConfigUploader actor
#[derive(Debug)]
pub enum UploaderMsg {
    Upload { path: PathBuf },
}
