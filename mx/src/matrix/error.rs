//! Configuration file errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading, parsing or writing configuration files
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration directory {}: {message}", .path.display())]
    Pattern { path: PathBuf, message: String },
}

impl ParseError {
    /// Path of the file or directory the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            ParseError::Io { path, .. } => path,
            ParseError::Yaml { path, .. } => path,
            ParseError::Pattern { path, .. } => path,
        }
    }
}
