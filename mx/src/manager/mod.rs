//! Matrix configuration manager
//!
//! [`ConfigManager`] is an actor that owns the upload state and one
//! [`ConfigUploader`] child. Uploads are accepted synchronously and performed
//! by the uploader in the background; the outcome is cast back to the manager.
//!
//! ```text
//! caller --call--> ConfigManager --cast--> ConfigUploader --> DeviceClient
//!                        ^                       |
//!                        +------ UploadFinished -+
//! ```
//!
//! Callers use [`ConfigManagerHandle`] rather than raw messages.

mod config_manager;
mod handle;
mod messages;
mod uploader;

pub use config_manager::{ConfigManager, ManagerArgs};
pub use handle::ConfigManagerHandle;
pub use messages::{
    ConfigSource, CurrentConfig, ManagerError, ManagerMsg, UploadOutcome, UploadRequest, UploadState, UploaderMsg,
};
pub use uploader::{ConfigUploader, UploaderArgs};
