//! Audiomatrix - audio matrix configuration manager
//!
//! Keeps a directory of named matrix configurations, reports which one a
//! device is currently running, and uploads configurations to the device one
//! at a time in the background.
//!
//! # Modules
//!
//! - [`actor`] - Minimal actor runtime: mailboxes, call/cast, supervision
//! - [`matrix`] - Matrix configurations and the on-disk store
//! - [`device`] - Device client trait, HTTP bridge and in-memory device
//! - [`manager`] - ConfigManager and ConfigUploader actors
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod actor;
pub mod cli;
pub mod config;
pub mod device;
pub mod manager;
pub mod matrix;

pub use actor::{Actor, ActorError, ActorId, ActorMonitor, ActorRef, ActorStatus, Context, spawn};
pub use config::Config;
pub use device::{DeviceClient, DeviceError, HttpDeviceClient, MemoryDevice};
pub use manager::{ConfigManagerHandle, ConfigSource, CurrentConfig, ManagerError, UploadRequest, UploadState};
pub use matrix::{ConfigStore, MatrixConfig, MatrixDiff, ParseError};
