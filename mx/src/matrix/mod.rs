//! Matrix configuration values and their on-disk store
//!
//! A configuration is a flat mapping of routing setting to value, stored as
//! YAML under a `mapping` key. Two configurations are compared with
//! [`MatrixConfig::diff`]; an empty diff means they are identical.

mod config;
mod error;
mod store;

pub use config::{Change, MatrixConfig, MatrixDiff};
pub use error::ParseError;
pub use store::ConfigStore;
