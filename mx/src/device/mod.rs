//! Device access
//!
//! [`DeviceClient`] is the seam between the configuration manager and the
//! audio matrix hardware. [`HttpDeviceClient`] talks to a JSON bridge in front
//! of the device; [`MemoryDevice`] keeps the matrix in process.

mod client;
mod error;
mod http;
mod memory;

pub use client::DeviceClient;
pub use error::DeviceError;
pub use http::HttpDeviceClient;
pub use memory::MemoryDevice;
