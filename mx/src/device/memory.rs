//! MemoryDevice - in-process matrix
//!
//! Holds the matrix in memory, with optional injected failures and write
//! latency. Clones share the same device.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{DeviceClient, DeviceError};
use crate::matrix::MatrixConfig;

#[derive(Debug, Default)]
struct MemoryState {
    config: MatrixConfig,
    read_error: Option<DeviceError>,
    write_error: Option<DeviceError>,
    write_delay: Duration,
    write_attempts: usize,
    max_in_flight: usize,
}

/// Counts one write in progress; released even if the write is dropped mid-flight
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> (Self, usize) {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (Self(counter.clone()), now)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Device whose matrix lives in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    state: Arc<Mutex<MemoryState>>,
    in_flight: Arc<AtomicUsize>,
}

impl MemoryDevice {
    pub fn new(config: MatrixConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                config,
                ..Default::default()
            })),
            in_flight: Arc::default(),
        }
    }

    /// Current matrix, bypassing any injected read error
    pub async fn config(&self) -> MatrixConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn set_config(&self, config: MatrixConfig) {
        self.state.lock().await.config = config;
    }

    /// Make every read fail with `error` (`None` restores reads)
    pub async fn fail_reads(&self, error: Option<DeviceError>) {
        self.state.lock().await.read_error = error;
    }

    /// Make every write fail with `error` (`None` restores writes)
    pub async fn fail_writes(&self, error: Option<DeviceError>) {
        self.state.lock().await.write_error = error;
    }

    /// Delay each write by `delay` before it takes effect
    pub async fn set_write_delay(&self, delay: Duration) {
        self.state.lock().await.write_delay = delay;
    }

    /// Number of writes started, successful or not
    pub async fn write_attempts(&self) -> usize {
        self.state.lock().await.write_attempts
    }

    /// Writes currently in progress
    pub fn writes_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of writes ever in progress at once
    pub async fn max_concurrent_writes(&self) -> usize {
        self.state.lock().await.max_in_flight
    }
}

#[async_trait]
impl DeviceClient for MemoryDevice {
    fn endpoint(&self) -> String {
        "memory".to_string()
    }

    async fn read_matrix_config(&self) -> Result<MatrixConfig, DeviceError> {
        debug!("MemoryDevice::read_matrix_config: called");
        let state = self.state.lock().await;
        match &state.read_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.config.clone()),
        }
    }

    async fn write_matrix_config(&self, config: &MatrixConfig) -> Result<(), DeviceError> {
        debug!(settings = config.len(), "MemoryDevice::write_matrix_config: called");
        let (_guard, now) = InFlight::enter(&self.in_flight);
        let delay = {
            let mut state = self.state.lock().await;
            state.write_attempts += 1;
            state.max_in_flight = state.max_in_flight.max(now);
            state.write_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if let Some(e) = &state.write_error {
            return Err(e.clone());
        }
        state.config = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let device = MemoryDevice::default();
        let config = MatrixConfig::from_pairs([("zone1", "HD1")]);

        device.write_matrix_config(&config).await.unwrap();
        assert_eq!(device.read_matrix_config().await.unwrap(), config);
        assert_eq!(device.write_attempts().await, 1);
        assert_eq!(device.max_concurrent_writes().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let original = MatrixConfig::from_pairs([("zone1", "HD1")]);
        let device = MemoryDevice::new(original.clone());
        let refused = DeviceError::Rejected {
            status: 409,
            message: "locked".to_string(),
        };

        device.fail_writes(Some(refused.clone())).await;
        let err = device
            .write_matrix_config(&MatrixConfig::from_pairs([("zone1", "OFF")]))
            .await
            .unwrap_err();
        assert_eq!(err, refused);
        assert_eq!(device.config().await, original);

        device.fail_reads(Some(DeviceError::Timeout(Duration::from_secs(1)))).await;
        assert!(device.read_matrix_config().await.is_err());
        device.fail_reads(None).await;
        assert_eq!(device.read_matrix_config().await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_abandoned_write_releases_in_flight_slot() {
        let device = MemoryDevice::default();
        device.set_write_delay(Duration::from_secs(30)).await;

        let config = MatrixConfig::from_pairs([("zone1", "HD1")]);
        let abandoned = tokio::time::timeout(Duration::from_millis(50), device.write_matrix_config(&config)).await;
        assert!(abandoned.is_err());
        assert_eq!(device.writes_in_flight(), 0);
        assert_eq!(device.config().await, MatrixConfig::default());

        device.set_write_delay(Duration::ZERO).await;
        device.write_matrix_config(&config).await.unwrap();
        assert_eq!(device.write_attempts().await, 2);
        assert_eq!(device.max_concurrent_writes().await, 1);
        assert_eq!(device.writes_in_flight(), 0);
    }
}
