//! HttpDeviceClient - JSON bridge client
//!
//! `GET {base}{matrix-path}` returns the live [`MatrixConfig`] as JSON and
//! `PUT` of the same shape replaces it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{DeviceClient, DeviceError};
use crate::config::DeviceConfig;
use crate::matrix::MatrixConfig;

/// Device client bound to one host
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    host: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDeviceClient {
    /// Build a client for `host` (`name`, `name:port` or a full base URL)
    pub fn new(host: &str, config: &DeviceConfig) -> Result<Self, DeviceError> {
        debug!(%host, "HttpDeviceClient::new: called");
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Protocol(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            host: host.to_string(),
            url: matrix_url(host, config),
            timeout,
            client,
        })
    }

    /// Full URL of the matrix resource
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_error(&self, e: reqwest::Error) -> DeviceError {
        if e.is_timeout() {
            DeviceError::Timeout(self.timeout)
        } else if e.is_decode() {
            DeviceError::Protocol(format!("Invalid matrix payload: {}", e))
        } else {
            DeviceError::Unreachable {
                endpoint: self.host.clone(),
                message: e.to_string(),
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DeviceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(DeviceError::Rejected {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                message
            },
        })
    }
}

fn matrix_url(host: &str, config: &DeviceConfig) -> String {
    let base = if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("{}://{}", config.scheme, host.trim_end_matches('/'))
    };
    let path = config.matrix_path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn read_matrix_config(&self) -> Result<MatrixConfig, DeviceError> {
        debug!(url = %self.url, "HttpDeviceClient::read_matrix_config: called");
        let response = self.client.get(&self.url).send().await.map_err(|e| self.map_error(e))?;
        let response = Self::check_status(response).await?;
        response.json::<MatrixConfig>().await.map_err(|e| self.map_error(e))
    }

    async fn write_matrix_config(&self, config: &MatrixConfig) -> Result<(), DeviceError> {
        debug!(url = %self.url, settings = config.len(), "HttpDeviceClient::write_matrix_config: called");
        let response = self
            .client
            .put(&self.url)
            .json(config)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        Self::check_status(response).await?;
        Ok(())
    }
}
