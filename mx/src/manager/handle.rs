//! ConfigManagerHandle - typed client API for the config manager

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::config_manager::{ConfigManager, ManagerArgs};
use super::messages::{CurrentConfig, ManagerError, ManagerMsg, UploadRequest, UploadState};
use crate::actor::{ActorError, ActorId, ActorMonitor, ActorRef, ActorStatus, spawn};
use crate::device::DeviceClient;
use crate::matrix::ConfigStore;

/// Handle for talking to a running [`ConfigManager`]
///
/// Cloning is cheap. The manager terminates once [`terminate`](Self::terminate)
/// is called or the last handle is dropped.
#[derive(Clone, Debug)]
pub struct ConfigManagerHandle {
    actor: ActorRef<ConfigManager>,
}

impl ConfigManagerHandle {
    /// Spawn a manager (and its uploader) bound to `client` and `store`
    pub async fn spawn(client: Arc<dyn DeviceClient>, store: ConfigStore) -> Result<Self, ActorError> {
        debug!(endpoint = %client.endpoint(), "ConfigManagerHandle::spawn: called");
        let actor = spawn::<ConfigManager>(ManagerArgs { client, store }).await?;
        Ok(Self { actor })
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    pub fn status(&self) -> ActorStatus {
        self.actor.status()
    }

    /// Observer of the manager's lifecycle
    pub fn monitor(&self) -> ActorMonitor {
        self.actor.monitor()
    }

    /// Paths of every stored configuration
    pub async fn list_configurations(&self) -> Result<Vec<PathBuf>, ManagerError> {
        debug!("list_configurations: called");
        Ok(self.actor.call(|reply| ManagerMsg::ListConfigurations { reply }).await??)
    }

    /// Stored configuration the device currently runs, or unknown
    pub async fn get_current_matrix_config(&self) -> Result<CurrentConfig, ManagerError> {
        debug!("get_current_matrix_config: called");
        self.actor
            .call(|reply| ManagerMsg::GetCurrentMatrixConfig { reply })
            .await?
    }

    pub async fn get_upload_state(&self) -> Result<UploadState, ActorError> {
        self.actor.call(|reply| ManagerMsg::GetUploadState { reply }).await
    }

    /// Ask for `path` to be uploaded; returns immediately
    pub async fn upload(&self, path: impl Into<PathBuf>) -> Result<UploadRequest, ActorError> {
        let path = path.into();
        debug!(path = %path.display(), "upload: called");
        self.actor.call(|reply| ManagerMsg::Upload { path, reply }).await
    }

    /// Observer of the uploader child's lifecycle
    pub async fn uploader_monitor(&self) -> Result<ActorMonitor, ActorError> {
        self.actor.call(|reply| ManagerMsg::MonitorUploader { reply }).await
    }

    /// Poll the upload state until no upload is in flight
    pub async fn wait_for_upload(&self, poll_interval: Duration) -> Result<UploadState, ActorError> {
        debug!(?poll_interval, "wait_for_upload: called");
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let state = self.get_upload_state().await?;
            if !state.is_uploading {
                return Ok(state);
            }
        }
    }

    /// Stop the manager and its uploader, abandoning any in-flight upload
    pub async fn terminate(&self) {
        debug!("terminate: called");
        self.actor.terminate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::matrix::MatrixConfig;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    const POLL: Duration = Duration::from_millis(10);

    async fn handle_for(device: &MemoryDevice, root: &std::path::Path) -> ConfigManagerHandle {
        ConfigManagerHandle::spawn(Arc::new(device.clone()), ConfigStore::new(root))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_wait_for_upload_returns_final_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("movie.yml");
        fs::write(&path, "mapping:\n  zone1: HD2\n").unwrap();

        let device = MemoryDevice::default();
        device.set_write_delay(Duration::from_millis(50)).await;
        let handle = handle_for(&device, temp.path()).await;

        assert_eq!(handle.upload(&path).await.unwrap(), UploadRequest::Accepted);
        let state = handle.wait_for_upload(POLL).await.unwrap();
        assert_eq!(state, UploadState::default());
        assert_eq!(device.config().await, MatrixConfig::from_pairs([("zone1", "HD2")]));

        handle.terminate().await;
    }

    #[tokio::test]
    async fn test_sequential_uploads_never_overlap() {
        let temp = tempdir().unwrap();
        for (name, source) in [("a.yml", "HD1"), ("b.yml", "HD2"), ("c.yml", "HD3")] {
            fs::write(temp.path().join(name), format!("mapping:\n  zone1: {}\n", source)).unwrap();
        }

        let device = MemoryDevice::default();
        device.set_write_delay(Duration::from_millis(100)).await;
        let handle = handle_for(&device, temp.path()).await;

        for name in ["a.yml", "b.yml", "c.yml"] {
            assert_eq!(handle.upload(name).await.unwrap(), UploadRequest::Accepted);
            // Hammer the manager while the upload runs
            assert_eq!(handle.upload(name).await.unwrap(), UploadRequest::Busy);
            handle.wait_for_upload(POLL).await.unwrap();
        }

        assert_eq!(device.write_attempts().await, 3);
        assert_eq!(device.max_concurrent_writes().await, 1);
        assert_eq!(device.config().await, MatrixConfig::from_pairs([("zone1", "HD3")]));

        handle.terminate().await;
    }

    #[tokio::test]
    async fn test_calls_after_terminate_fail() {
        let temp = tempdir().unwrap();
        let handle = handle_for(&MemoryDevice::default(), temp.path()).await;
        let uploader = handle.uploader_monitor().await.unwrap();

        handle.terminate().await;
        assert_eq!(handle.status(), ActorStatus::Terminated);
        assert!(uploader.is_terminated());
        assert!(handle.get_upload_state().await.unwrap_err().is_terminated());
        assert!(matches!(
            handle.list_configurations().await,
            Err(ManagerError::Actor(ActorError::Terminated(_)))
        ));
    }

    #[tokio::test]
    async fn test_dropping_last_handle_terminates_manager() {
        let temp = tempdir().unwrap();
        let handle = handle_for(&MemoryDevice::default(), temp.path()).await;
        let mut manager = handle.monitor();
        let mut uploader = handle.uploader_monitor().await.unwrap();

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), manager.wait_terminated())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), uploader.wait_terminated())
            .await
            .unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        // While an upload is in flight, every further request is Busy and
        // leaves the state untouched.
        #[test]
        fn prop_busy_while_uploading(extra in 1usize..8, names in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let temp = tempdir().unwrap();
                let path = temp.path().join("first.yml");
                fs::write(&path, "mapping:\n  zone1: HD1\n").unwrap();

                let device = MemoryDevice::default();
                device.set_write_delay(Duration::from_secs(30)).await;
                let handle = handle_for(&device, temp.path()).await;

                assert_eq!(handle.upload(&path).await.unwrap(), UploadRequest::Accepted);
                let uploading = handle.get_upload_state().await.unwrap();
                assert_eq!(uploading, UploadState { is_uploading: true, last_error: None });

                for i in 0..extra {
                    let name = format!("{}.yml", names[i % names.len()]);
                    assert_eq!(handle.upload(name).await.unwrap(), UploadRequest::Busy);
                    assert_eq!(handle.get_upload_state().await.unwrap(), uploading);
                    assert!(device.write_attempts().await <= 1);
                }

                // The accepted write starts once the uploader picks it up; no second one follows
                tokio::time::timeout(Duration::from_secs(5), async {
                    while device.write_attempts().await < 1 {
                        tokio::time::sleep(POLL).await;
                    }
                })
                .await
                .expect("accepted upload never reached the device");
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(device.write_attempts().await, 1);

                handle.terminate().await;
            });
        }
    }
}
