//! ConfigUploader - performs one upload per request
//!
//! Stateless apart from its device binding. Every failure is caught here and
//! reported to the parent as [`UploadOutcome::Failed`]; there are no retries.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::messages::{ManagerError, UploadOutcome, UploaderMsg};
use crate::actor::{Actor, Context, Recipient};
use crate::device::DeviceClient;
use crate::matrix::ConfigStore;

/// Spawn arguments for [`ConfigUploader`]
pub struct UploaderArgs {
    pub client: Arc<dyn DeviceClient>,
    pub store: ConfigStore,
    /// Where outcomes are reported
    pub parent: Recipient<UploadOutcome>,
}

pub struct ConfigUploader {
    client: Arc<dyn DeviceClient>,
    store: ConfigStore,
    parent: Recipient<UploadOutcome>,
}

impl ConfigUploader {
    async fn upload(&self, path: &Path) -> Result<(), ManagerError> {
        let config = self.store.load(path)?;
        debug!(path = %path.display(), settings = config.len(), "upload: parsed configuration");
        self.client.write_matrix_config(&config).await?;
        Ok(())
    }
}

#[async_trait]
impl Actor for ConfigUploader {
    type Msg = UploaderMsg;
    type Args = UploaderArgs;

    const NAME: &'static str = "ConfigUploader";

    async fn init(args: UploaderArgs, _ctx: &mut Context<Self>) -> eyre::Result<Self> {
        info!(endpoint = %args.client.endpoint(), parent = %args.parent.id(), "Config uploader initialized");
        Ok(Self {
            client: args.client,
            store: args.store,
            parent: args.parent,
        })
    }

    async fn handle(&mut self, msg: UploaderMsg, _ctx: &mut Context<Self>) {
        match msg {
            UploaderMsg::Upload { path } => {
                debug!(path = %path.display(), "handle: Upload");
                let outcome = match self.upload(&path).await {
                    Ok(()) => {
                        info!(path = %path.display(), endpoint = %self.client.endpoint(), "Upload complete");
                        UploadOutcome::Done { path }
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Upload failed");
                        UploadOutcome::Failed {
                            path,
                            reason: e.to_string(),
                        }
                    }
                };
                self.parent.cast(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorRef, Reply, spawn};
    use crate::device::{DeviceError, MemoryDevice};
    use crate::matrix::MatrixConfig;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Collects outcomes in arrival order
    struct Sink {
        outcomes: Vec<UploadOutcome>,
    }

    enum SinkMsg {
        Outcome(UploadOutcome),
        Take { reply: Reply<Vec<UploadOutcome>> },
    }

    #[async_trait]
    impl Actor for Sink {
        type Msg = SinkMsg;
        type Args = ();

        const NAME: &'static str = "Sink";

        async fn init(_args: (), _ctx: &mut Context<Self>) -> eyre::Result<Self> {
            Ok(Self { outcomes: Vec::new() })
        }

        async fn handle(&mut self, msg: SinkMsg, _ctx: &mut Context<Self>) {
            match msg {
                SinkMsg::Outcome(outcome) => self.outcomes.push(outcome),
                SinkMsg::Take { reply } => {
                    let _ = reply.send(std::mem::take(&mut self.outcomes));
                }
            }
        }
    }

    async fn wait_for_outcome(sink: &ActorRef<Sink>) -> UploadOutcome {
        for _ in 0..200 {
            let mut outcomes = sink.call(|reply| SinkMsg::Take { reply }).await.unwrap();
            if let Some(outcome) = outcomes.pop() {
                assert!(outcomes.is_empty(), "exactly one outcome per upload");
                return outcome;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("no outcome reported");
    }

    async fn uploader(device: &MemoryDevice, store: ConfigStore) -> (ActorRef<ConfigUploader>, ActorRef<Sink>) {
        let sink = spawn::<Sink>(()).await.unwrap();
        let uploader = spawn::<ConfigUploader>(UploaderArgs {
            client: Arc::new(device.clone()),
            store,
            parent: sink.recipient(SinkMsg::Outcome),
        })
        .await
        .unwrap();
        (uploader, sink)
    }

    #[tokio::test]
    async fn test_successful_upload_reports_done() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("movie.yml");
        fs::write(&path, "mapping:\n  zone1: HD1\n").unwrap();

        let device = MemoryDevice::default();
        let (uploader, sink) = uploader(&device, ConfigStore::new(temp.path())).await;
        uploader.cast(UploaderMsg::Upload { path: path.clone() });

        assert_eq!(wait_for_outcome(&sink).await, UploadOutcome::Done { path });
        assert_eq!(device.config().await, MatrixConfig::from_pairs([("zone1", "HD1")]));

        uploader.terminate().await;
        sink.terminate().await;
    }

    #[tokio::test]
    async fn test_device_failure_reports_reason() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("movie.yml");
        fs::write(&path, "mapping:\n  zone1: HD1\n").unwrap();

        let device = MemoryDevice::default();
        let refused = DeviceError::Rejected {
            status: 500,
            message: "matrix locked".to_string(),
        };
        device.fail_writes(Some(refused.clone())).await;

        let (uploader, sink) = uploader(&device, ConfigStore::new(temp.path())).await;
        uploader.cast(UploaderMsg::Upload { path: path.clone() });

        assert_eq!(
            wait_for_outcome(&sink).await,
            UploadOutcome::Failed {
                path,
                reason: refused.to_string(),
            }
        );

        uploader.terminate().await;
        sink.terminate().await;
    }

    #[tokio::test]
    async fn test_missing_file_reports_failure_without_writing() {
        let temp = tempdir().unwrap();
        let device = MemoryDevice::default();
        let (uploader, sink) = uploader(&device, ConfigStore::new(temp.path())).await;

        let path = PathBuf::from("does-not-exist.yml");
        uploader.cast(UploaderMsg::Upload { path: path.clone() });

        match wait_for_outcome(&sink).await {
            UploadOutcome::Failed { path: failed, reason } => {
                assert_eq!(failed, path);
                assert!(reason.contains("does-not-exist.yml"), "{reason}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(device.write_attempts().await, 0);

        uploader.terminate().await;
        sink.terminate().await;
    }
}
