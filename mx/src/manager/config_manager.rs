//! ConfigManager - upload state machine and configuration queries
//!
//! The manager is either idle or uploading. An upload request while uploading
//! is answered with [`UploadRequest::Busy`] and changes nothing. Accepting one
//! clears the last error and hands the path to the uploader child; the
//! uploader's outcome returns the manager to idle.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::WrapErr;
use tracing::{debug, info, warn};

use super::messages::{CurrentConfig, ManagerError, ManagerMsg, UploadOutcome, UploadRequest, UploadState, UploaderMsg};
use super::uploader::{ConfigUploader, UploaderArgs};
use crate::actor::{Actor, ActorRef, Context};
use crate::device::DeviceClient;
use crate::matrix::ConfigStore;

/// Spawn arguments for [`ConfigManager`]
pub struct ManagerArgs {
    pub client: Arc<dyn DeviceClient>,
    pub store: ConfigStore,
}

pub struct ConfigManager {
    client: Arc<dyn DeviceClient>,
    store: ConfigStore,
    uploader: ActorRef<ConfigUploader>,
    state: UploadState,
}

impl ConfigManager {
    fn request_upload(&mut self, path: PathBuf) -> UploadRequest {
        if self.state.is_uploading {
            debug!(path = %path.display(), "request_upload: upload in flight, busy");
            return UploadRequest::Busy;
        }

        info!(path = %path.display(), "Upload accepted");
        self.state.is_uploading = true;
        self.state.last_error = None;
        self.uploader.cast(UploaderMsg::Upload { path });
        UploadRequest::Accepted
    }

    fn finish_upload(&mut self, outcome: UploadOutcome) {
        if !self.state.is_uploading {
            warn!(?outcome, "finish_upload: outcome received while idle");
        }
        self.state.is_uploading = false;

        match outcome {
            UploadOutcome::Done { path } => {
                debug!(path = %path.display(), "finish_upload: done");
            }
            UploadOutcome::Failed { path, reason } => {
                debug!(path = %path.display(), %reason, "finish_upload: failed");
                self.state.last_error = Some(reason);
            }
        }
    }

    /// First stored configuration, in path order, equal to the device's
    async fn current_config(&self) -> Result<CurrentConfig, ManagerError> {
        let stored = self.store.load_all()?;
        let live = self.client.read_matrix_config().await?;
        debug!(candidates = stored.len(), settings = live.len(), "current_config: comparing");

        for (path, config) in stored {
            if config.diff(&live).is_empty() {
                debug!(path = %path.display(), "current_config: matched");
                return Ok(CurrentConfig::matched(config, path));
            }
        }
        debug!("current_config: no stored configuration matches");
        Ok(CurrentConfig::unknown())
    }
}

#[async_trait]
impl Actor for ConfigManager {
    type Msg = ManagerMsg;
    type Args = ManagerArgs;

    const NAME: &'static str = "ConfigManager";

    async fn init(args: ManagerArgs, ctx: &mut Context<Self>) -> eyre::Result<Self> {
        info!(
            endpoint = %args.client.endpoint(),
            configs = %args.store.root().display(),
            "Config manager starting"
        );

        let parent = ctx.recipient(ManagerMsg::UploadFinished);
        let uploader = ctx
            .spawn_child::<ConfigUploader>(UploaderArgs {
                client: args.client.clone(),
                store: args.store.clone(),
                parent,
            })
            .await
            .wrap_err("Failed to spawn config uploader")?;

        Ok(Self {
            client: args.client,
            store: args.store,
            uploader,
            state: UploadState::default(),
        })
    }

    async fn handle(&mut self, msg: ManagerMsg, _ctx: &mut Context<Self>) {
        match msg {
            ManagerMsg::ListConfigurations { reply } => {
                debug!("handle: ListConfigurations");
                let _ = reply.send(self.store.list());
            }
            ManagerMsg::GetCurrentMatrixConfig { reply } => {
                debug!("handle: GetCurrentMatrixConfig");
                let _ = reply.send(self.current_config().await);
            }
            ManagerMsg::GetUploadState { reply } => {
                let _ = reply.send(self.state.clone());
            }
            ManagerMsg::Upload { path, reply } => {
                debug!(path = %path.display(), "handle: Upload");
                let _ = reply.send(self.request_upload(path));
            }
            ManagerMsg::MonitorUploader { reply } => {
                let _ = reply.send(self.uploader.monitor());
            }
            ManagerMsg::UploadFinished(outcome) => {
                debug!(?outcome, "handle: UploadFinished");
                self.finish_upload(outcome);
            }
        }
    }

    async fn terminated(&mut self, _ctx: &mut Context<Self>) {
        if self.state.is_uploading {
            warn!("Config manager stopping with an upload in flight; it is abandoned");
        }
        info!("Config manager stopped");
    }
}
