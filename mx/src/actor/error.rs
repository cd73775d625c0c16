//! Actor runtime errors

use thiserror::Error;

use super::handle::ActorId;

/// Errors surfaced to callers of the actor runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    #[error("Actor {0} is terminated")]
    Terminated(ActorId),

    #[error("Re-entrant call to {0} rejected: it is already waiting on this call chain")]
    ReentrantCall(ActorId),

    #[error("Actor {0} dropped the reply slot without answering")]
    NoReply(ActorId),

    #[error("Actor init failed: {0}")]
    InitFailed(String),
}

impl ActorError {
    /// Check if the target actor is gone
    pub fn is_terminated(&self) -> bool {
        matches!(self, ActorError::Terminated(_))
    }
}
