//! Minimal actor runtime
//!
//! Each actor owns its state and runs on its own tokio task, handling one
//! message at a time from an ordered mailbox. Actors talk to each other through
//! two primitives:
//! - **Cast:** fire-and-forget, never blocks the sender
//! - **Call:** request/reply, suspends the caller until the reply arrives or the
//!   target terminates
//!
//! Actors spawned through [`Context::spawn_child`] are owned by their parent;
//! they are terminated before the parent reports Terminated.

mod context;
mod error;
mod handle;
mod runtime;

pub use context::Context;
pub use error::ActorError;
pub use handle::{ActorId, ActorMonitor, ActorRef, ActorStatus, Recipient, Reply, WeakActorRef};
pub use runtime::{Actor, spawn};
