//! Addresses for reaching an actor
//!
//! [`ActorRef`] is the owning address: while any clone is alive the mailbox
//! stays open. [`WeakActorRef`] and [`Recipient`] are non-owning addresses used
//! for back-references from a child to its parent.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::error::ActorError;
use super::runtime::{Actor, Envelope, current_chain};

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Reply slot carried by call messages
pub type Reply<R> = oneshot::Sender<R>;

/// Process-unique actor identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Actor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    Starting,
    Running,
    Terminating,
    Terminated,
}

/// Lifecycle signals shared by every address of one actor
pub(crate) struct Control {
    pub(crate) stop: watch::Sender<bool>,
    pub(crate) status: watch::Receiver<ActorStatus>,
}

/// Owning address of an actor
pub struct ActorRef<A: Actor> {
    id: ActorId,
    tx: mpsc::UnboundedSender<Envelope<A::Msg>>,
    control: Arc<Control>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            control: self.control.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("actor", &A::NAME)
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(id: ActorId, tx: mpsc::UnboundedSender<Envelope<A::Msg>>, control: Arc<Control>) -> Self {
        Self { id, tx, control }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Current lifecycle status
    pub fn status(&self) -> ActorStatus {
        *self.control.status.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.status() != ActorStatus::Terminated
    }

    /// Enqueue a message without waiting
    ///
    /// Never blocks and never fails; messages sent to a terminated actor are
    /// dropped.
    pub fn cast(&self, msg: A::Msg) {
        if self.tx.send(Envelope::Cast(msg)).is_err() {
            debug!(id = %self.id, actor = A::NAME, "cast: mailbox closed, message dropped");
        }
    }

    /// Send a request and wait for its reply
    ///
    /// `build` receives the single-use reply slot and wraps it in the actor's
    /// message type. Fails with [`ActorError::Terminated`] if the actor is gone
    /// or terminates before replying, and with [`ActorError::ReentrantCall`] if
    /// the target is already blocked further up this call chain.
    ///
    /// Only the chain of the current task is checked. Cycles that leave it
    /// deadlock instead of failing: a task spawned by a handler that calls
    /// back into its actor, or a cast-started handler on B calling A while A
    /// is blocked calling B. Such a cycle holds until one of the actors is
    /// terminated.
    pub async fn call<R, F>(&self, build: F) -> Result<R, ActorError>
    where
        R: Send,
        F: FnOnce(Reply<R>) -> A::Msg,
    {
        let chain = current_chain();
        debug!(id = %self.id, actor = A::NAME, depth = chain.len(), "call: called");
        if chain.contains(&self.id) {
            warn!(id = %self.id, ?chain, "call: rejecting re-entrant call");
            return Err(ActorError::ReentrantCall(self.id));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope::Call {
                msg: build(reply_tx),
                chain,
            })
            .map_err(|_| ActorError::Terminated(self.id))?;

        reply_rx.await.map_err(|_| {
            if self.tx.is_closed() {
                ActorError::Terminated(self.id)
            } else {
                ActorError::NoReply(self.id)
            }
        })
    }

    /// Stop the actor and wait until it and its children are terminated
    ///
    /// Pending messages are dropped. When invoked from the actor's own handler
    /// (directly or down a call chain) this only requests the shutdown.
    pub async fn terminate(&self) {
        debug!(id = %self.id, actor = A::NAME, "terminate: called");
        self.control.stop.send_replace(true);

        if current_chain().contains(&self.id) {
            debug!(id = %self.id, "terminate: requested from own call chain, not waiting");
            return;
        }

        let mut status = self.control.status.clone();
        let _ = status.wait_for(|s| *s == ActorStatus::Terminated).await;
    }

    /// Non-owning address of this actor
    pub fn downgrade(&self) -> WeakActorRef<A> {
        WeakActorRef {
            id: self.id,
            tx: self.tx.downgrade(),
            control: self.control.clone(),
        }
    }

    /// Non-owning address accepting `T`, delivered as `wrap(T)`
    pub fn recipient<T: Send + 'static>(&self, wrap: fn(T) -> A::Msg) -> Recipient<T> {
        Recipient::new(self.downgrade(), wrap)
    }

    /// Status observer that does not keep the actor alive
    pub fn monitor(&self) -> ActorMonitor {
        ActorMonitor {
            id: self.id,
            status: self.control.status.clone(),
        }
    }
}

/// Non-owning address of an actor
pub struct WeakActorRef<A: Actor> {
    id: ActorId,
    tx: mpsc::WeakUnboundedSender<Envelope<A::Msg>>,
    control: Arc<Control>,
}

impl<A: Actor> Clone for WeakActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            control: self.control.clone(),
        }
    }
}

impl<A: Actor> WeakActorRef<A> {
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Enqueue a message if the actor is still reachable
    pub fn cast(&self, msg: A::Msg) {
        match self.tx.upgrade() {
            Some(tx) => {
                if tx.send(Envelope::Cast(msg)).is_err() {
                    debug!(id = %self.id, actor = A::NAME, "WeakActorRef::cast: mailbox closed, message dropped");
                }
            }
            None => debug!(id = %self.id, actor = A::NAME, "WeakActorRef::cast: actor gone, message dropped"),
        }
    }

    /// Owning address, if the mailbox is still open
    pub fn upgrade(&self) -> Option<ActorRef<A>> {
        let tx = self.tx.upgrade()?;
        Some(ActorRef::new(self.id, tx, self.control.clone()))
    }
}

/// Non-owning, type-erased address accepting one message type
///
/// Lets a child report to its parent without knowing the parent's actor type.
pub struct Recipient<T> {
    id: ActorId,
    deliver: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Recipient<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deliver: self.deliver.clone(),
        }
    }
}

impl<T: Send + 'static> Recipient<T> {
    pub(crate) fn new<A: Actor>(target: WeakActorRef<A>, wrap: fn(T) -> A::Msg) -> Self {
        Self {
            id: target.id(),
            deliver: Arc::new(move |msg| target.cast(wrap(msg))),
        }
    }

    /// Id of the actor behind this recipient
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn cast(&self, msg: T) {
        (self.deliver)(msg)
    }
}

/// Read-only view of an actor's lifecycle
#[derive(Clone)]
pub struct ActorMonitor {
    id: ActorId,
    status: watch::Receiver<ActorStatus>,
}

impl ActorMonitor {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn status(&self) -> ActorStatus {
        *self.status.borrow()
    }

    pub fn is_terminated(&self) -> bool {
        self.status() == ActorStatus::Terminated
    }

    /// Wait until the actor reports Terminated
    pub async fn wait_terminated(&mut self) {
        let _ = self.status.wait_for(|s| *s == ActorStatus::Terminated).await;
    }
}
