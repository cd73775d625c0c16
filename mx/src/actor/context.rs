//! Per-actor context handed to init and handlers

use async_trait::async_trait;
use tracing::debug;

use super::error::ActorError;
use super::handle::{ActorId, ActorRef, Recipient, WeakActorRef};
use super::runtime::{Actor, spawn_actor};

/// A supervised child, type-erased so a parent can own children of any actor type
#[async_trait]
trait Supervised: Send + Sync {
    fn id(&self) -> ActorId;

    async fn shutdown(&self);
}

#[async_trait]
impl<A: Actor> Supervised for ActorRef<A> {
    fn id(&self) -> ActorId {
        ActorRef::id(self)
    }

    async fn shutdown(&self) {
        self.terminate().await;
    }
}

/// Runtime context of one actor
///
/// Only the actor's own loop holds it. Children spawned here are owned by this
/// actor and terminated after its `terminated` hook runs.
pub struct Context<A: Actor> {
    id: ActorId,
    parent: Option<ActorId>,
    myself: WeakActorRef<A>,
    children: Vec<Box<dyn Supervised>>,
}

impl<A: Actor> Context<A> {
    pub(crate) fn new(id: ActorId, parent: Option<ActorId>, myself: WeakActorRef<A>) -> Self {
        Self {
            id,
            parent,
            myself,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Id of the actor that spawned this one, if any
    pub fn parent(&self) -> Option<ActorId> {
        self.parent
    }

    /// Non-owning address of this actor
    pub fn myself(&self) -> WeakActorRef<A> {
        self.myself.clone()
    }

    /// Non-owning address of this actor accepting `T`, delivered as `wrap(T)`
    pub fn recipient<T: Send + 'static>(&self, wrap: fn(T) -> A::Msg) -> Recipient<T> {
        Recipient::new(self.myself(), wrap)
    }

    /// Spawn an actor owned by this one
    pub async fn spawn_child<C: Actor>(&mut self, args: C::Args) -> Result<ActorRef<C>, ActorError> {
        debug!(parent = %self.id, child = C::NAME, "spawn_child: called");
        let child = spawn_actor::<C>(args, Some(self.id)).await?;
        self.children.push(Box::new(child.clone()));
        Ok(child)
    }

    /// Number of children spawned through this context
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Terminate children newest first; each waits for its own subtree
    pub(crate) async fn terminate_children(&mut self) {
        while let Some(child) = self.children.pop() {
            debug!(parent = %self.id, child = %child.id(), "terminate_children: terminating child");
            child.shutdown().await;
        }
    }
}
