//! Actor trait and the per-actor message loop

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::context::Context;
use super::error::ActorError;
use super::handle::{ActorId, ActorRef, ActorStatus, Control};

tokio::task_local! {
    /// Actors blocked in a call on the current task, innermost last
    static CALL_CHAIN: Vec<ActorId>;
}

/// Call chain of the task running this code (empty outside any actor)
pub(crate) fn current_chain() -> Vec<ActorId> {
    CALL_CHAIN.try_with(|chain| chain.clone()).unwrap_or_default()
}

/// Mailbox entry
pub(crate) enum Envelope<M> {
    Cast(M),
    Call { msg: M, chain: Vec<ActorId> },
}

/// An isolated unit of state driven by its own message loop
///
/// `Msg` is usually an enum: cast variants carry data only, call variants also
/// carry a [`Reply`](super::Reply) slot that the handler must answer.
#[async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;
    type Args: Send + 'static;

    /// Name used in logs
    const NAME: &'static str;

    /// Build the actor's state; runs before any message is handled
    async fn init(args: Self::Args, ctx: &mut Context<Self>) -> eyre::Result<Self>;

    /// Handle one message; the next message waits until this returns
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>);

    /// Termination hook, runs before children are terminated
    async fn terminated(&mut self, _ctx: &mut Context<Self>) {}
}

/// Spawn a top-level actor and wait for its init to finish
pub async fn spawn<A: Actor>(args: A::Args) -> Result<ActorRef<A>, ActorError> {
    spawn_actor::<A>(args, None).await
}

pub(crate) async fn spawn_actor<A: Actor>(args: A::Args, parent: Option<ActorId>) -> Result<ActorRef<A>, ActorError> {
    let id = ActorId::next();
    debug!(%id, actor = A::NAME, ?parent, "spawn_actor: called");

    let (tx, rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(ActorStatus::Starting);
    let control = Arc::new(Control {
        stop: stop_tx,
        status: status_rx,
    });
    let actor_ref = ActorRef::new(id, tx, control);
    let ctx = Context::new(id, parent, actor_ref.downgrade());

    // The spawner is blocked until init finishes, so it belongs on init's chain
    let mut chain = current_chain();
    chain.push(id);

    let (ready_tx, ready_rx) = oneshot::channel();
    tokio::spawn(run::<A>(args, ctx, rx, stop_rx, status_tx, ready_tx, chain));

    match ready_rx.await {
        Ok(Ok(())) => Ok(actor_ref),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ActorError::InitFailed(format!("{} init aborted", A::NAME))),
    }
}

enum Handled {
    Done,
    Panicked,
    Stopped,
}

async fn run<A: Actor>(
    args: A::Args,
    mut ctx: Context<A>,
    mut rx: mpsc::UnboundedReceiver<Envelope<A::Msg>>,
    mut stop_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<ActorStatus>,
    ready_tx: oneshot::Sender<Result<(), ActorError>>,
    init_chain: Vec<ActorId>,
) {
    let id = ctx.id();

    let init = AssertUnwindSafe(CALL_CHAIN.scope(init_chain, A::init(args, &mut ctx)))
        .catch_unwind()
        .await;
    let mut actor = match init {
        Ok(Ok(actor)) => actor,
        Ok(Err(e)) => {
            warn!(%id, actor = A::NAME, error = %e, "Actor init failed");
            ctx.terminate_children().await;
            status_tx.send_replace(ActorStatus::Terminated);
            let _ = ready_tx.send(Err(ActorError::InitFailed(format!("{}: {:#}", A::NAME, e))));
            return;
        }
        Err(_) => {
            error!(%id, actor = A::NAME, "Actor init panicked");
            ctx.terminate_children().await;
            status_tx.send_replace(ActorStatus::Terminated);
            let _ = ready_tx.send(Err(ActorError::InitFailed(format!("{} init panicked", A::NAME))));
            return;
        }
    };

    status_tx.send_replace(ActorStatus::Running);
    let _ = ready_tx.send(Ok(()));
    info!(%id, actor = A::NAME, parent = ?ctx.parent(), "Actor started");

    loop {
        let envelope = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stop| *stop) => {
                debug!(%id, "run: stop requested");
                break;
            }
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => {
                    debug!(%id, "run: every owning address dropped");
                    break;
                }
            },
        };

        let (msg, chain) = match envelope {
            Envelope::Cast(msg) => (msg, vec![id]),
            Envelope::Call { msg, mut chain } => {
                chain.push(id);
                (msg, chain)
            }
        };

        // Only termination may interrupt a handler; it is dropped at its next await
        let handled = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stop| *stop) => Handled::Stopped,
            result = AssertUnwindSafe(CALL_CHAIN.scope(chain, actor.handle(msg, &mut ctx))).catch_unwind() => {
                match result {
                    Ok(()) => Handled::Done,
                    Err(_) => Handled::Panicked,
                }
            }
        };

        match handled {
            Handled::Done => {}
            Handled::Stopped => {
                warn!(%id, actor = A::NAME, "Abandoning in-flight handler on terminate");
                break;
            }
            Handled::Panicked => {
                error!(%id, actor = A::NAME, "Handler panicked, terminating actor");
                break;
            }
        }
    }

    status_tx.send_replace(ActorStatus::Terminating);

    // Pending messages are dropped, closing their reply slots
    rx.close();
    let mut dropped = 0usize;
    while rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(%id, dropped, "run: dropped pending messages");
    }

    if AssertUnwindSafe(actor.terminated(&mut ctx)).catch_unwind().await.is_err() {
        error!(%id, actor = A::NAME, "Termination hook panicked");
    }
    ctx.terminate_children().await;
    drop(actor);

    status_tx.send_replace(ActorStatus::Terminated);
    info!(%id, actor = A::NAME, "Actor terminated");
}
