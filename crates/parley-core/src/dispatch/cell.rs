//! Mailbox handle of a serialized state cell.

use crate::context::Context;
use futures::future::{BoxFuture, FutureExt};
use parley_stanza::{Jid, ParleyError, Response, Result, Stanza};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};

/// Read-only job run inside the cell against the current state. The
/// returned future is awaited before the next message is taken.
pub(crate) type Job<S> = Box<dyn FnOnce(&S) -> BoxFuture<'static, ()> + Send>;

pub(crate) enum Envelope<S> {
    Call {
        stanza: Stanza,
        reply: oneshot::Sender<Response>,
    },
    Cast(Stanza),
    Inspect(Job<S>),
    Stop(oneshot::Sender<()>),
}

/// Cloneable handle to a state cell's mailbox.
///
/// Every operation is queued on one unbounded channel and consumed by the
/// cell task one at a time, in the order it was enqueued.
pub struct StateCell<S> {
    tx: mpsc::UnboundedSender<Envelope<S>>,
}

impl<S> StateCell<S> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Envelope<S>>) -> Self {
        StateCell { tx }
    }

    /// Queues a stanza for the cell. Never waits and never reports the
    /// handler outcome.
    pub fn cast(&self, stanza: Stanza) -> Result<()> {
        self.tx
            .send(Envelope::Cast(stanza))
            .map_err(|_| ParleyError::AgentStopped)
    }

    /// Queues a read-only job against the state at the time it is taken.
    pub fn inspect<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&S) -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.tx
            .send(Envelope::Inspect(Box::new(job)))
            .map_err(|_| ParleyError::AgentStopped)
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn request_stop(&self) -> Result<oneshot::Receiver<()>> {
        let (done, rx) = oneshot::channel();
        self.tx
            .send(Envelope::Stop(done))
            .map_err(|_| ParleyError::AgentStopped)?;
        Ok(rx)
    }
}

impl<S: 'static> StateCell<S> {
    /// Queues a query and returns a future resolving to its response.
    ///
    /// The stanza is enqueued before this returns, so calls and casts keep
    /// the order in which they were issued. Only `get`/`set` queries are
    /// accepted.
    pub fn call(&self, stanza: Stanza) -> impl Future<Output = Result<Response>> + Send + 'static {
        let enqueued = if stanza.category().is_query() {
            let (reply, rx) = oneshot::channel();
            self.tx
                .send(Envelope::Call { stanza, reply })
                .map(|_| rx)
                .map_err(|_| ParleyError::AgentStopped)
        } else {
            Err(ParleyError::Protocol(format!(
                "call expects an iq get/set, got {:?} from {}",
                stanza.kind, stanza.from
            )))
        };

        async move { enqueued?.await.map_err(|_| ParleyError::AgentStopped) }
    }
}

impl<S: Clone + Send + 'static> StateCell<S> {
    /// Copy of the state as seen after everything queued before it.
    pub async fn snapshot(&self) -> Result<S> {
        let (tx, rx) = oneshot::channel();
        self.inspect(move |state: &S| {
            let _ = tx.send(state.clone());
            async {}.boxed()
        })?;
        rx.await.map_err(|_| ParleyError::AgentStopped)
    }
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        StateCell {
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for StateCell<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// What a stateful handler or hook gets besides the state: the service
/// context and a handle back into its own cell.
pub struct Scope<S> {
    ctx: Context,
    cell: StateCell<S>,
}

impl<S> Scope<S> {
    pub(crate) fn new(ctx: Context, cell: StateCell<S>) -> Self {
        Scope { ctx, cell }
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[inline]
    #[must_use]
    pub fn cell(&self) -> &StateCell<S> {
        &self.cell
    }

    #[inline]
    #[must_use]
    pub fn jid(&self) -> &Jid {
        self.ctx.jid()
    }
}

impl<S> Clone for Scope<S> {
    fn clone(&self) -> Self {
        Scope {
            ctx: self.ctx.clone(),
            cell: self.cell.clone(),
        }
    }
}
