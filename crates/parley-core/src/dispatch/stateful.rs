//! Serialized dispatch against one owned state cell.

use crate::context::Context;
use crate::dispatch::cell::{Envelope, Scope, StateCell};
use crate::dispatch::Dispatch;
use crate::handler::{Handler, HandlerChain, Resolution};
use async_trait::async_trait;
use futures::future::BoxFuture;
use parley_stanza::{Category, ParleyError, Response, Result, Stanza};
use std::borrow::Cow;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Query chain: `(request, state) -> (response, state')`.
pub type CallChain<S> = HandlerChain<(Stanza, S), Scope<S>, (Response, S)>;
/// Message/presence/other chain: `(stanza, state) -> state'`.
pub type CastChain<S> = HandlerChain<(Stanza, S), Scope<S>, S>;

impl<S, O> Handler<(Stanza, S), Scope<S>, O> {
    /// Handler over a stanza and the current state.
    pub fn stateful<G, F, Fut>(name: impl Into<Cow<'static, str>>, guard: G, run: F) -> Self
    where
        G: Fn(&Stanza, &S) -> bool + Send + Sync + 'static,
        F: Fn(Stanza, S, Scope<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        Self::new(
            name,
            move |(stanza, state): &(Stanza, S)| guard(stanza, state),
            move |(stanza, state), scope| run(stanza, state, scope),
        )
    }
}

pub struct StatefulHandlers<S> {
    pub iq_get: CallChain<S>,
    pub iq_set: CallChain<S>,
    pub message: CastChain<S>,
    pub presence: CastChain<S>,
    pub other: CastChain<S>,
}

impl<S> Default for StatefulHandlers<S> {
    fn default() -> Self {
        StatefulHandlers {
            iq_get: HandlerChain::new(),
            iq_set: HandlerChain::new(),
            message: HandlerChain::new(),
            presence: HandlerChain::new(),
            other: HandlerChain::new(),
        }
    }
}

/// An agent whose handlers share one serialized state.
#[async_trait]
pub trait StatefulAgent: Send + Sync + 'static {
    type State: Send + Sync + 'static;

    /// Builds the state once, when the cell starts.
    fn init(&self, ctx: &Context) -> Self::State;

    fn handlers(&self) -> StatefulHandlers<Self::State>;

    /// Runs inside the cell before the first message is taken.
    async fn on_connect(&self, _state: &Self::State, _scope: &Scope<Self::State>) {}

    /// Runs inside the cell with the final state; nothing queued after the
    /// stop request is processed.
    async fn on_shutdown(&self, _state: &Self::State, _scope: &Scope<Self::State>) {}
}

/// Owner of a running state cell.
///
/// Dropping it without [`shutdown`](Self::shutdown) still stops the cell,
/// without waiting for it.
pub struct StatefulDispatcher<S> {
    cell: StateCell<S>,
    ctx: Context,
    task: Option<JoinHandle<()>>,
}

impl<S: Send + Sync + 'static> StatefulDispatcher<S> {
    /// Creates the state and spawns the cell task.
    pub fn start<A>(agent: A, ctx: Context) -> Self
    where
        A: StatefulAgent<State = S>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cell = StateCell::new(tx);
        let state = agent.init(&ctx);
        let handlers = agent.handlers();
        let owner = CellTask {
            agent,
            handlers,
            scope: Scope::new(ctx.clone(), cell.clone()),
        };

        info!("[Cell] starting for {}", ctx.jid());
        let task = tokio::spawn(owner.run(rx, state));
        StatefulDispatcher {
            cell,
            ctx,
            task: Some(task),
        }
    }

    #[inline]
    #[must_use]
    pub fn cell(&self) -> &StateCell<S> {
        &self.cell
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Stops the cell after everything already queued ahead of the stop
    /// request, running the agent's shutdown hook.
    pub async fn shutdown(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let done = self.cell.request_stop()?;
        let acked = done.await.is_ok();
        match task.await {
            Ok(()) if acked => Ok(()),
            Ok(()) => Err(ParleyError::AgentStopped),
            Err(e) => {
                warn!("[Cell] task for {} ended abnormally: {}", self.ctx.jid(), e);
                Err(ParleyError::AgentStopped)
            }
        }
    }
}

impl<S> Drop for StatefulDispatcher<S> {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.cell.request_stop();
        }
    }
}

impl<S: Send + Sync + 'static> Dispatch for StatefulDispatcher<S> {
    fn dispatch(&self, stanza: Stanza) -> BoxFuture<'static, Result<()>> {
        if stanza.category().is_query() {
            let header = stanza.header();
            let pending = self.cell.call(stanza);
            let ctx = self.ctx.clone();
            Box::pin(async move {
                let response = pending.await?;
                ctx.send(header.reply(ctx.jid(), response)).await
            })
        } else {
            let queued = self.cell.cast(stanza);
            Box::pin(async move { queued })
        }
    }
}

struct CellTask<A: StatefulAgent> {
    agent: A,
    handlers: StatefulHandlers<A::State>,
    scope: Scope<A::State>,
}

impl<A: StatefulAgent> CellTask<A> {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Envelope<A::State>>, initial: A::State) {
        let mut state = initial;
        self.agent.on_connect(&state, &self.scope).await;

        // The cell holds a sender to itself, so the loop only ends on Stop.
        while let Some(envelope) = rx.recv().await {
            match envelope {
                Envelope::Call { stanza, reply } => {
                    let (response, next) = self.step(stanza, state).await;
                    state = next;
                    let _ = reply.send(response.unwrap_or_else(Response::bad_request));
                }
                Envelope::Cast(stanza) => {
                    let (_, next) = self.step(stanza, state).await;
                    state = next;
                }
                Envelope::Inspect(job) => job(&state).await,
                Envelope::Stop(done) => {
                    info!("[Cell] stopping {}", self.scope.jid());
                    self.agent.on_shutdown(&state, &self.scope).await;
                    let _ = done.send(());
                    return;
                }
            }
        }
    }

    /// One serialized turn. Queries always produce a response; the state
    /// comes back unchanged when nothing matches.
    async fn step(&self, stanza: Stanza, state: A::State) -> (Option<Response>, A::State) {
        let category = stanza.category();
        let scope = self.scope.clone();
        match category {
            Category::QueryGet | Category::QuerySet => {
                let chain = if category == Category::QueryGet {
                    &self.handlers.iq_get
                } else {
                    &self.handlers.iq_set
                };
                match chain.resolve((stanza, state), scope).await {
                    Resolution::Matched((response, next)) => (Some(response), next),
                    Resolution::NoMatch((stanza, state)) => {
                        debug!(from = %stanza.from, id = ?stanza.id, "[Cell] no query handler");
                        (Some(Response::bad_request()), state)
                    }
                }
            }
            Category::Message | Category::Presence | Category::Other => {
                let chain = match category {
                    Category::Message => &self.handlers.message,
                    Category::Presence => &self.handlers.presence,
                    _ => &self.handlers.other,
                };
                match chain.resolve((stanza, state), scope).await {
                    Resolution::Matched(next) => (None, next),
                    Resolution::NoMatch((stanza, state)) => {
                        debug!(from = %stanza.from, ?category, "[Cell] dropped unhandled stanza");
                        (None, state)
                    }
                }
            }
        }
    }
}
