//! Concurrent dispatch with no shared mutable state.

use crate::context::Context;
use crate::dispatch::Dispatch;
use crate::handler::{HandlerChain, Resolution};
use futures::future::BoxFuture;
use parley_stanza::{Category, ErrorKind, Response, Result, Stanza};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

pub type StatelessChain<O> = HandlerChain<Stanza, Context, O>;

/// One chain per category. Message, presence and other handlers run for
/// effect only.
#[derive(Clone, Default)]
pub struct StatelessHandlers {
    pub iq_get: StatelessChain<Response>,
    pub iq_set: StatelessChain<Response>,
    pub message: StatelessChain<()>,
    pub presence: StatelessChain<()>,
    pub other: StatelessChain<()>,
}

/// Runs each stanza as an independent unit against shared, read-only chains.
#[derive(Clone)]
pub struct StatelessDispatcher {
    handlers: Arc<StatelessHandlers>,
    ctx: Context,
}

impl StatelessDispatcher {
    pub fn new(handlers: StatelessHandlers, ctx: Context) -> Self {
        StatelessDispatcher {
            handlers: Arc::new(handlers),
            ctx,
        }
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Handles one stanza to completion on the current task.
    pub async fn handle(&self, stanza: Stanza) -> Result<()> {
        handle_stanza(Arc::clone(&self.handlers), self.ctx.clone(), stanza).await
    }

    /// Handles one stanza on its own task.
    pub fn spawn(&self, stanza: Stanza) -> JoinHandle<Result<()>> {
        tokio::spawn(handle_stanza(
            Arc::clone(&self.handlers),
            self.ctx.clone(),
            stanza,
        ))
    }
}

impl Dispatch for StatelessDispatcher {
    fn dispatch(&self, stanza: Stanza) -> BoxFuture<'static, Result<()>> {
        Box::pin(handle_stanza(
            Arc::clone(&self.handlers),
            self.ctx.clone(),
            stanza,
        ))
    }
}

async fn handle_stanza(
    handlers: Arc<StatelessHandlers>,
    ctx: Context,
    stanza: Stanza,
) -> Result<()> {
    let category = stanza.category();
    match category {
        Category::QueryGet | Category::QuerySet => {
            let chain = if category == Category::QueryGet {
                &handlers.iq_get
            } else {
                &handlers.iq_set
            };
            let header = stanza.header();
            let reply = match chain.resolve(stanza, ctx.clone()).await {
                Resolution::Matched(response) => header.reply(ctx.jid(), response),
                Resolution::NoMatch(request) => {
                    debug!(from = %request.from, id = ?request.id, "[Stateless] no query handler");
                    request.result_error(ctx.jid(), ErrorKind::BadRequest)
                }
            };
            ctx.send(reply).await
        }
        Category::Message | Category::Presence | Category::Other => {
            let chain = match category {
                Category::Message => &handlers.message,
                Category::Presence => &handlers.presence,
                _ => &handlers.other,
            };
            if let Resolution::NoMatch(stanza) = chain.resolve(stanza, ctx).await {
                debug!(from = %stanza.from, ?category, "[Stateless] dropped unhandled stanza");
            }
            Ok(())
        }
    }
}
