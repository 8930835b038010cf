//! Presence subscriptions layered on the stateful discipline.
//!
//! [`Presence`] wraps a [`PresenceAgent`] and appends three handlers to
//! its presence chain, after the agent's own: `subscribe`, `unsubscribe`,
//! `probe`. The agent's state is the only subscription authority through
//! its [`FriendSet`].
//!
//! Replies to `subscribe` are sent with a bounded wait and the outcome is
//! dropped. Announces wait on every send with no bound, so only the
//! shutdown announce runs inside the cell; the others read the state there
//! and send from a task of their own.

pub mod announce;
pub mod status;

pub use announce::broadcast;
pub use status::Status;

use crate::config::AgentConfig;
use crate::context::Context;
use crate::dispatch::{CastChain, Scope, StateCell, StatefulAgent, StatefulHandlers};
use crate::handler::{Handler, HandlerChain};
use announce::Audience;
use async_trait::async_trait;
use parley_stanza::protocol::presence_types;
use parley_stanza::{Jid, Node, Result, Stanza};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Access to the set of JIDs with an accepted subscription.
pub trait FriendSet {
    fn friends(&self) -> &HashSet<Jid>;
    fn friends_mut(&mut self) -> &mut HashSet<Jid>;

    /// Decides the reply to a `subscribe`. Override it when friends are
    /// stored in a normalized form, such as bare JIDs.
    #[inline]
    fn is_friend(&self, jid: &Jid) -> bool {
        self.friends().contains(jid)
    }

    /// Returns whether `jid` was newly added.
    fn add_friend(&mut self, jid: Jid) -> bool {
        self.friends_mut().insert(jid)
    }

    /// Returns whether `jid` was present.
    fn remove_friend(&mut self, jid: &Jid) -> bool {
        self.friends_mut().remove(jid)
    }
}

impl FriendSet for HashSet<Jid> {
    fn friends(&self) -> &HashSet<Jid> {
        self
    }

    fn friends_mut(&mut self) -> &mut HashSet<Jid> {
        self
    }
}

/// A stateful agent that takes part in presence subscriptions.
#[async_trait]
pub trait PresenceAgent: Send + Sync + 'static {
    type State: FriendSet + Send + Sync + 'static;

    fn init(&self, ctx: &Context) -> Self::State;

    /// The agent's own handlers. Its presence handlers run before the
    /// subscription ones.
    fn handlers(&self) -> StatefulHandlers<Self::State> {
        StatefulHandlers::default()
    }

    async fn on_connect(&self, _state: &Self::State, _scope: &Scope<Self::State>) {}

    async fn on_shutdown(&self, _state: &Self::State, _scope: &Scope<Self::State>) {}

    /// Decides a `subscribe` request. Accepting means `from` is in the
    /// returned state's friends.
    fn accept_subscription(&self, state: Self::State, from: &Jid, content: &[Node]) -> Self::State;

    fn remove_subscription(&self, state: Self::State, from: &Jid) -> Self::State;

    fn status(&self, _state: &Self::State) -> Status {
        Status::default()
    }

    fn offline_status(&self, _state: &Self::State) -> Status {
        Status::offline()
    }
}

/// Subscription manager around a [`PresenceAgent`]; run it with
/// [`StatefulDispatcher::start`](crate::StatefulDispatcher::start).
pub struct Presence<A> {
    agent: Arc<A>,
    config: AgentConfig,
}

impl<A> Clone for Presence<A> {
    fn clone(&self) -> Self {
        Presence {
            agent: Arc::clone(&self.agent),
            config: self.config.clone(),
        }
    }
}

impl<A: PresenceAgent> Presence<A> {
    pub fn new(agent: A, config: AgentConfig) -> Self {
        Presence {
            agent: Arc::new(agent),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Queues an announce of the current status to every friend.
    pub fn announce_all(&self, cell: &StateCell<A::State>, ctx: &Context) -> Result<()> {
        announce::queue(Arc::clone(&self.agent), cell, ctx.clone(), Audience::Friends)
    }

    /// Queues an announce of the current status to one JID.
    pub fn announce_to(&self, jid: Jid, cell: &StateCell<A::State>, ctx: &Context) -> Result<()> {
        announce::queue(Arc::clone(&self.agent), cell, ctx.clone(), Audience::One(jid))
    }

    /// `subscribe`, `unsubscribe`, `probe`, in that order.
    fn subscription_handlers(&self) -> CastChain<A::State> {
        HandlerChain::new()
            .with(subscribe_handler(
                Arc::clone(&self.agent),
                self.config.subscribe_reply_wait(),
            ))
            .with(unsubscribe_handler(Arc::clone(&self.agent)))
            .with(probe_handler(Arc::clone(&self.agent)))
    }
}

#[async_trait]
impl<A: PresenceAgent> StatefulAgent for Presence<A> {
    type State = A::State;

    fn init(&self, ctx: &Context) -> A::State {
        self.agent.init(ctx)
    }

    fn handlers(&self) -> StatefulHandlers<A::State> {
        let mut handlers = self.agent.handlers();
        handlers.presence.extend(self.subscription_handlers());
        handlers
    }

    async fn on_connect(&self, state: &A::State, scope: &Scope<A::State>) {
        self.agent.on_connect(state, scope).await;
        if let Err(e) = self.announce_all(scope.cell(), scope.context()) {
            warn!("[Presence] could not queue connect announce: {}", e);
        }
    }

    async fn on_shutdown(&self, state: &A::State, scope: &Scope<A::State>) {
        let status = self.agent.offline_status(state);
        let friends = announce::sorted_friends(state);
        info!(
            "[Presence] {} going offline, notifying {} friend(s)",
            scope.jid(),
            friends.len()
        );
        broadcast(scope.context(), friends, &status).await;
        self.agent.on_shutdown(state, scope).await;
    }
}

fn subscription_reply(own: &Jid, request: &Stanza, reply_type: &str) -> Stanza {
    let mut reply = Stanza::presence(own.clone())
        .with_to(request.from.clone())
        .with_type(reply_type);
    reply.id = request.id.clone();
    reply
}

fn subscribe_handler<A: PresenceAgent>(
    agent: Arc<A>,
    wait: Duration,
) -> Handler<(Stanza, A::State), Scope<A::State>, A::State> {
    Handler::stateful(
        "subscribe",
        |stanza: &Stanza, _: &A::State| stanza.is_type(presence_types::SUBSCRIBE),
        move |stanza: Stanza, state: A::State, scope: Scope<A::State>| {
            let agent = Arc::clone(&agent);
            async move {
                let from = stanza.from.clone();
                let next = agent.accept_subscription(state, &from, &stanza.payload);
                let reply_type = if next.is_friend(&from) {
                    info!("[Presence] accepted subscription from {}", from);
                    presence_types::SUBSCRIBED
                } else {
                    debug!("[Presence] rejected subscription from {}", from);
                    presence_types::UNSUBSCRIBED
                };

                let reply = subscription_reply(scope.jid(), &stanza, reply_type);
                // Best effort: neither the timeout nor a send error matters.
                let _ = tokio::time::timeout(wait, scope.context().send(reply)).await;
                next
            }
        },
    )
}

fn unsubscribe_handler<A: PresenceAgent>(
    agent: Arc<A>,
) -> Handler<(Stanza, A::State), Scope<A::State>, A::State> {
    Handler::stateful(
        "unsubscribe",
        |stanza: &Stanza, _: &A::State| stanza.is_type(presence_types::UNSUBSCRIBE),
        move |stanza: Stanza, state: A::State, scope: Scope<A::State>| {
            let agent = Arc::clone(&agent);
            async move {
                let next = agent.remove_subscription(state, &stanza.from);
                debug!("[Presence] removed subscription of {}", stanza.from);

                let reply = subscription_reply(scope.jid(), &stanza, presence_types::UNSUBSCRIBED);
                if let Err(e) = scope.context().send(reply).await {
                    warn!("[Presence] unsubscribed reply to {} failed: {}", stanza.from, e);
                }
                next
            }
        },
    )
}

fn probe_handler<A: PresenceAgent>(
    agent: Arc<A>,
) -> Handler<(Stanza, A::State), Scope<A::State>, A::State> {
    Handler::stateful(
        "probe",
        |stanza: &Stanza, _: &A::State| stanza.is_type(presence_types::PROBE),
        move |stanza: Stanza, state: A::State, scope: Scope<A::State>| {
            let queued = announce::queue(
                Arc::clone(&agent),
                scope.cell(),
                scope.context().clone(),
                Audience::One(stanza.from),
            );
            async move {
                if let Err(e) = queued {
                    warn!("[Presence] could not queue probe answer: {}", e);
                }
                state
            }
        },
    )
}
