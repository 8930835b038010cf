//! The two demo agents the daemon can run.

use parley_core::stanza::protocol::{first_element, ns, ChatMessage};
use parley_core::stanza::{Element, Jid, Node, Response, Stanza};
use parley_core::{
    Context, FriendSet, Handler, PresenceAgent, StatefulHandlers, StatelessHandlers, Status,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

fn is_query(stanza: &Stanza, namespace: &str) -> bool {
    first_element(stanza).is_some_and(|el| el.is("query", namespace))
}

fn version_element() -> Element {
    Element::new("query")
        .with_ns(ns::VERSION)
        .with_child(Element::new("name").with_text("parley"))
        .with_child(Element::new("version").with_text(env!("CARGO_PKG_VERSION")))
}

/// Stateless echo agent: bounces chat messages back to their sender and
/// answers version and ping queries.
pub fn echo_handlers() -> StatelessHandlers {
    let mut handlers = StatelessHandlers::default();
    handlers.iq_get.push(Handler::new(
        "version",
        |s: &Stanza| is_query(s, ns::VERSION),
        |_, _| async { Response::with(version_element()) },
    ));
    handlers.iq_get.push(Handler::new(
        "ping",
        |s: &Stanza| first_element(s).is_some_and(|el| el.is("ping", ns::PING)),
        |_, _| async { Response::empty() },
    ));
    handlers.message.push(Handler::new(
        "echo",
        |s: &Stanza| ChatMessage::recognize(s).is_some(),
        |stanza: Stanza, ctx: Context| async move {
            let Some(chat) = ChatMessage::recognize(&stanza) else {
                return;
            };
            debug!("[Echo] echoing '{}' to {}", chat.subject, chat.from);
            let reply =
                ChatMessage::to_stanza(&chat.subject, chat.body, chat.from, ctx.jid().clone());
            if let Err(e) = ctx.send(reply).await {
                warn!("[Echo] reply failed: {}", e);
            }
        },
    ));
    handlers
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterState {
    pub friends: HashSet<Jid>,
    /// Chat messages seen since start.
    pub chats: u64,
}

impl FriendSet for RosterState {
    fn friends(&self) -> &HashSet<Jid> {
        &self.friends
    }

    fn friends_mut(&mut self) -> &mut HashSet<Jid> {
        &mut self.friends
    }

    /// Friends are kept as bare JIDs; any resource of a friend counts.
    fn is_friend(&self, jid: &Jid) -> bool {
        self.friends.contains(&jid.bare())
    }
}

/// Stateful roster agent: accepts subscriptions (optionally from one
/// domain only), lists its friends on a roster get and counts chats.
pub struct RosterAgent {
    accept_domain: Option<String>,
}

impl RosterAgent {
    pub fn new(accept_domain: Option<String>) -> Self {
        RosterAgent { accept_domain }
    }

    fn accepts(&self, jid: &Jid) -> bool {
        match &self.accept_domain {
            Some(domain) => jid.domain().eq_ignore_ascii_case(domain),
            None => true,
        }
    }
}

fn roster_element(state: &RosterState) -> Element {
    let mut friends: Vec<&Jid> = state.friends.iter().collect();
    friends.sort();
    friends.into_iter().fold(Element::new("query").with_ns(ns::ROSTER), |query, jid| {
        query.with_child(
            Element::new("item")
                .with_attr("jid", jid.as_str())
                .with_attr("subscription", "both"),
        )
    })
}

impl PresenceAgent for RosterAgent {
    type State = RosterState;

    fn init(&self, ctx: &Context) -> RosterState {
        info!("[Roster] {} starting with an empty roster", ctx.jid());
        RosterState::default()
    }

    fn handlers(&self) -> StatefulHandlers<RosterState> {
        let mut handlers = StatefulHandlers::default();
        handlers.iq_get.push(Handler::stateful(
            "roster",
            |s: &Stanza, _: &RosterState| is_query(s, ns::ROSTER),
            |_, state: RosterState, _| async move { (Response::with(roster_element(&state)), state) },
        ));
        handlers.message.push(Handler::stateful(
            "count-chats",
            |s: &Stanza, _: &RosterState| ChatMessage::recognize(s).is_some(),
            |_, mut state: RosterState, _| async move {
                state.chats += 1;
                state
            },
        ));
        handlers
    }

    fn accept_subscription(&self, mut state: RosterState, from: &Jid, _content: &[Node]) -> RosterState {
        if self.accepts(from) {
            state.add_friend(from.bare());
        }
        state
    }

    fn remove_subscription(&self, mut state: RosterState, from: &Jid) -> RosterState {
        state.remove_friend(&from.bare());
        state
    }

    fn status(&self, state: &RosterState) -> Status {
        Status::available("chat", format!("Active, {} chats", state.chats))
    }
}
