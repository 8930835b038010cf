use async_trait::async_trait;
use parley_core::presence::broadcast;
use parley_core::{
    serve, AgentConfig, Context, FriendSet, Handler, Presence, PresenceAgent, Scope,
    StatefulDispatcher, StatefulHandlers, Status,
};
use parley_stanza::{ChannelTransport, Element, Jid, Node, Response, Result, Stanza, Transport};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone, Debug, PartialEq)]
enum Event {
    Sent(Stanza),
    Teardown,
}

/// Transport that records every send, and doubles as the agent's teardown log.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    pushed: Arc<Notify>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
        self.pushed.notify_waiters();
    }

    /// Waits until at least `count` stanzas were sent. Announces are sent
    /// from their own task, so a cell barrier alone does not cover them.
    async fn wait_sent(&self, count: usize) {
        let wait = async {
            loop {
                let pushed = self.pushed.notified();
                if self.sent().len() >= count {
                    return;
                }
                pushed.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("expected stanzas were not sent");
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<Stanza> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Sent(s) => Some(s),
                Event::Teardown => None,
            })
            .collect()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, stanza: Stanza) -> Result<()> {
        self.push(Event::Sent(stanza));
        Ok(())
    }
}

/// Transport whose sends never complete.
struct Stalled;

#[async_trait]
impl Transport for Stalled {
    async fn send(&self, _stanza: Stanza) -> Result<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct BuddyState {
    friends: HashSet<Jid>,
    swallowed: u32,
}

impl FriendSet for BuddyState {
    fn friends(&self) -> &HashSet<Jid> {
        &self.friends
    }

    fn friends_mut(&mut self) -> &mut HashSet<Jid> {
        &mut self.friends
    }
}

struct Buddy {
    accept: bool,
    initial: Vec<&'static str>,
    log: Recorder,
}

impl Buddy {
    fn new(accept: bool, initial: &[&'static str], log: &Recorder) -> Self {
        Buddy {
            accept,
            initial: initial.to_vec(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl PresenceAgent for Buddy {
    type State = BuddyState;

    fn init(&self, _ctx: &Context) -> BuddyState {
        BuddyState {
            friends: self.initial.iter().map(|j| Jid::new(*j)).collect(),
            swallowed: 0,
        }
    }

    fn handlers(&self) -> StatefulHandlers<BuddyState> {
        let mut handlers = StatefulHandlers::default();
        handlers.presence.push(Handler::stateful(
            "blocklist",
            |s: &Stanza, _: &BuddyState| s.from == Jid::new("blocked@x"),
            |_, mut state: BuddyState, _| async move {
                state.swallowed += 1;
                state
            },
        ));
        handlers
    }

    async fn on_shutdown(&self, _state: &BuddyState, _scope: &Scope<BuddyState>) {
        self.log.push(Event::Teardown);
    }

    fn accept_subscription(&self, mut state: BuddyState, from: &Jid, _content: &[Node]) -> BuddyState {
        if self.accept {
            state.add_friend(from.clone());
        }
        state
    }

    fn remove_subscription(&self, mut state: BuddyState, from: &Jid) -> BuddyState {
        state.remove_friend(from);
        state
    }
}

fn own() -> Jid {
    Jid::new("buddy@x")
}

fn presence(from: &str, presence_type: &str, id: &str) -> Stanza {
    Stanza::presence(Jid::new(from))
        .with_to(own())
        .with_type(presence_type)
        .with_id(id)
}

fn friends(list: &[&str]) -> HashSet<Jid> {
    list.iter().map(|j| Jid::new(*j)).collect()
}

/// Starts the agent and waits for the connect announce to finish.
async fn start(agent: Buddy, log: &Recorder) -> StatefulDispatcher<BuddyState> {
    let announced = agent.initial.len();
    let ctx = Context::new(own(), log.clone());
    let dispatcher = StatefulDispatcher::start(Presence::new(agent, AgentConfig::default()), ctx);
    dispatcher.cell().snapshot().await.unwrap();
    log.wait_sent(announced).await;
    dispatcher
}

fn roster_get(from: &str) -> Stanza {
    Stanza::iq("get", Jid::new(from))
        .with_to(own())
        .with_id("r1")
        .with_child(Element::new("query").with_ns("jabber:iq:roster"))
}

#[tokio::test]
async fn test_subscribe_accepted() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &[], &log), &log).await;
    assert!(log.sent().is_empty(), "no friends, nothing to announce");

    dispatcher.cell().cast(presence("a@x", "subscribe", "s1")).unwrap();
    let state = dispatcher.cell().snapshot().await.unwrap();
    assert_eq!(state.friends, friends(&["a@x"]));

    let sent = log.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, Some(Jid::new("a@x")));
    assert_eq!(sent[0].from, own());
    assert_eq!(sent[0].stanza_type.as_deref(), Some("subscribed"));
    assert_eq!(sent[0].id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_subscribe_rejected() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(false, &[], &log), &log).await;

    dispatcher.cell().cast(presence("a@x", "subscribe", "s1")).unwrap();
    let state = dispatcher.cell().snapshot().await.unwrap();
    assert!(state.friends.is_empty());

    let sent = log.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].stanza_type.as_deref(), Some("unsubscribed"));
    assert_eq!(sent[0].to, Some(Jid::new("a@x")));
}

#[tokio::test]
async fn test_unsubscribe_removes_friend() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &["a@x"], &log), &log).await;
    log.clear();

    dispatcher.cell().cast(presence("a@x", "unsubscribe", "u1")).unwrap();
    let state = dispatcher.cell().snapshot().await.unwrap();
    assert!(state.friends.is_empty());

    let sent = log.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].stanza_type.as_deref(), Some("unsubscribed"));
    assert_eq!(sent[0].to, Some(Jid::new("a@x")));
    assert_eq!(sent[0].id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn test_unsubscribe_absent_friend_twice() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &["a@x"], &log), &log).await;
    let before = dispatcher.cell().snapshot().await.unwrap();
    log.clear();

    dispatcher.cell().cast(presence("b@x", "unsubscribe", "u1")).unwrap();
    dispatcher.cell().cast(presence("b@x", "unsubscribe", "u2")).unwrap();
    let after = dispatcher.cell().snapshot().await.unwrap();
    assert_eq!(after, before);

    let sent = log.sent();
    assert_eq!(sent.len(), 2);
    for (stanza, id) in sent.iter().zip(["u1", "u2"]) {
        assert_eq!(stanza.stanza_type.as_deref(), Some("unsubscribed"));
        assert_eq!(stanza.to, Some(Jid::new("b@x")));
        assert_eq!(stanza.id.as_deref(), Some(id));
    }
}

#[tokio::test]
async fn test_probe_announces_to_prober_only() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &["a@x"], &log), &log).await;
    let before = dispatcher.cell().snapshot().await.unwrap();
    log.clear();

    dispatcher.cell().cast(presence("x@y", "probe", "p1")).unwrap();
    let after = dispatcher.cell().snapshot().await.unwrap();
    assert_eq!(after.friends, before.friends);

    log.wait_sent(1).await;
    tokio::task::yield_now().await;
    let sent = log.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, Some(Jid::new("x@y")));
    assert_eq!(Status::from_stanza(&sent[0]), Some(Status::default()));
}

#[tokio::test]
async fn test_connect_announces_to_all_friends() {
    let log = Recorder::default();
    let _dispatcher = start(Buddy::new(true, &["a@x", "b@x"], &log), &log).await;

    let sent = log.sent();
    assert_eq!(sent.len(), 2);
    let targets: HashSet<Jid> = sent.iter().filter_map(|s| s.to.clone()).collect();
    assert_eq!(targets, friends(&["a@x", "b@x"]));
    assert_eq!(sent[0].payload, sent[1].payload);
    assert_eq!(sent[0].stanza_type, None);
}

#[tokio::test]
async fn test_explicit_announce_all_uses_current_friends() {
    let log = Recorder::default();
    let agent = Presence::new(Buddy::new(true, &["a@x"], &log), AgentConfig::default());
    let ctx = Context::new(own(), log.clone());
    let dispatcher = StatefulDispatcher::start(agent.clone(), ctx.clone());
    dispatcher.cell().cast(presence("b@x", "subscribe", "s1")).unwrap();
    dispatcher.cell().snapshot().await.unwrap();
    // connect announce to a@x, subscribed reply to b@x
    log.wait_sent(2).await;
    log.clear();

    agent.announce_all(dispatcher.cell(), &ctx).unwrap();
    dispatcher.cell().snapshot().await.unwrap();
    log.wait_sent(2).await;

    let targets: Vec<Jid> = log.sent().into_iter().filter_map(|s| s.to).collect();
    assert_eq!(targets, vec![Jid::new("a@x"), Jid::new("b@x")]);
}

#[tokio::test]
async fn test_shutdown_announces_offline_before_teardown() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &["a@x", "b@x"], &log), &log).await;
    log.clear();

    dispatcher.shutdown().await.unwrap();

    let events = log.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2], Event::Teardown);
    for event in &events[..2] {
        let Event::Sent(stanza) = event else {
            panic!("expected an offline announce, got {event:?}");
        };
        assert_eq!(Status::from_stanza(stanza), Some(Status::offline()));
    }
}

#[tokio::test]
async fn test_agent_presence_handlers_take_precedence() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &[], &log), &log).await;

    dispatcher
        .cell()
        .cast(presence("blocked@x", "subscribe", "s1"))
        .unwrap();
    dispatcher
        .cell()
        .cast(Stanza::presence(Jid::new("a@x")).with_to(own()))
        .unwrap();
    let state = dispatcher.cell().snapshot().await.unwrap();

    assert_eq!(state.swallowed, 1);
    assert!(state.friends.is_empty());
    assert!(log.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_reply_wait_is_bounded() {
    let log = Recorder::default();
    let ctx = Context::new(own(), Stalled);
    let dispatcher = StatefulDispatcher::start(
        Presence::new(Buddy::new(true, &[], &log), AgentConfig::default()),
        ctx,
    );

    let started = tokio::time::Instant::now();
    dispatcher.cell().cast(presence("a@x", "subscribe", "s1")).unwrap();
    let state = dispatcher.cell().snapshot().await.unwrap();

    assert_eq!(state.friends, friends(&["a@x"]));
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_served_stanzas_apply_in_arrival_order() {
    let log = Recorder::default();
    let dispatcher = start(Buddy::new(true, &[], &log), &log).await;

    let (tx, rx) = async_channel::unbounded();
    for (from, kind) in [
        ("a@x", "subscribe"),
        ("b@x", "subscribe"),
        ("a@x", "unsubscribe"),
        ("c@x", "subscribe"),
        ("c@x", "unsubscribe"),
        ("c@x", "subscribe"),
    ] {
        tx.send(presence(from, kind, "id")).await.unwrap();
    }
    drop(tx);
    serve(&dispatcher, rx).await;

    let state = dispatcher.cell().snapshot().await.unwrap();
    assert_eq!(state.friends, friends(&["b@x", "c@x"]));
}

#[tokio::test]
async fn test_broadcast_counts_deliveries() {
    let log = Recorder::default();
    let ctx = Context::new(own(), log.clone());
    let delivered = broadcast(
        &ctx,
        vec![Jid::new("a@x"), Jid::new("b@x")],
        &Status::available("away", "Out"),
    )
    .await;
    assert_eq!(delivered, 2);
    let sent = log.sent();
    assert_eq!(sent[0].payload, sent[1].payload);
}

#[tokio::test(start_paused = true)]
async fn test_full_transport_during_probe_does_not_block_calls() {
    let log = Recorder::default();
    let (transport, _outbound) = ChannelTransport::bounded(1);
    transport.send(Stanza::presence(own())).await.unwrap();
    let dispatcher = StatefulDispatcher::start(
        Presence::new(Buddy::new(true, &[], &log), AgentConfig::default()),
        Context::new(own(), transport),
    );

    dispatcher.cell().cast(presence("x@y", "probe", "p1")).unwrap();
    dispatcher.cell().snapshot().await.unwrap();

    let response = tokio::time::timeout(Duration::from_secs(3), dispatcher.cell().call(roster_get("a@x")))
        .await
        .expect("cell stalled behind the probe answer")
        .unwrap();
    assert_eq!(response, Response::bad_request());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_announces_do_not_delay_the_cell() {
    let log = Recorder::default();
    let dispatcher = StatefulDispatcher::start(
        Presence::new(Buddy::new(true, &["a@x", "b@x"], &log), AgentConfig::default()),
        Context::new(own(), Stalled),
    );
    let started = tokio::time::Instant::now();

    dispatcher.cell().cast(presence("x@y", "probe", "p1")).unwrap();
    dispatcher
        .cell()
        .cast(presence("blocked@x", "subscribe", "s1"))
        .unwrap();
    let response = tokio::time::timeout(Duration::from_secs(3), dispatcher.cell().call(roster_get("a@x")))
        .await
        .expect("cell stalled behind the connect or probe announce")
        .unwrap();
    assert!(response.is_error());

    let state = dispatcher.cell().snapshot().await.unwrap();
    assert_eq!(state.swallowed, 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}
