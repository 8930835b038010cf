//! Status announces to friends.

use crate::context::Context;
use crate::dispatch::StateCell;
use crate::presence::{FriendSet, PresenceAgent, Status};
use futures::FutureExt;
use parley_stanza::{Jid, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Who a queued announce goes to.
pub(crate) enum Audience {
    Friends,
    One(Jid),
}

/// Current friends in a stable order.
pub(crate) fn sorted_friends<S: FriendSet>(state: &S) -> Vec<Jid> {
    let mut friends: Vec<Jid> = state.friends().iter().cloned().collect();
    friends.sort();
    friends
}

/// Queues an announce job in the cell. Status and targets are read from the
/// state the job sees, not the state at the time of queueing; the sends run
/// on their own task so the cell never waits on them.
pub(crate) fn queue<A: PresenceAgent>(
    agent: Arc<A>,
    cell: &StateCell<A::State>,
    ctx: Context,
    audience: Audience,
) -> Result<()> {
    cell.inspect(move |state: &A::State| {
        let status = agent.status(state);
        let targets = match audience {
            Audience::Friends => sorted_friends(state),
            Audience::One(jid) => vec![jid],
        };
        tokio::spawn(async move {
            broadcast(&ctx, targets, &status).await;
        });
        async {}.boxed()
    })
}

/// Sends `status` to each target in turn, awaiting every send. Returns how
/// many the transport accepted.
pub async fn broadcast(ctx: &Context, targets: Vec<Jid>, status: &Status) -> usize {
    let total = targets.len();
    let mut delivered = 0;
    for jid in targets {
        match ctx.send(status.to_stanza(ctx.jid(), jid.clone())).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("[Presence] announce to {} failed: {}", jid, e),
        }
    }
    debug!(delivered, total, available = status.is_available(), "[Presence] announce done");
    delivered
}
