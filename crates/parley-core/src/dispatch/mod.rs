//! Dispatch disciplines and the inbound loop.

pub mod cell;
pub mod stateful;
pub mod stateless;

pub use cell::{Scope, StateCell};
pub use stateful::{CallChain, CastChain, StatefulAgent, StatefulDispatcher, StatefulHandlers};
pub use stateless::{StatelessChain, StatelessDispatcher, StatelessHandlers};

use futures::future::BoxFuture;
use parley_stanza::{Result, Stanza};
use tracing::{debug, warn};

/// Something that accepts inbound stanzas.
pub trait Dispatch: Send + Sync + 'static {
    /// Takes one stanza. Anything that must happen in arrival order is done
    /// before this returns; the future completes the rest (reply sends).
    fn dispatch(&self, stanza: Stanza) -> BoxFuture<'static, Result<()>>;
}

/// Feeds every stanza from `inbound` to `dispatcher`, one task each, until
/// the channel closes.
pub async fn serve<D: Dispatch + ?Sized>(dispatcher: &D, inbound: async_channel::Receiver<Stanza>) {
    while let Ok(stanza) = inbound.recv().await {
        let from = stanza.from.clone();
        let pending = dispatcher.dispatch(stanza);
        tokio::spawn(async move {
            if let Err(e) = pending.await {
                warn!("[Serve] stanza from {} failed: {}", from, e);
            }
        });
    }
    debug!("[Serve] inbound closed");
}
