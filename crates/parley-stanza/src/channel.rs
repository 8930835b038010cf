//! In-memory transport over an `async-channel` pair.

use crate::error::{ParleyError, Result};
use crate::traits::Transport;
use crate::types::Stanza;
use async_trait::async_trait;
use tracing::debug;

/// Transport whose outbound stanzas land on a channel receiver.
///
/// Bounded channels apply backpressure: `send` waits while the receiver
/// is behind.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: async_channel::Sender<Stanza>,
}

impl ChannelTransport {
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, async_channel::Receiver<Stanza>) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }

    #[must_use]
    pub fn unbounded() -> (Self, async_channel::Receiver<Stanza>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, stanza: Stanza) -> Result<()> {
        debug!(kind = ?stanza.kind, to = ?stanza.to, "[Channel] send");
        self.tx.send(stanza).await.map_err(|_| ParleyError::Closed)
    }
}
