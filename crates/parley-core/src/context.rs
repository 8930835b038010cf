//! Service context handed to every handler.

use parley_stanza::{Jid, Result, Stanza, Transport};
use std::sync::Arc;

/// This agent's own address plus the outbound `send` primitive.
#[derive(Clone)]
pub struct Context {
    jid: Jid,
    transport: Arc<dyn Transport>,
}

impl Context {
    pub fn new(jid: Jid, transport: impl Transport) -> Self {
        Context {
            jid,
            transport: Arc::new(transport),
        }
    }

    pub fn from_shared(jid: Jid, transport: Arc<dyn Transport>) -> Self {
        Context { jid, transport }
    }

    #[inline]
    #[must_use]
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    pub async fn send(&self, stanza: Stanza) -> Result<()> {
        self.transport.send(stanza).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("jid", &self.jid).finish()
    }
}
