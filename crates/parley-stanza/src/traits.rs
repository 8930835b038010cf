use crate::error::Result;
use crate::types::Stanza;
use async_trait::async_trait;
use std::sync::Arc;

/// Abstraction for the outbound side of a stream.
///
/// `send` resolves once the stanza has been handed to the wire. How long
/// that takes, and whether it ever fails, is the implementation's contract.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, stanza: Stanza) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, stanza: Stanza) -> Result<()> {
        (**self).send(stanza).await
    }
}
