//! parley-stanza: the data model shared by Parley agents.
//!
//! - **types**: `Jid`, the `Element`/`Node` content tree, `Stanza` and `Response`.
//! - **protocol**: namespaces, the stanza error catalog and structural matchers.
//! - **traits**: the `Transport` seam a wire implementation plugs into.
//! - **channel**: an in-memory `Transport` backed by `async-channel`.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod traits;
pub mod types;

pub use channel::ChannelTransport;
pub use error::{ParleyError, Result};
pub use protocol::{ChatMessage, ErrorKind};
pub use traits::Transport;
pub use types::{Category, Element, Jid, Kind, Node, Response, Stanza};
