//! Protocol constants: namespaces and `type` attribute values.
//!
//! | Stanza | Values |
//! |--------|--------|
//! | iq | `get`, `set`, `result`, `error` |
//! | message | `chat`, `normal`, `groupchat`, `headline`, `error` |
//! | presence | `subscribe`, `subscribed`, `unsubscribe`, `unsubscribed`, `probe`, `unavailable`, `error` |

/// Namespace of stanza error conditions.
pub const STANZA_ERROR_NS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

pub mod ns {
    pub const VERSION: &str = "jabber:iq:version";
    pub const ROSTER: &str = "jabber:iq:roster";
    pub const PING: &str = "urn:xmpp:ping";
}

pub mod iq_types {
    pub const GET: &str = "get";
    pub const SET: &str = "set";
    pub const RESULT: &str = "result";
    pub const ERROR: &str = "error";
}

pub mod message_types {
    pub const CHAT: &str = "chat";
    pub const NORMAL: &str = "normal";
    pub const ERROR: &str = "error";
}

pub mod presence_types {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const SUBSCRIBED: &str = "subscribed";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const UNSUBSCRIBED: &str = "unsubscribed";
    pub const PROBE: &str = "probe";
    pub const UNAVAILABLE: &str = "unavailable";
}
