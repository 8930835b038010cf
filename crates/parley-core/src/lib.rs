//! parley-core: dispatch engine for Parley agents.
//!
//! - **handler**: ordered, first-match guarded handler chains.
//! - **dispatch**: the stateless concurrent discipline and the stateful
//!   serialized one, plus the `serve` loop feeding them.
//! - **presence**: subscription handling and status announces layered on
//!   the stateful discipline.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod handler;
pub mod presence;

pub use config::AgentConfig;
pub use context::Context;
pub use dispatch::{
    serve, CallChain, CastChain, Dispatch, Scope, StateCell, StatefulAgent, StatefulDispatcher,
    StatefulHandlers, StatelessChain, StatelessDispatcher, StatelessHandlers,
};
pub use handler::{Handler, HandlerChain, Resolution};
pub use presence::{FriendSet, Presence, PresenceAgent, Status};

pub use parley_stanza as stanza;
pub use parley_stanza::{ParleyError, Result};
