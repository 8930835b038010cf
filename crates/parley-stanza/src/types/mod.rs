pub mod element;
pub mod jid;
pub mod response;
pub mod stanza;

pub use element::{Element, Node};
pub use jid::Jid;
pub use response::Response;
pub use stanza::{Category, Kind, Stanza};
