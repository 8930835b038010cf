//! Protocol-level vocabulary and helpers.

pub mod constants;
pub mod errors;
pub mod matchers;

pub use constants::*;
pub use errors::ErrorKind;
pub use matchers::{element_name, first_element, ChatMessage};
