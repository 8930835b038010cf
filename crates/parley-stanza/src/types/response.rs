//! Reply values produced by query handlers.

use crate::protocol::ErrorKind;
use crate::types::Element;

/// What a query handler answers with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Successful result carrying zero or more payload elements.
    Result(Vec<Element>),
    /// Error reply with a catalog condition.
    Error(ErrorKind),
}

impl Response {
    /// An empty `result`.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Response::Result(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn with(element: Element) -> Self {
        Response::Result(vec![element])
    }

    #[inline]
    #[must_use]
    pub fn bad_request() -> Self {
        Response::Error(ErrorKind::BadRequest)
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}
