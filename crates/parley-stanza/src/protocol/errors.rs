//! Stanza error catalog.

/// Defined stanza error conditions and their default error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Conflict,
    FeatureNotImplemented,
    Forbidden,
    ItemNotFound,
    NotAllowed,
    NotAuthorized,
    ServiceUnavailable,
    InternalServerError,
    RecipientUnavailable,
}

const ALL: [ErrorKind; 10] = [
    ErrorKind::BadRequest,
    ErrorKind::Conflict,
    ErrorKind::FeatureNotImplemented,
    ErrorKind::Forbidden,
    ErrorKind::ItemNotFound,
    ErrorKind::NotAllowed,
    ErrorKind::NotAuthorized,
    ErrorKind::ServiceUnavailable,
    ErrorKind::InternalServerError,
    ErrorKind::RecipientUnavailable,
];

impl ErrorKind {
    /// Element name of the condition.
    #[must_use]
    pub fn condition(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Conflict => "conflict",
            ErrorKind::FeatureNotImplemented => "feature-not-implemented",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::ItemNotFound => "item-not-found",
            ErrorKind::NotAllowed => "not-allowed",
            ErrorKind::NotAuthorized => "not-authorized",
            ErrorKind::ServiceUnavailable => "service-unavailable",
            ErrorKind::InternalServerError => "internal-server-error",
            ErrorKind::RecipientUnavailable => "recipient-unavailable",
        }
    }

    /// Value of the `type` attribute on `<error/>`.
    #[must_use]
    pub fn error_type(self) -> &'static str {
        match self {
            ErrorKind::BadRequest | ErrorKind::NotAllowed => "modify",
            ErrorKind::NotAuthorized => "auth",
            ErrorKind::Forbidden => "auth",
            ErrorKind::InternalServerError | ErrorKind::RecipientUnavailable => "wait",
            ErrorKind::Conflict
            | ErrorKind::FeatureNotImplemented
            | ErrorKind::ItemNotFound
            | ErrorKind::ServiceUnavailable => "cancel",
        }
    }

    #[must_use]
    pub fn from_condition(name: &str) -> Option<Self> {
        ALL.into_iter().find(|kind| kind.condition() == name)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.condition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request() {
        assert_eq!(ErrorKind::BadRequest.condition(), "bad-request");
        assert_eq!(ErrorKind::BadRequest.error_type(), "modify");
        assert_eq!(ErrorKind::BadRequest.to_string(), "bad-request");
    }

    #[test]
    fn test_condition_lookup_is_total_over_catalog() {
        for kind in ALL {
            assert_eq!(ErrorKind::from_condition(kind.condition()), Some(kind));
        }
        assert_eq!(ErrorKind::from_condition("gone"), None);
    }

    #[test]
    fn test_error_types() {
        assert_eq!(ErrorKind::ServiceUnavailable.error_type(), "cancel");
        assert_eq!(ErrorKind::NotAuthorized.error_type(), "auth");
        assert_eq!(ErrorKind::RecipientUnavailable.error_type(), "wait");
    }
}
