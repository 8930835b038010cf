//! Addressing identity of a protocol participant.

use crate::error::ParleyError;
use std::fmt;
use std::str::FromStr;

/// An opaque JID (`node@domain/resource`).
///
/// Comparison and hashing are on the full string. The accessors split on
/// `@` and `/` without validating anything; validation belongs to the
/// transport that produced the address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Jid(String);

impl Jid {
    #[inline]
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Jid(s.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `@`, if any.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        let bare = self.bare_str();
        bare.split_once('@').map(|(node, _)| node)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        let bare = self.bare_str();
        match bare.split_once('@') {
            Some((_, domain)) => domain,
            None => bare,
        }
    }

    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, resource)| resource)
    }

    /// The address with any resource stripped.
    #[must_use]
    pub fn bare(&self) -> Jid {
        Jid(self.bare_str().to_string())
    }

    fn bare_str(&self) -> &str {
        match self.0.split_once('/') {
            Some((bare, _)) => bare,
            None => &self.0,
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Jid {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParleyError::InvalidJid(s.to_string()));
        }
        Ok(Jid(trimmed.to_string()))
    }
}

impl From<&str> for Jid {
    fn from(s: &str) -> Self {
        Jid::new(s)
    }
}

impl From<String> for Jid {
    fn from(s: String) -> Self {
        Jid(s)
    }
}
