//! The status an agent announces to its friends.

use parley_stanza::protocol::presence_types;
use parley_stanza::{Element, Jid, Kind, Stanza};

/// Status content plus an optional presence type. No type means available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub show: Option<String>,
    pub text: Option<String>,
    pub presence_type: Option<String>,
    pub extra: Vec<Element>,
}

impl Default for Status {
    /// `chat` / `Active`, available.
    fn default() -> Self {
        Status::available("chat", "Active")
    }
}

impl Status {
    #[must_use]
    pub fn available(show: impl Into<String>, text: impl Into<String>) -> Self {
        Status {
            show: Some(show.into()),
            text: Some(text.into()),
            presence_type: None,
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn unavailable(text: impl Into<String>) -> Self {
        Status {
            show: None,
            text: Some(text.into()),
            presence_type: Some(presence_types::UNAVAILABLE.to_string()),
            extra: Vec::new(),
        }
    }

    /// `Offline`, unavailable.
    #[must_use]
    pub fn offline() -> Self {
        Status::unavailable("Offline")
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.extra.push(element);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.presence_type.is_none()
    }

    /// `<show/>`, `<status/>`, then any extra elements.
    #[must_use]
    pub fn content(&self) -> Vec<Element> {
        let mut content = Vec::with_capacity(2 + self.extra.len());
        if let Some(show) = &self.show {
            content.push(Element::new("show").with_text(show.clone()));
        }
        if let Some(text) = &self.text {
            content.push(Element::new("status").with_text(text.clone()));
        }
        content.extend(self.extra.iter().cloned());
        content
    }

    #[must_use]
    pub fn to_stanza(&self, from: &Jid, to: Jid) -> Stanza {
        let mut stanza = Stanza::presence(from.clone()).with_to(to);
        stanza.stanza_type = self.presence_type.clone();
        for element in self.content() {
            stanza = stanza.with_child(element);
        }
        stanza
    }

    /// Reads a status back out of an availability presence. Subscription
    /// management presences are not statuses.
    #[must_use]
    pub fn from_stanza(stanza: &Stanza) -> Option<Self> {
        if stanza.kind != Kind::Presence {
            return None;
        }
        match stanza.stanza_type.as_deref() {
            None | Some(presence_types::UNAVAILABLE) => {}
            Some(_) => return None,
        }
        let mut status = Status {
            show: None,
            text: None,
            presence_type: stanza.stanza_type.clone(),
            extra: Vec::new(),
        };
        for element in stanza.elements() {
            match element.name.as_str() {
                "show" => status.show = Some(element.text()),
                "status" => status.text = Some(element.text()),
                _ => status.extra.push(element.clone()),
            }
        }
        Some(status)
    }
}
