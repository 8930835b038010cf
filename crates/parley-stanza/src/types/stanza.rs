//! The stanza envelope and its dispatch category.

use crate::protocol::constants::{iq_types, STANZA_ERROR_NS};
use crate::protocol::ErrorKind;
use crate::types::{Element, Jid, Node, Response};
use serde::{Deserialize, Serialize};

/// Top-level element kind of a stanza.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Iq,
    Message,
    Presence,
    #[serde(untagged)]
    Other(String),
}

/// The five dispatch categories a handler chain is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    QueryGet,
    QuerySet,
    Message,
    Presence,
    Other,
}

impl Category {
    #[inline]
    #[must_use]
    pub fn is_query(self) -> bool {
        matches!(self, Category::QueryGet | Category::QuerySet)
    }
}

/// One protocol message unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    pub kind: Kind,
    pub from: Jid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Jid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub stanza_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<Node>,
}

impl Stanza {
    #[must_use]
    pub fn new(kind: Kind, from: Jid) -> Self {
        Stanza {
            kind,
            from,
            to: None,
            id: None,
            stanza_type: None,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn iq(iq_type: &str, from: Jid) -> Self {
        Stanza::new(Kind::Iq, from).with_type(iq_type)
    }

    #[must_use]
    pub fn message(from: Jid) -> Self {
        Stanza::new(Kind::Message, from)
    }

    #[must_use]
    pub fn presence(from: Jid) -> Self {
        Stanza::new(Kind::Presence, from)
    }

    pub fn with_to(mut self, to: Jid) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, stanza_type: impl Into<String>) -> Self {
        self.stanza_type = Some(stanza_type.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.payload.push(Node::Element(child));
        self
    }

    pub fn with_payload(mut self, payload: Vec<Node>) -> Self {
        self.payload = payload;
        self
    }

    /// Maps the stanza onto the category its handler chain is keyed by.
    ///
    /// Only `get` and `set` queries are requests; iq `result` and `error`
    /// land in `Other`.
    #[must_use]
    pub fn category(&self) -> Category {
        match &self.kind {
            Kind::Iq => match self.stanza_type.as_deref() {
                Some(iq_types::GET) => Category::QueryGet,
                Some(iq_types::SET) => Category::QuerySet,
                _ => Category::Other,
            },
            Kind::Message => Category::Message,
            Kind::Presence => Category::Presence,
            Kind::Other(_) => Category::Other,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_type(&self, stanza_type: &str) -> bool {
        self.stanza_type.as_deref() == Some(stanza_type)
    }

    /// Copy of the addressing fields without the payload.
    #[must_use]
    pub fn header(&self) -> Stanza {
        Stanza {
            kind: self.kind.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            id: self.id.clone(),
            stanza_type: self.stanza_type.clone(),
            payload: Vec::new(),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.payload.iter().filter_map(Node::as_element)
    }

    /// Builds the iq answering this request.
    #[must_use]
    pub fn reply(&self, from: &Jid, response: Response) -> Stanza {
        match response {
            Response::Result(elements) => Stanza {
                kind: Kind::Iq,
                from: from.clone(),
                to: Some(self.from.clone()),
                id: self.id.clone(),
                stanza_type: Some(iq_types::RESULT.to_string()),
                payload: elements.into_iter().map(Node::Element).collect(),
            },
            Response::Error(kind) => self.result_error(from, kind),
        }
    }

    /// Error reply of the same kind, echoing the original payload and
    /// appending the `<error/>` condition.
    #[must_use]
    pub fn result_error(&self, from: &Jid, kind: ErrorKind) -> Stanza {
        let condition = Element::new(kind.condition()).with_ns(STANZA_ERROR_NS);
        let error = Element::new("error")
            .with_attr("type", kind.error_type())
            .with_child(condition);

        let mut payload = self.payload.clone();
        payload.push(Node::Element(error));

        Stanza {
            kind: self.kind.clone(),
            from: from.clone(),
            to: Some(self.from.clone()),
            id: self.id.clone(),
            stanza_type: Some("error".to_string()),
            payload,
        }
    }

    /// Condition of an error stanza, if it carries a known one.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if !self.is_type("error") {
            return None;
        }
        self.elements()
            .find(|el| el.name == "error")?
            .elements()
            .find_map(|el| ErrorKind::from_condition(&el.name))
    }
}
