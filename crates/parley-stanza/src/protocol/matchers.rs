//! Structural helpers for concrete agents.

use crate::protocol::constants::message_types;
use crate::types::{Element, Jid, Stanza};

/// First element child of the stanza payload.
#[must_use]
pub fn first_element(stanza: &Stanza) -> Option<&Element> {
    stanza.elements().next()
}

/// Local name and namespace of an element.
#[must_use]
pub fn element_name(element: &Element) -> (&str, Option<&str>) {
    (element.name.as_str(), element.ns.as_deref())
}

/// A one-to-one `chat` message carrying both a subject and a body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub subject: String,
    pub body: Element,
    pub from: Jid,
}

impl ChatMessage {
    #[must_use]
    pub fn recognize(stanza: &Stanza) -> Option<Self> {
        if stanza.category() != crate::types::Category::Message
            || !stanza.is_type(message_types::CHAT)
        {
            return None;
        }
        let subject = stanza.elements().find(|el| el.name == "subject")?;
        let body = stanza.elements().find(|el| el.name == "body")?;
        Some(ChatMessage {
            subject: subject.text(),
            body: body.clone(),
            from: stanza.from.clone(),
        })
    }

    /// Builds a chat message from `from` to `to`.
    #[must_use]
    pub fn to_stanza(subject: &str, body: Element, to: Jid, from: Jid) -> Stanza {
        Stanza::message(from)
            .with_to(to)
            .with_type(message_types::CHAT)
            .with_child(Element::new("subject").with_text(subject))
            .with_child(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn chat() -> Stanza {
        ChatMessage::to_stanza(
            "hello",
            Element::new("body").with_text("hi there"),
            Jid::new("agent@x"),
            Jid::new("a@x"),
        )
    }

    #[test]
    fn test_first_element_skips_text() {
        let stanza = Stanza::message(Jid::new("a@x")).with_payload(vec![
            Node::Text("  ".into()),
            Node::Element(Element::new("body")),
        ]);
        assert_eq!(first_element(&stanza).unwrap().name, "body");
        assert!(first_element(&Stanza::presence(Jid::new("a@x"))).is_none());
    }

    #[test]
    fn test_element_name() {
        let el = Element::new("ping").with_ns("urn:xmpp:ping");
        assert_eq!(element_name(&el), ("ping", Some("urn:xmpp:ping")));
        assert_eq!(element_name(&Element::new("x")), ("x", None));
    }

    #[test]
    fn test_recognize_chat() {
        let msg = ChatMessage::recognize(&chat()).unwrap();
        assert_eq!(msg.subject, "hello");
        assert_eq!(msg.body.text(), "hi there");
        assert_eq!(msg.from, Jid::new("a@x"));
    }

    #[test]
    fn test_recognize_requires_subject_and_body() {
        let no_subject = Stanza::message(Jid::new("a@x"))
            .with_type("chat")
            .with_child(Element::new("body").with_text("x"));
        assert!(ChatMessage::recognize(&no_subject).is_none());

        let mut groupchat = chat();
        groupchat.stanza_type = Some("groupchat".into());
        assert!(ChatMessage::recognize(&groupchat).is_none());
    }
}
