use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Address;

/// Message type of ordinary text/card activity.
pub const MESSAGE: &str = "message";

/// Message type of the transient "bot is typing" indicator.
pub const TYPING: &str = "typing";

/// Message type signalling the bot ended the conversation.
pub const END_OF_CONVERSATION: &str = "endOfConversation";

/// A rich attachment such as an adaptive card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, content: Value) -> Self {
        Self {
            content_type: content_type.into(),
            content: Some(content),
            content_url: None,
            name: None,
        }
    }
}

/// A conversational message, inbound (stimulus) or outbound (response).
///
/// The same type doubles as a structural template in expectations: only the
/// fields set on the template are compared. `kind` always serializes, so a
/// template built with [`Message::new`] constrains the type to `"message"`.
///
/// Arbitrary channel-specific fields live in `extra` and are flattened into
/// the serialized form.
///
/// # Example
///
/// ```rust
/// use bot_tester::{Address, Message};
///
/// let msg = Message::text("hello")
///     .with_address(Address::default_console())
///     .with_field("someField", serde_json::json!({ "a": 1 }));
///
/// assert_eq!(msg.text.as_deref(), Some("hello"));
/// assert_eq!(msg.kind, "message");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_kind() -> String {
    MESSAGE.to_string()
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// An empty message of type `"message"`.
    pub fn new() -> Self {
        Self {
            kind: default_kind(),
            id: None,
            text: None,
            address: None,
            attachments: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn typing() -> Self {
        Self::new().with_kind(TYPING)
    }

    pub fn end_of_conversation() -> Self {
        Self::new().with_kind(END_OF_CONVERSATION)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Attach a custom, channel-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns the message text, or `""` when it carries none.
    #[inline]
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    #[inline]
    pub fn is_typing(&self) -> bool {
        self.kind == TYPING
    }

    #[inline]
    pub fn is_end_of_conversation(&self) -> bool {
        self.kind == END_OF_CONVERSATION
    }

    /// JSON form used for structural comparison and diagnostics.
    pub fn to_value(&self) -> Value {
        // Infallible: string keys, JSON values.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.text, self.attachments.is_empty(), self.extra.is_empty()) {
            (Some(text), true, true) if self.kind == MESSAGE => write!(f, "{text:?}"),
            _ => write!(f, "{}", self.to_value()),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::text(text)
    }
}
