use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a participant (user or bot) on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// An identity constrained only by its id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    fn matches(&self, actual: &Identity) -> bool {
        field_matches(&self.id, &actual.id) && field_matches(&self.name, &actual.name)
    }
}

/// Reference to the conversation a message belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ConversationRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// Routing identity of a message: channel, user, bot and conversation.
///
/// Every field is optional so the same type serves two purposes:
///
/// - a *full* address attached to stimuli and captured responses, compared
///   with `==`;
/// - a *partial* address used as an expectation, compared with
///   [`matches`](Self::matches), where absent fields act as wildcards.
///
/// # Example
///
/// ```rust
/// use bot_tester::{Address, Identity};
///
/// let full = Address::default_console();
/// let partial = Address::builder().user(Identity::with_id("user1")).build();
///
/// assert!(partial.matches(&full));
/// assert_ne!(partial, full);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationRef>,
}

impl Address {
    /// Fully populated address.
    pub fn new(
        channel_id: impl Into<String>,
        user: Identity,
        bot: Identity,
        conversation: ConversationRef,
    ) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            user: Some(user),
            bot: Some(bot),
            conversation: Some(conversation),
        }
    }

    /// The address used for plain-text steps unless the configuration
    /// replaces it.
    pub fn default_console() -> Self {
        Self::new(
            "console",
            Identity::new("user1", "user1"),
            Identity::new("bot", "Bot"),
            ConversationRef::new("user1Conversation"),
        )
    }

    pub fn builder() -> AddressBuilder {
        AddressBuilder::default()
    }

    /// Partial match: every field present on `self` must equal the
    /// corresponding field of `actual`. Absent fields are unconstrained,
    /// including fields nested inside `user`, `bot` and `conversation`.
    pub fn matches(&self, actual: &Address) -> bool {
        field_matches(&self.channel_id, &actual.channel_id)
            && nested_matches(&self.user, &actual.user, Identity::matches)
            && nested_matches(&self.bot, &actual.bot, Identity::matches)
            && nested_matches(&self.conversation, &actual.conversation, |e, a| {
                field_matches(&e.id, &a.id)
            })
    }

    /// Key under which a host persists per-user and per-conversation state.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.id.as_deref())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().and_then(|c| c.id.as_deref())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.channel_id.as_deref().unwrap_or("*"),
            self.user_id().unwrap_or("*"),
            self.conversation_id().unwrap_or("*"),
        )
    }
}

fn field_matches<T: PartialEq>(expected: &Option<T>, actual: &Option<T>) -> bool {
    match expected {
        None => true,
        Some(e) => actual.as_ref() == Some(e),
    }
}

fn nested_matches<T>(expected: &Option<T>, actual: &Option<T>, f: impl Fn(&T, &T) -> bool) -> bool {
    match (expected, actual) {
        (None, _) => true,
        (Some(e), Some(a)) => f(e, a),
        (Some(_), None) => false,
    }
}

/// Incremental construction of (possibly partial) addresses.
#[derive(Debug, Clone, Default)]
pub struct AddressBuilder {
    address: Address,
}

impl AddressBuilder {
    pub fn channel(mut self, channel_id: impl Into<String>) -> Self {
        self.address.channel_id = Some(channel_id.into());
        self
    }

    pub fn user(mut self, user: Identity) -> Self {
        self.address.user = Some(user);
        self
    }

    pub fn bot(mut self, bot: Identity) -> Self {
        self.address.bot = Some(bot);
        self
    }

    pub fn conversation(mut self, id: impl Into<String>) -> Self {
        self.address.conversation = Some(ConversationRef::new(id));
        self
    }

    pub fn build(self) -> Address {
        self.address
    }
}
