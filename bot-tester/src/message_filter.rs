use std::{fmt, sync::Arc};

use crate::Message;

type Predicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// A predicate deciding whether a captured outbound message is visible to
/// the test at all.
///
/// Filters run when a message is captured, before it is buffered. A message
/// that any filter rejects never counts toward a step's expected responses.
///
/// # Example
///
/// ```rust
/// use bot_tester::{Message, MessageFilter};
///
/// let no_how = MessageFilter::new(|msg| !msg.text_or_empty().contains("how"));
/// assert!(no_how.accepts(&Message::text("hello")));
/// assert!(!no_how.accepts(&Message::text("how are you?")));
/// ```
#[derive(Clone)]
pub struct MessageFilter {
    name: &'static str,
    predicate: Predicate,
}

impl MessageFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self {
            name: "custom",
            predicate: Arc::new(predicate),
        }
    }

    /// Drops "bot is typing" indicators.
    pub fn ignore_typing() -> Self {
        Self {
            name: "ignore-typing",
            predicate: Arc::new(|msg| !msg.is_typing()),
        }
    }

    /// Drops end-of-conversation markers.
    pub fn ignore_end_of_conversation() -> Self {
        Self {
            name: "ignore-end-of-conversation",
            predicate: Arc::new(|msg| !msg.is_end_of_conversation()),
        }
    }

    #[inline]
    pub fn accepts(&self, message: &Message) -> bool {
        (self.predicate)(message)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> From<F> for MessageFilter
where
    F: Fn(&Message) -> bool + Send + Sync + 'static,
{
    fn from(predicate: F) -> Self {
        MessageFilter::new(predicate)
    }
}

/// Conjunction of message filters: a message is observable iff every filter
/// accepts it. An empty chain accepts everything.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<MessageFilter>,
}

impl FilterChain {
    pub fn new(filters: impl IntoIterator<Item = MessageFilter>) -> Self {
        Self {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn push(&mut self, filter: MessageFilter) {
        self.filters.push(filter);
    }

    pub fn should_observe(&self, message: &Message) -> bool {
        self.filters.iter().all(|f| f.accepts(message))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
