use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::Message;

/// What an outbound message must satisfy to count as a correct response.
///
/// The variant is fixed when the expectation is built; matching dispatches on
/// it directly instead of inspecting the expected value on every comparison.
///
/// | Built from | Variant | Matches when |
/// |------------|---------|--------------|
/// | `&str`, `String` | [`Text`](Self::Text) | the text is exactly equal |
/// | [`Regex`] | [`Pattern`](Self::Pattern) | the pattern finds a match anywhere in the text |
/// | [`Message`] | [`Template`](Self::Template) | every field set on the template deep-equals the actual field |
/// | `Vec<&str>`, [`Expectation::one_of`] | [`OneOf`](Self::OneOf) | the text equals one of the candidates |
///
/// # Example
///
/// ```rust
/// use bot_tester::{Expectation, Message};
/// use regex::Regex;
///
/// let numbers = Expectation::from(Regex::new(r"^\d+").unwrap());
/// assert!(numbers.matches(&Message::text("8675309")));
///
/// let colors = Expectation::one_of(["red", "green", "blue"]);
/// assert!(colors.matches(&Message::text("green")));
/// assert!(!colors.matches(&Message::text("cheese")));
/// ```
#[derive(Debug, Clone)]
pub enum Expectation {
    Text(String),
    Pattern(Regex),
    Template(Template),
    OneOf(Vec<String>),
}

impl Expectation {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn pattern(regex: Regex) -> Self {
        Self::Pattern(regex)
    }

    pub fn template(message: Message) -> Self {
        Self::Template(Template::new(message))
    }

    pub fn one_of<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(candidates.into_iter().map(Into::into).collect())
    }

    /// Returns true if `actual` satisfies this expectation.
    pub fn matches(&self, actual: &Message) -> bool {
        match self {
            Self::Text(text) => actual.text.as_deref() == Some(text.as_str()),
            Self::Pattern(regex) => actual.text.as_deref().is_some_and(|t| regex.is_match(t)),
            Self::Template(template) => template.matches(actual),
            Self::OneOf(candidates) => actual
                .text
                .as_deref()
                .is_some_and(|t| candidates.iter().any(|c| c == t)),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            Self::Template(template) => write!(f, "{}", template.shape),
            Self::OneOf(candidates) => write!(f, "one of {candidates:?}"),
        }
    }
}

/// A partial message compared by recursive subset equality.
///
/// The JSON shape of the template is computed once, at construction.
#[derive(Debug, Clone)]
pub struct Template {
    shape: Value,
}

impl Template {
    pub fn new(message: Message) -> Self {
        Self {
            shape: message.to_value(),
        }
    }

    pub fn matches(&self, actual: &Message) -> bool {
        contains_subset(&self.shape, &actual.to_value())
    }
}

/// Recursive partial deep-equality.
///
/// - objects: every key of `expected` must exist in `actual` and match
///   recursively; extra keys in `actual` are ignored
/// - arrays: order-insensitive, every expected element must match some
///   actual element
/// - scalars: plain equality
pub(crate) fn contains_subset(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .iter()
            .all(|(key, e)| actual.get(key).is_some_and(|a| contains_subset(e, a))),
        (Value::Array(expected), Value::Array(actual)) => expected
            .iter()
            .all(|e| actual.iter().any(|a| contains_subset(e, a))),
        (expected, actual) => expected == actual,
    }
}

impl From<&str> for Expectation {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Expectation {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Expectation {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Regex> for Expectation {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl From<&Regex> for Expectation {
    fn from(regex: &Regex) -> Self {
        Self::Pattern(regex.clone())
    }
}

impl From<Message> for Expectation {
    fn from(message: Message) -> Self {
        Self::template(message)
    }
}

impl From<&Message> for Expectation {
    fn from(message: &Message) -> Self {
        Self::template(message.clone())
    }
}

impl From<Vec<&str>> for Expectation {
    fn from(candidates: Vec<&str>) -> Self {
        Self::one_of(candidates)
    }
}

impl From<Vec<String>> for Expectation {
    fn from(candidates: Vec<String>) -> Self {
        Self::OneOf(candidates)
    }
}

impl From<&[&str]> for Expectation {
    fn from(candidates: &[&str]) -> Self {
        Self::one_of(candidates.iter().copied())
    }
}
