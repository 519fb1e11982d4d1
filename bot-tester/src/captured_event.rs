use std::fmt;

use crate::{Address, Message};

/// What a captured event carries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Message(Message),
    Saved,
}

/// An outbound event observed from the agent during a run.
///
/// Events are numbered in arrival order across all addresses. Within one
/// address, that order is the order the host emitted them in.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CapturedEvent {
    pub(crate) sequence: u64,
    pub(crate) address: Address,
    pub(crate) payload: Payload,
}

impl CapturedEvent {
    pub(crate) fn new(sequence: u64, address: Address, payload: Payload) -> Self {
        Self {
            sequence,
            address,
            payload,
        }
    }

    /// The message, unless this is a save signal.
    #[inline]
    pub(crate) fn message(&self) -> Option<&Message> {
        match &self.payload {
            Payload::Message(message) => Some(message),
            Payload::Saved => None,
        }
    }

    #[inline]
    pub(crate) fn is_save_signal(&self) -> bool {
        matches!(self.payload, Payload::Saved)
    }

    pub(crate) fn into_message(self) -> Option<Message> {
        match self.payload {
            Payload::Message(message) => Some(message),
            Payload::Saved => None,
        }
    }
}

impl fmt::Display for CapturedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Message(message) => write!(f, "#{} {} <- {}", self.sequence, self.address, message),
            Payload::Saved => write!(f, "#{} {} <- (saved)", self.sequence, self.address),
        }
    }
}
