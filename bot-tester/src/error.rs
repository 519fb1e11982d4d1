use std::{fmt, sync::Arc, time::Duration};

use crate::{Address, Message};

/// What a timed-out await was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiting {
    Messages(usize),
    SaveSignal,
}

impl fmt::Display for Awaiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Awaiting::Messages(1) => write!(f, "1 message"),
            Awaiting::Messages(n) => write!(f, "{n} messages"),
            Awaiting::SaveSignal => write!(f, "a save signal"),
        }
    }
}

/// The kind of step that failed, reported alongside its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    SendAndExpect,
    SendAndExpectUnordered,
    SendAndExpectSave,
    Inspect,
    Delay,
    Work,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::SendAndExpect => "send_message_to_bot",
            StepKind::SendAndExpectUnordered => "send_message_to_bot_ignoring_response_order",
            StepKind::SendAndExpectSave => "send_message_to_bot_and_expect_save_with_no_response",
            StepKind::Inspect => "check_session",
            StepKind::Delay => "wait",
            StepKind::Work => "then",
        };
        f.write_str(name)
    }
}

/// The single error type for all bot-tester operations.
///
/// A failed run returns [`Error::Step`], which names the failing step and
/// wraps the underlying cause. Use [`cause`](Self::cause) to get at it:
///
/// ```ignore
/// let err = tester.run_test().await.unwrap_err();
/// assert_eq!(err.step(), Some(1));
/// assert!(matches!(err.cause(), Error::Timeout { .. }));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("step {index} ({kind}) failed: {source}")]
    Step {
        index: usize,
        kind: StepKind,
        #[source]
        source: Box<Error>,
    },

    #[error("response {index} did not match: expected {expected}, got {actual}")]
    Mismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("no response satisfied {unmatched:?} (received {received:?})")]
    UnmatchedSet {
        unmatched: Vec<String>,
        received: Vec<String>,
    },

    #[error("timed out after {timeout:?} waiting for {awaiting} at {address}: {} arrived", .received.len())]
    Timeout {
        address: Address,
        awaiting: Awaiting,
        timeout: Duration,
        received: Vec<Message>,
    },

    #[error("expected no response at {address}, got {message}")]
    UnexpectedResponse {
        address: Address,
        message: Box<Message>,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("the dialog host already has an active subscriber")]
    AlreadySubscribed,

    #[error("the dialog host closed its event stream")]
    HostClosed,

    #[error("callback failed: {0}")]
    Callback(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("external error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn callback(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Callback(Arc::from(e))
    }

    pub(crate) fn in_step(self, index: usize, kind: StepKind) -> Self {
        Error::Step {
            index,
            kind,
            source: Box::new(self),
        }
    }

    /// The underlying failure, with any step wrapper removed.
    pub fn cause(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Index (0-based) of the step that failed, if this error came from a run.
    pub fn step(&self) -> Option<usize> {
        match self {
            Error::Step { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::External(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Configuration(e.to_string())
    }
}
