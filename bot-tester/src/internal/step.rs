use std::{fmt, time::Duration};

use futures_util::future::BoxFuture;

use crate::{Address, Expectation, Message, SessionState, StepKind, step_outcome::BoxError};

pub(crate) type InspectFn = Box<dyn FnOnce(&SessionState) -> Result<(), BoxError> + Send>;
pub(crate) type WorkFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// One queued unit of a conversation test.
pub(crate) enum Step {
    SendAndExpect {
        stimulus: Message,
        expectations: Vec<Expectation>,
    },
    SendAndExpectUnordered {
        stimulus: Message,
        expectations: Vec<Expectation>,
    },
    SendAndExpectSave {
        stimulus: Message,
    },
    Inspect {
        address: Option<Address>,
        callback: InspectFn,
    },
    Delay(Duration),
    Work(WorkFn),
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::SendAndExpect { .. } => StepKind::SendAndExpect,
            Step::SendAndExpectUnordered { .. } => StepKind::SendAndExpectUnordered,
            Step::SendAndExpectSave { .. } => StepKind::SendAndExpectSave,
            Step::Inspect { .. } => StepKind::Inspect,
            Step::Delay(_) => StepKind::Delay,
            Step::Work(_) => StepKind::Work,
        }
    }

    /// The stimulus this step sends, if any.
    pub fn stimulus(&self) -> Option<&Message> {
        match self {
            Step::SendAndExpect { stimulus, .. }
            | Step::SendAndExpectUnordered { stimulus, .. }
            | Step::SendAndExpectSave { stimulus } => Some(stimulus),
            _ => None,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::SendAndExpect {
                stimulus,
                expectations,
            }
            | Step::SendAndExpectUnordered {
                stimulus,
                expectations,
            } => f
                .debug_struct(&self.kind().to_string())
                .field("stimulus", stimulus)
                .field("expectations", &expectations.len())
                .finish(),
            Step::SendAndExpectSave { stimulus } => f
                .debug_struct(&self.kind().to_string())
                .field("stimulus", stimulus)
                .finish(),
            Step::Inspect { address, .. } => f
                .debug_struct(&self.kind().to_string())
                .field("address", address)
                .finish_non_exhaustive(),
            Step::Delay(duration) => f.debug_tuple("wait").field(duration).finish(),
            Step::Work(_) => f.write_str("then(..)"),
        }
    }
}
