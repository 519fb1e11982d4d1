use std::{fmt, future::Future, time::Duration};

use futures_util::FutureExt;

use crate::{
    Address, Config, DialogHost, Expectation, Message, MessageFilter, Result, SessionState,
    StepOutcome,
    internal::{Runner, Step},
};

/// Scripts a conversation against a [`DialogHost`] and checks what comes back.
///
/// Steps are queued by the builder methods and run, in order, by
/// [`run_test`](Self::run_test). Nothing is sent before that. The first step
/// that fails stops the run and its error names the step.
///
/// # Example
///
/// ```rust
/// use bot_tester::{BotTester, LocalHost};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> bot_tester::Result {
/// let host = LocalHost::new(|session| async move {
///     session.send("hello!");
///     session.send("how are you doing?");
/// });
///
/// BotTester::new(host)
///     .send_message_to_bot("Hola!", ["hello!", "how are you doing?"])
///     .run_test()
///     .await
/// # }
/// ```
///
/// # Expectations
///
/// Anything convertible into an [`Expectation`] can be listed:
///
/// - `&str` / `String`: exact text
/// - [`regex::Regex`]: the text matches the pattern
/// - [`Message`]: structural template; only fields present on it are checked
/// - `Vec<&str>` or [`Expectation::one_of`]: the text is one of the candidates
///
/// Mixed lists are written as `[Expectation::from(..), ..]`. Pass
/// `None::<&str>` to send a message without waiting for any reply.
#[must_use = "steps only run when run_test() is awaited"]
pub struct BotTester<H: DialogHost> {
    host: H,
    config: Config,
    steps: Vec<Step>,
}

impl<H: DialogHost> BotTester<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn with_config(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            steps: Vec::new(),
        }
    }

    /// Send `stimulus` and expect the listed responses, in this order.
    ///
    /// A plain-text stimulus goes out on the default address; a [`Message`]
    /// carrying an address is sent as is.
    pub fn send_message_to_bot<I>(mut self, stimulus: impl Into<Message>, expectations: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expectation>,
    {
        self.steps.push(Step::SendAndExpect {
            stimulus: stimulus.into(),
            expectations: expectations.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Like [`send_message_to_bot`](Self::send_message_to_bot), but the
    /// responses may arrive in any order. The number of responses must still
    /// match.
    pub fn send_message_to_bot_ignoring_response_order<I>(
        mut self,
        stimulus: impl Into<Message>,
        expectations: I,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expectation>,
    {
        self.steps.push(Step::SendAndExpectUnordered {
            stimulus: stimulus.into(),
            expectations: expectations.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Send `stimulus` and expect the agent to persist its state without
    /// replying.
    pub fn send_message_to_bot_and_expect_save_with_no_response(
        mut self,
        stimulus: impl Into<Message>,
    ) -> Self {
        self.steps.push(Step::SendAndExpectSave {
            stimulus: stimulus.into(),
        });
        self
    }

    /// Inspect the state persisted for the default address.
    ///
    /// The callback may assert (a panic propagates unchanged) or return a
    /// `Result`, whose error fails the step.
    pub fn check_session<F, R>(mut self, inspect: F) -> Self
    where
        F: FnOnce(&SessionState) -> R + Send + 'static,
        R: StepOutcome,
    {
        self.steps.push(Step::Inspect {
            address: None,
            callback: Box::new(move |state: &SessionState| inspect(state).into_outcome()),
        });
        self
    }

    /// Inspect the state persisted for `address`.
    pub fn check_session_for<F, R>(mut self, address: Address, inspect: F) -> Self
    where
        F: FnOnce(&SessionState) -> R + Send + 'static,
        R: StepOutcome,
    {
        self.steps.push(Step::Inspect {
            address: Some(address),
            callback: Box::new(move |state: &SessionState| inspect(state).into_outcome()),
        });
        self
    }

    /// Run arbitrary work between steps.
    pub fn then<F, R>(mut self, work: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: StepOutcome,
    {
        self.steps.push(Step::Work(Box::new(move || {
            let outcome = work().into_outcome();
            async move { outcome }.boxed()
        })));
        self
    }

    /// Run arbitrary asynchronous work between steps.
    pub fn then_async<F, Fut>(mut self, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: StepOutcome,
    {
        self.steps.push(Step::Work(Box::new(move || {
            async move { work().await.into_outcome() }.boxed()
        })));
        self
    }

    /// Pause the script. Responses arriving meanwhile stay buffered.
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Delay(duration));
        self
    }

    /// Drop captured messages the filter rejects. Filters apply to the whole
    /// run, whatever step they were added after.
    pub fn add_message_filter(mut self, filter: impl Into<MessageFilter>) -> Self {
        self.config.add_message_filter(filter.into());
        self
    }

    /// How long each step waits for its responses.
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.config.set_timeout(timeout);
        self
    }

    pub fn ignore_typing_event(mut self) -> Self {
        self.config = self.config.with_ignore_typing_event(true);
        self
    }

    pub fn ignore_end_of_conversation_event(mut self) -> Self {
        self.config = self.config.with_ignore_end_of_conversation_event(true);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of queued steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the queued steps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Step`](crate::Error::Step) wrapping the first failure,
    /// or the host's error if subscribing to it fails.
    pub async fn run_test(self) -> Result {
        Runner::new(self.host, self.config).run(self.steps).await
    }
}

impl<H: DialogHost> fmt::Debug for BotTester<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotTester")
            .field("config", &self.config)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
