//! # bot-tester
//!
//! Scripted-conversation tests for asynchronous dialog engines.
//!
//! A test feeds a sequence of inbound messages to a conversational agent and
//! asserts, per step, which messages the agent sends back: in what order,
//! within what time, and matched how. Steps run one at a time; the first
//! failure stops the run and is reported with the step that caused it.
//!
//! ## Quick Start
//!
//! ```rust
//! use bot_tester::{BotTester, LocalHost};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> bot_tester::Result {
//! let host = LocalHost::new(|session| async move {
//!     match session.text() {
//!         "Hola!" => session.send("hello!"),
//!         _ => session.send("¿qué?"),
//!     }
//! });
//!
//! BotTester::new(host)
//!     .send_message_to_bot("Hola!", ["hello!"])
//!     .send_message_to_bot("Hm?", ["¿qué?"])
//!     .run_test()
//!     .await
//! # }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BotTester`] | Builder that queues steps and runs them |
//! | [`DialogHost`] | Trait for the engine under test |
//! | [`LocalHost`] | In-process host running an async handler per message |
//! | [`Message`] | An activity exchanged with the agent |
//! | [`Address`] | Channel, user, bot and conversation a message belongs to |
//! | [`Expectation`] | What a response must look like |
//! | [`MessageFilter`] | Drops captured messages a test does not care about |
//! | [`Config`] | Default address, timeout and filters |
//!
//! ## Matching
//!
//! Text is compared exactly, patterns with [`regex::Regex`], and [`Message`]
//! templates structurally: only the fields present on the template are
//! checked, so a template carrying just `{ user: { id } }` as its address
//! accepts any message for that user. Attachments match regardless of order.
//!
//! ## Multiple users
//!
//! Plain-text stimuli go out on the default address
//! ([`Address::default_console`] unless configured). Give a [`Message`] its
//! own address to speak as someone else; responses are collected per address,
//! so interleaved users never see each other's replies.
//!
//! ## Logging
//!
//! The run emits [`tracing`] events: run start and outcome at `info`, each
//! step at `debug`, every captured event at `trace`.

mod address;
mod bot_tester;
mod captured_event;
mod config;
mod dialog_host;
mod error;
mod expectation;
mod local_host;
mod message;
mod message_filter;
mod session;
mod step_outcome;

mod internal;

pub use address::{Address, AddressBuilder, ConversationRef, Identity};
pub use bot_tester::BotTester;
pub(crate) use captured_event::{CapturedEvent, Payload};
pub use config::{Config, ConfigFile, DEFAULT_TIMEOUT};
pub use dialog_host::{DialogHost, HostEvent, SessionState, Subscription};
pub use error::{Awaiting, Error, StepKind};
pub use expectation::{Expectation, Template};
pub use local_host::LocalHost;
pub use message::{Attachment, END_OF_CONVERSATION, MESSAGE, Message, TYPING};
pub use message_filter::{FilterChain, MessageFilter};
pub use session::Session;
pub use step_outcome::{BoxError, StepOutcome};

/// Convenience alias for `Result<T, bot_tester::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
