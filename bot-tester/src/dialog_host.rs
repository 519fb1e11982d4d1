use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{Address, Message, Result};

/// An outbound event emitted by the dialog engine under test.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The agent sent a message to `address`.
    Message { address: Address, message: Message },
    /// The agent persisted its conversational state for `address`.
    Saved { address: Address },
}

impl HostEvent {
    pub fn address(&self) -> &Address {
        match self {
            HostEvent::Message { address, .. } | HostEvent::Saved { address } => address,
        }
    }
}

/// Persisted conversational state, as read back by `check_session` steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub user_data: Map<String, Value>,
    #[serde(default)]
    pub conversation_data: Map<String, Value>,
    #[serde(default)]
    pub private_conversation_data: Map<String, Value>,
}

/// The receiving end of a host's outbound event stream.
///
/// A host hands out at most one live subscription at a time. Dropping it
/// releases the host, and cancels any work the host tied to it via
/// [`with_cancellation`](Self::with_cancellation).
#[derive(Debug)]
pub struct Subscription {
    receiver: UnboundedReceiver<HostEvent>,
    _guard: Option<DropGuard>,
}

impl Subscription {
    pub fn new(receiver: UnboundedReceiver<HostEvent>) -> Self {
        Self {
            receiver,
            _guard: None,
        }
    }

    /// Cancel `token` when this subscription is dropped.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self._guard = Some(token.drop_guard());
        self
    }

    /// Wait for the next event. Returns `None` once the host closed the stream.
    pub async fn recv(&mut self) -> Option<HostEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<HostEvent, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// The dialog engine a [`BotTester`](crate::BotTester) drives.
///
/// The tester only needs three things from it: a way to inject inbound
/// messages, a stream of what the agent emits, and read access to persisted
/// state. [`LocalHost`](crate::LocalHost) is an in-process implementation.
///
/// Methods return futures but can be implemented as `async fn` directly.
pub trait DialogHost: Send + Sync + 'static {
    /// Inject an inbound message. The message always carries an address.
    ///
    /// Completes once the host accepted the message, not when the agent
    /// finished responding.
    fn submit(&self, message: Message) -> impl Future<Output = Result<()>> + Send;

    /// Open the outbound event stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySubscribed`](crate::Error::AlreadySubscribed)
    /// while another subscription is alive.
    fn subscribe(&self) -> impl Future<Output = Result<Subscription>> + Send;

    /// Read the state persisted for `address`.
    fn state(&self, address: &Address) -> impl Future<Output = Result<SessionState>> + Send;
}

impl<H: DialogHost> DialogHost for Arc<H> {
    fn submit(&self, message: Message) -> impl Future<Output = Result<()>> + Send {
        self.as_ref().submit(message)
    }

    fn subscribe(&self) -> impl Future<Output = Result<Subscription>> + Send {
        self.as_ref().subscribe()
    }

    fn state(&self, address: &Address) -> impl Future<Output = Result<SessionState>> + Send {
        self.as_ref().state(address)
    }
}
