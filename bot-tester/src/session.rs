use std::{fmt, sync::Arc};

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{Address, HostEvent, Message, SessionState, local_host::Store};

/// The agent's view of one conversational turn inside a [`LocalHost`](crate::LocalHost).
///
/// Use it to:
/// - `message()` / `text()`: read the inbound message
/// - `send(..)`: reply (addressed to the sender unless the reply carries its own address)
/// - `send_typing()` / `end_conversation()`: emit control activities
/// - `user_data_mut()` and friends, then `save()`: persist state
pub struct Session {
    message: Message,
    address: Address,
    state: SessionState,
    outbound: Option<UnboundedSender<HostEvent>>,
    store: Arc<Store>,
}

impl Session {
    pub(crate) fn new(
        message: Message,
        address: Address,
        state: SessionState,
        outbound: Option<UnboundedSender<HostEvent>>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            message,
            address,
            state,
            outbound,
            store,
        }
    }

    /// The inbound message that started this turn.
    #[inline]
    pub fn message(&self) -> &Message {
        &self.message
    }

    #[inline]
    pub fn text(&self) -> &str {
        self.message.text_or_empty()
    }

    /// Address of the user who sent the inbound message.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Send a reply. Text, or a full [`Message`]; a message without an address
    /// goes back to the sender.
    pub fn send(&self, reply: impl Into<Message>) {
        let mut reply = reply.into();
        if reply.address.is_none() {
            reply.address = Some(self.address.clone());
        }
        self.emit(reply);
    }

    /// Send several replies in order.
    pub fn send_batch(&self, replies: impl IntoIterator<Item = Message>) {
        for reply in replies {
            self.send(reply);
        }
    }

    pub fn send_typing(&self) {
        self.send(Message::typing());
    }

    pub fn end_conversation(&self) {
        self.send(Message::end_of_conversation());
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_data(&self) -> &Map<String, Value> {
        &self.state.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state.user_data
    }

    pub fn conversation_data(&self) -> &Map<String, Value> {
        &self.state.conversation_data
    }

    pub fn conversation_data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state.conversation_data
    }

    pub fn private_conversation_data(&self) -> &Map<String, Value> {
        &self.state.private_conversation_data
    }

    pub fn private_conversation_data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state.private_conversation_data
    }

    /// Persist the session state and report it to the subscriber.
    pub async fn save(&self) {
        self.store.write(&self.address, self.state.clone()).await;
        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(HostEvent::Saved {
                address: self.address.clone(),
            });
        }
    }

    fn emit(&self, mut message: Message) {
        message.id.get_or_insert_with(|| Uuid::new_v4().to_string());
        let Some(address) = message.address.clone() else {
            return;
        };
        match &self.outbound {
            Some(outbound) => {
                if outbound.send(HostEvent::Message { address, message }).is_err() {
                    tracing::trace!("subscriber gone, dropping outbound message");
                }
            }
            None => tracing::trace!("no subscriber, dropping outbound message"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("message", &self.message)
            .field("address", &self.address)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
