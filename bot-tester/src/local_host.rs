use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use futures_util::{FutureExt, future::BoxFuture};
use serde_json::{Map, Value};
use tokio::sync::{
    Mutex,
    mpsc::{UnboundedSender, unbounded_channel},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    Address, DialogHost, Error, HostEvent, Message, Result, Session, SessionState, Subscription,
};

type Handler = Arc<dyn Fn(Session) -> BoxFuture<'static, ()> + Send + Sync>;

/// An in-process dialog host.
///
/// Every submitted message runs the handler on its own Tokio task with a
/// fresh [`Session`]. Replies, typing indicators and save signals flow to the
/// single subscriber. Work still running when the subscription is dropped is
/// cancelled.
///
/// `LocalHost` is cheap to clone; clones share handler, state and subscriber.
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
/// });
///
/// BotTester::new(host)
///     .send_message_to_bot("Hola!", ["hello!"])
///     .run_test()
///     .await
/// # }
/// ```
#[derive(Clone)]
pub struct LocalHost {
    handler: Handler,
    outbound: Arc<Mutex<Option<Outbound>>>,
    store: Arc<Store>,
}

struct Outbound {
    sender: UnboundedSender<HostEvent>,
    cancel: CancellationToken,
}

impl LocalHost {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Session) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |session| handler(session).boxed()),
            outbound: Arc::new(Mutex::new(None)),
            store: Arc::new(Store::default()),
        }
    }

    /// Send a message on the agent's own initiative. The message must carry
    /// an address.
    pub async fn send(&self, message: Message) -> Result<()> {
        let address = message
            .address
            .clone()
            .ok_or_else(|| Error::configuration("proactive message has no address"))?;
        let mut message = message;
        message.id.get_or_insert_with(|| Uuid::new_v4().to_string());
        if let Some(outbound) = self.live_outbound().await {
            let _ = outbound.sender.send(HostEvent::Message { address, message });
        }
        Ok(())
    }

    async fn live_outbound(&self) -> Option<Outbound> {
        let slot = self.outbound.lock().await;
        slot.as_ref()
            .filter(|o| !o.sender.is_closed())
            .map(|o| Outbound {
                sender: o.sender.clone(),
                cancel: o.cancel.clone(),
            })
    }
}

impl DialogHost for LocalHost {
    async fn submit(&self, message: Message) -> Result<()> {
        let address = message
            .address
            .clone()
            .ok_or_else(|| Error::configuration("inbound message has no address"))?;
        let state = self.store.read(&address).await;
        let outbound = self.live_outbound().await;
        let cancel = outbound
            .as_ref()
            .map(|o| o.cancel.child_token())
            .unwrap_or_default();

        tracing::trace!(%address, text = message.text_or_empty(), "dispatching inbound message");
        let session = Session::new(
            message,
            address,
            state,
            outbound.map(|o| o.sender),
            self.store.clone(),
        );
        let turn = (self.handler)(session);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => tracing::trace!("dialog turn cancelled"),
                _ = turn => {}
            }
        });
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let mut slot = self.outbound.lock().await;
        if slot.as_ref().is_some_and(|o| !o.sender.is_closed()) {
            return Err(Error::AlreadySubscribed);
        }
        let (sender, receiver) = unbounded_channel();
        let cancel = CancellationToken::new();
        *slot = Some(Outbound {
            sender,
            cancel: cancel.clone(),
        });
        Ok(Subscription::new(receiver).with_cancellation(cancel))
    }

    async fn state(&self, address: &Address) -> Result<SessionState> {
        Ok(self.store.read(address).await)
    }
}

impl fmt::Debug for LocalHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHost").finish_non_exhaustive()
    }
}

/// Persisted state, keyed the way a bot framework scopes it: user data per
/// user, conversation data per conversation, private data per both.
#[derive(Debug, Default)]
pub(crate) struct Store {
    user: Mutex<HashMap<String, Map<String, Value>>>,
    conversation: Mutex<HashMap<String, Map<String, Value>>>,
    private: Mutex<HashMap<(String, String), Map<String, Value>>>,
}

impl Store {
    pub(crate) async fn read(&self, address: &Address) -> SessionState {
        let (user, conversation) = keys(address);
        SessionState {
            user_data: self.user.lock().await.get(&user).cloned().unwrap_or_default(),
            conversation_data: self
                .conversation
                .lock()
                .await
                .get(&conversation)
                .cloned()
                .unwrap_or_default(),
            private_conversation_data: self
                .private
                .lock()
                .await
                .get(&(user, conversation))
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub(crate) async fn write(&self, address: &Address, state: SessionState) {
        let (user, conversation) = keys(address);
        self.user.lock().await.insert(user.clone(), state.user_data);
        self.conversation
            .lock()
            .await
            .insert(conversation.clone(), state.conversation_data);
        self.private
            .lock()
            .await
            .insert((user, conversation), state.private_conversation_data);
    }
}

fn keys(address: &Address) -> (String, String) {
    (
        address.user_id().unwrap_or_default().to_string(),
        address.conversation_id().unwrap_or_default().to_string(),
    )
}
