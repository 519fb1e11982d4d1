use std::{collections::VecDeque, time::Duration};

use tokio::{sync::mpsc::error::TryRecvError, time::Instant};

use crate::{
    Address, CapturedEvent, Error, FilterChain, HostEvent, Payload, Result, Subscription,
    error::Awaiting,
};

/// Turns the host's push-based event stream into pull-based, timeout-bounded
/// awaits scoped to one step.
///
/// Captured events are buffered in arrival order. An await removes only the
/// events it returns; events for other addresses, and extra events for the
/// same address, stay buffered for later steps.
pub(crate) struct ResponseCollector {
    subscription: Subscription,
    filters: FilterChain,
    buffer: VecDeque<CapturedEvent>,
    next_sequence: u64,
    closed: bool,
}

impl ResponseCollector {
    pub fn new(subscription: Subscription, filters: FilterChain) -> Self {
        Self {
            subscription,
            filters,
            buffer: VecDeque::new(),
            next_sequence: 0,
            closed: false,
        }
    }

    /// Wait until `count` messages for `address` have been captured, then
    /// remove and return the first `count` of them in arrival order.
    pub async fn await_messages(
        &mut self,
        address: &Address,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<CapturedEvent>> {
        let deadline = deadline_after(timeout);
        loop {
            self.drain_pending();
            if let Some(events) = self.take_messages(address, count) {
                return Ok(events);
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    address: address.clone(),
                    awaiting: Awaiting::Messages(count),
                    timeout,
                    received: self.buffered_messages(address),
                });
            }
            self.wait_for_next(deadline).await?;
        }
    }

    /// Wait for the host to report it saved state for `address`.
    ///
    /// A message for `address` captured before the save signal fails the
    /// wait with [`Error::UnexpectedResponse`].
    pub async fn await_save_signal(&mut self, address: &Address, timeout: Duration) -> Result<()> {
        let deadline = deadline_after(timeout);
        loop {
            self.drain_pending();
            if let Some(pos) = self.buffer.iter().position(|e| address.matches(&e.address)) {
                return match self.buffer.remove(pos).map(CapturedEvent::into_message) {
                    Some(Some(message)) => Err(Error::UnexpectedResponse {
                        address: address.clone(),
                        message: Box::new(message),
                    }),
                    _ => Ok(()),
                };
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    address: address.clone(),
                    awaiting: Awaiting::SaveSignal,
                    timeout,
                    received: Vec::new(),
                });
            }
            self.wait_for_next(deadline).await?;
        }
    }

    /// Drop save signals for `address` that are already buffered, so a later
    /// save await only sees signals caused after this point.
    pub fn discard_save_signals(&mut self, address: &Address) {
        self.drain_pending();
        let before = self.buffer.len();
        self.buffer
            .retain(|e| !(e.is_save_signal() && address.matches(&e.address)));
        let dropped = before - self.buffer.len();
        if dropped > 0 {
            tracing::trace!(%address, dropped, "discarded stale save signals");
        }
    }

    /// Number of captured events not yet consumed by any step.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Block until one more event arrives, the stream closes, or `deadline`
    /// passes. Buffers whatever arrived.
    async fn wait_for_next(&mut self, deadline: Instant) -> Result<()> {
        if self.closed {
            return Err(Error::HostClosed);
        }
        match tokio::time::timeout_at(deadline, self.subscription.recv()).await {
            Ok(Some(event)) => self.capture(event),
            Ok(None) => self.closed = true,
            Err(_) => {}
        }
        Ok(())
    }

    /// Move everything already sent by the host into the buffer without waiting.
    fn drain_pending(&mut self) {
        while !self.closed {
            match self.subscription.try_recv() {
                Ok(event) => self.capture(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
    }

    fn capture(&mut self, event: HostEvent) {
        let (address, payload) = match event {
            HostEvent::Message { address, message } => {
                if !self.filters.should_observe(&message) {
                    tracing::trace!(%address, kind = %message.kind, "filtered out");
                    return;
                }
                (address, Payload::Message(message))
            }
            HostEvent::Saved { address } => (address, Payload::Saved),
        };
        let event = CapturedEvent::new(self.next_sequence, address, payload);
        self.next_sequence += 1;
        tracing::trace!(%event, "captured");
        self.buffer.push_back(event);
    }

    fn take_messages(&mut self, address: &Address, count: usize) -> Option<Vec<CapturedEvent>> {
        if self.matching_messages(address).count() < count {
            return None;
        }
        let mut taken = Vec::with_capacity(count);
        let mut rest = VecDeque::with_capacity(self.buffer.len());
        for event in self.buffer.drain(..) {
            if !address.matches(&event.address) {
                rest.push_back(event);
            } else if event.is_save_signal() {
                // Stale: a save step only counts signals caused by its own stimulus.
                continue;
            } else if taken.len() < count {
                taken.push(event);
            } else {
                rest.push_back(event);
            }
        }
        self.buffer = rest;
        Some(taken)
    }

    fn matching_messages<'a>(
        &'a self,
        address: &'a Address,
    ) -> impl Iterator<Item = &'a CapturedEvent> + 'a {
        self.buffer
            .iter()
            .filter(move |e| !e.is_save_signal() && address.matches(&e.address))
    }

    fn buffered_messages(&self, address: &Address) -> Vec<crate::Message> {
        self.matching_messages(address)
            .filter_map(|e| e.message().cloned())
            .collect()
    }
}

/// `now + timeout`, saturating far in the future for timeouts too large to
/// represent.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

impl Drop for ResponseCollector {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                unconsumed = self.buffer.len(),
                "releasing host subscription with unconsumed events"
            );
        }
    }
}
