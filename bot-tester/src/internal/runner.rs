use std::fmt;

use crate::{
    Address, CapturedEvent, Config, DialogHost, Error, Expectation, Message, Result,
    internal::{ResponseCollector, Step, address_resolver},
};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running(usize),
    Succeeded,
    Failed(usize),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running(index) => write!(f, "running step {index}"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed(index) => write!(f, "failed at step {index}"),
        }
    }
}

/// Executes a queued conversation, one step at a time, against a host.
pub(crate) struct Runner<H: DialogHost> {
    host: H,
    config: Config,
    state: RunState,
}

impl<H: DialogHost> Runner<H> {
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            state: RunState::Idle,
        }
    }

    /// Run every step in order and stop at the first failure.
    ///
    /// Addresses are resolved for all steps before anything is sent, so an
    /// unresolvable step fails the run without side effects on the host.
    pub async fn run(mut self, steps: Vec<Step>) -> Result {
        self.validate(&steps)?;

        let subscription = self.host.subscribe().await?;
        let mut collector = ResponseCollector::new(subscription, self.config.filter_chain());
        tracing::info!(steps = steps.len(), timeout = ?self.config.timeout(), "running conversation test");

        for (index, step) in steps.into_iter().enumerate() {
            self.transition(RunState::Running(index));
            let kind = step.kind();
            tracing::debug!(index, %kind, ?step, "executing step");

            if let Err(e) = self.execute(&mut collector, step).await {
                self.transition(RunState::Failed(index));
                tracing::warn!(index, %kind, error = %e, "conversation test failed");
                return Err(e.in_step(index, kind));
            }
        }

        self.transition(RunState::Succeeded);
        tracing::info!(unconsumed = collector.buffered(), "conversation test passed");
        Ok(())
    }

    fn validate(&self, steps: &[Step]) -> Result {
        let default = self.config.default_address();
        for (index, step) in steps.iter().enumerate() {
            let resolved = match step {
                Step::Inspect { address, .. } => {
                    address_resolver::resolve_inspect(address.as_ref(), default).map(drop)
                }
                other => match other.stimulus() {
                    Some(stimulus) => address_resolver::resolve(stimulus, default).map(drop),
                    None => Ok(()),
                },
            };
            resolved.map_err(|e| e.in_step(index, step.kind()))?;
        }
        Ok(())
    }

    async fn execute(&self, collector: &mut ResponseCollector, step: Step) -> Result {
        let default = self.config.default_address();
        let timeout = self.config.timeout();

        match step {
            Step::SendAndExpect {
                stimulus,
                expectations,
            } => {
                let address = self.submit(stimulus).await?;
                let events = collector
                    .await_messages(&address, expectations.len(), timeout)
                    .await?;
                match_in_order(&expectations, &events)
            }
            Step::SendAndExpectUnordered {
                stimulus,
                expectations,
            } => {
                let address = self.submit(stimulus).await?;
                let events = collector
                    .await_messages(&address, expectations.len(), timeout)
                    .await?;
                match_ignoring_order(&expectations, &events)
            }
            Step::SendAndExpectSave { stimulus } => {
                let (stimulus, address) = address_resolver::address_stimulus(stimulus, default)?;
                collector.discard_save_signals(&address);
                self.host.submit(stimulus).await?;
                collector.await_save_signal(&address, timeout).await
            }
            Step::Inspect { address, callback } => {
                let address = address_resolver::resolve_inspect(address.as_ref(), default)?;
                let state = self.host.state(&address).await?;
                callback(&state).map_err(Error::callback)
            }
            Step::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            Step::Work(work) => work().await.map_err(Error::callback),
        }
    }

    async fn submit(&self, stimulus: Message) -> Result<Address> {
        let (stimulus, address) =
            address_resolver::address_stimulus(stimulus, self.config.default_address())?;
        tracing::trace!(%address, %stimulus, "submitting stimulus");
        self.host.submit(stimulus).await?;
        Ok(address)
    }

    fn transition(&mut self, next: RunState) {
        tracing::trace!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// Match responses pairwise in arrival order.
fn match_in_order(expectations: &[Expectation], events: &[CapturedEvent]) -> Result {
    for (index, (expected, event)) in expectations.iter().zip(events).enumerate() {
        let Some(actual) = event.message() else {
            continue;
        };
        if !expected.matches(actual) {
            return Err(Error::Mismatch {
                index,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }
    Ok(())
}

/// Each expectation, in declaration order, claims the first unclaimed
/// response it matches. Every expectation left without a response is
/// reported.
fn match_ignoring_order(expectations: &[Expectation], events: &[CapturedEvent]) -> Result {
    let messages: Vec<&Message> = events.iter().filter_map(CapturedEvent::message).collect();
    let mut claimed = vec![false; messages.len()];
    let mut unmatched = Vec::new();

    for expected in expectations {
        let slot = (0..messages.len()).find(|&i| !claimed[i] && expected.matches(messages[i]));
        match slot {
            Some(i) => claimed[i] = true,
            None => unmatched.push(expected.to_string()),
        }
    }

    if unmatched.is_empty() {
        Ok(())
    } else {
        Err(Error::UnmatchedSet {
            unmatched,
            received: messages.iter().map(|m| m.to_string()).collect(),
        })
    }
}
