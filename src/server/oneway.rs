//! One-way task supervision
//!
//! Every one-way request runs on its own thread. The caller never sees the
//! result, so outcomes go to the log and, when someone subscribed, to an
//! outcome channel. Threads are tracked so shutdown can wait for them.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::Sender;
use parking_lot::Mutex;

use super::dispatch::MethodHandler;
use super::CallContext;
use crate::serialize::Serializer;

/// Result of a one-way invocation nobody waited for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneWayOutcome {
    pub message_id: u32,
    pub service: String,
    pub method: String,

    /// Handler (or payload decode) error text
    pub error: Option<String>,

    /// Whether the handler produced a value
    pub produced_value: bool,
}

pub(crate) struct OneWaySupervisor {
    tasks: Mutex<Vec<JoinHandle<()>>>,
    outcomes: Option<Sender<OneWayOutcome>>,
}

impl OneWaySupervisor {
    pub(crate) fn new(outcomes: Option<Sender<OneWayOutcome>>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            outcomes,
        }
    }

    /// Run `handler` on its own thread
    pub(crate) fn spawn<S: Serializer>(
        &self,
        handler: Arc<dyn MethodHandler<S>>,
        serializer: S,
        ctx: CallContext,
        payload: Bytes,
    ) {
        let outcomes = self.outcomes.clone();

        let spawned = thread::Builder::new()
            .name("tinyrpc-oneway".to_string())
            .spawn(move || {
                let raw = handler.call(&serializer, &ctx, &payload);

                let outcome = OneWayOutcome {
                    message_id: ctx.message_id(),
                    service: ctx.service().to_string(),
                    method: ctx.method().to_string(),
                    error: raw.error,
                    produced_value: raw.data.is_some(),
                };

                match &outcome.error {
                    Some(e) => tracing::warn!(
                        "One-way call {}.{} (message {}) failed: {}",
                        outcome.service,
                        outcome.method,
                        outcome.message_id,
                        e
                    ),
                    None => tracing::debug!(
                        "One-way call {}.{} (message {}) completed",
                        outcome.service,
                        outcome.method,
                        outcome.message_id
                    ),
                }

                if let Some(tx) = outcomes {
                    // Receiver gone means nobody is listening any more
                    let _ = tx.send(outcome);
                }
            });

        match spawned {
            Ok(handle) => {
                let mut tasks = self.tasks.lock();
                tasks.retain(|task| !task.is_finished());
                tasks.push(handle);
            }
            Err(e) => tracing::error!("Failed to spawn one-way task: {}", e),
        }
    }

    /// Tasks that have not finished yet
    pub(crate) fn pending(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Wait for every task started so far
    pub(crate) fn join_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if task.join().is_err() {
                tracing::warn!("One-way task panicked");
            }
        }
    }
}
