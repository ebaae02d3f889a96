//! # Shutdown Coordination
//!
//! Cooperative shutdown across the consumption loops, message sources and the
//! HTTP server.
//!
//! - [`ShutdownToken`]: write-once, level-triggered cancellation shared by
//!   every task. Observing it never consumes it.
//! - [`CompletionSignal`]: fired by a task once it has stopped and released
//!   its resources. `complete` takes `self`, so a signal fires at most once.
//! - [`ShutdownCoordinator`]: hands out signals, cancels the token and then
//!   waits for every signal in registration order.
//!
//! Cancellation never interrupts work in progress; tasks check the token at
//! iteration boundaries and inside their idle waits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Shared cancellation token
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let was_cancelled = self.sender.send_replace(true);
        if !was_cancelled {
            debug!("Shutdown token cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested, immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so this cannot fail with RecvError.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot "I have stopped" signal owned by a single task
#[derive(Debug)]
pub struct CompletionSignal {
    name: String,
    sender: oneshot::Sender<()>,
}

impl CompletionSignal {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report completion to the coordinator
    pub fn complete(self) {
        debug!(component = %self.name, "Completion signal fired");
        // The coordinator may already have given up waiting; nothing to do then.
        let _ = self.sender.send(());
    }
}

#[derive(Debug)]
struct PendingCompletion {
    name: String,
    receiver: oneshot::Receiver<()>,
}

/// Outcome of a coordinated shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Components that fired their completion signal
    pub completed: Vec<String>,
    /// Components whose signal was dropped without firing
    pub abandoned: Vec<String>,
    /// Components still running when the grace period ran out
    pub timed_out: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty() && self.timed_out.is_empty()
    }
}

/// Cancels the shared token and waits for every registered component
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: ShutdownToken,
    pending: Vec<PendingCompletion>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: ShutdownToken::new(),
            pending: Vec::new(),
        }
    }

    /// Token to hand to tasks
    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Register a component; the coordinator will wait for its signal
    pub fn register(&mut self, name: impl Into<String>) -> CompletionSignal {
        let name = name.into();
        let (sender, receiver) = oneshot::channel();
        self.pending.push(PendingCompletion {
            name: name.clone(),
            receiver,
        });
        CompletionSignal { name, sender }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancel the token and wait for each component in registration order.
    ///
    /// With `grace` set, the whole wait is bounded by that duration and any
    /// component not done by then is reported as timed out.
    pub async fn shutdown(self, grace: Option<Duration>) -> ShutdownReport {
        info!(
            components = self.pending.len(),
            "Shutdown requested, cancelling all components"
        );
        self.token.cancel();

        let deadline = grace.map(|grace| tokio::time::Instant::now() + grace);
        let mut report = ShutdownReport::default();

        for pending in self.pending {
            let outcome = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, pending.receiver).await {
                    Ok(result) => Some(result),
                    Err(_) => None,
                },
                None => Some(pending.receiver.await),
            };

            match outcome {
                Some(Ok(())) => {
                    debug!(component = %pending.name, "Component stopped");
                    report.completed.push(pending.name);
                }
                Some(Err(_)) => {
                    warn!(
                        component = %pending.name,
                        "Component dropped its completion signal without firing it"
                    );
                    report.abandoned.push(pending.name);
                }
                None => {
                    warn!(component = %pending.name, "Component did not stop within grace period");
                    report.timed_out.push(pending.name);
                }
            }
        }

        info!(
            completed = report.completed.len(),
            abandoned = report.abandoned.len(),
            timed_out = report.timed_out.len(),
            "Shutdown coordination finished"
        );
        report
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
