//! Deadline governor for a single aggregation call.
//!
//! # States
//! - Armed: budget counting down
//! - Fired: terminal
//!
//! # State Transitions
//! ```text
//! Armed → Fired: budget elapsed
//! Armed → Fired: upstream cancellation token cancelled
//! Armed → Fired: governor dropped (caller went away)
//! ```
//!
//! The governor owns the timer task; [`DeadlineSignal`] is the cheap,
//! clonable observer handed to every racing task. The first cause to
//! fire is recorded and never overwritten.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregation::outcome::FireCause;

// Stand-in deadline for budgets too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Observer side of the deadline. Clones share state.
#[derive(Debug, Clone)]
pub struct DeadlineSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<FireCause>>,
    deadline: Instant,
}

impl DeadlineSignal {
    fn new(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            cause: Arc::new(OnceLock::new()),
            deadline,
        }
    }

    /// Resolves once the signal has fired. Resolves immediately if it already has.
    pub async fn fired(&self) {
        self.token.cancelled().await
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cause of the firing, `None` while armed.
    pub fn cause(&self) -> Option<FireCause> {
        if self.is_fired() {
            self.cause.get().copied()
        } else {
            None
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the budget elapses.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    // The cause is stored before the token is cancelled, so any observer
    // that sees the fired state also sees a cause.
    fn fire(&self, cause: FireCause) {
        if self.cause.set(cause).is_ok() {
            tracing::debug!(cause = %cause, "Deadline fired");
        }
        self.token.cancel();
    }
}

/// Owns the countdown for one aggregation call.
///
/// Dropping the governor stops the countdown and fires the signal with
/// [`FireCause::Cancelled`] if nothing fired it earlier, so racing tasks
/// of an abandoned aggregation stop waiting.
#[derive(Debug)]
pub struct DeadlineGovernor {
    signal: DeadlineSignal,
    timer: JoinHandle<()>,
}

impl DeadlineGovernor {
    /// Arm a governor with `budget`, also firing when `upstream` is cancelled.
    pub fn arm(budget: Duration, upstream: CancellationToken) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(budget).unwrap_or(now + FAR_FUTURE);
        let signal = DeadlineSignal::new(deadline);

        let timer_signal = signal.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    timer_signal.fire(FireCause::BudgetElapsed);
                }
                _ = upstream.cancelled() => {
                    timer_signal.fire(FireCause::Cancelled);
                }
                _ = timer_signal.fired() => {}
            }
        });

        Self { signal, timer }
    }

    pub fn signal(&self) -> DeadlineSignal {
        self.signal.clone()
    }

    /// Fire immediately on behalf of the caller.
    pub fn cancel(&self) {
        self.signal.fire(FireCause::Cancelled);
    }

    pub fn is_fired(&self) -> bool {
        self.signal.is_fired()
    }
}

impl Drop for DeadlineGovernor {
    fn drop(&mut self) {
        self.signal.fire(FireCause::Cancelled);
        self.timer.abort();
    }
}
