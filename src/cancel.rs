//! One-shot broadcast cancellation shared by every stage of a pipeline.
//!
//! The token owns the only sender of a zero-capacity channel that never
//! carries a message. Cancelling drops that sender, which disconnects the
//! channel; from then on every `recv` on [`CancellationToken::done`] returns
//! immediately. Workers put `recv(token.done())` into their `select!` next to
//! their data operations, so a blocked send or receive is woken the moment
//! the token fires with no polling involved.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

/// Cloneable handle to a shared, monotonic cancellation signal
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new token in the active state
    pub fn new() -> Self {
        let (trigger, done) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                done,
            }),
        }
    }

    /// Activate the signal.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call, which has no further effect.
    pub fn cancel(&self) -> bool {
        let trigger = self.inner.trigger.lock().take();
        match trigger {
            Some(sender) => {
                self.inner.cancelled.store(true, Ordering::SeqCst);
                drop(sender);
                true
            }
            None => false,
        }
    }

    /// Check if the token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the token is cancelled.
    ///
    /// Intended for use as a `recv` arm in `crossbeam::select!`.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until cancelled or until `timeout` elapses; returns whether the
    /// token is cancelled
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.inner.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            _ => true,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
