//! Cancellation context for applier operations.

use crate::error::{MigrateError, MigrateResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often blocked waits and watchers re-check a context.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a signal handler can hold one clone while
/// the applier checks another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation and deadline scope for one applier call.
///
/// The applier checks the context before connecting, after taking the lock,
/// and before each change. Waiting for the advisory lock gives up once the
/// context is done, and backends that can interrupt a running statement do
/// so through [`Context::on_done`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancelToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled through the returned token.
    pub fn with_cancel() -> (Self, CancelToken) {
        let ctx = Self::default();
        let token = ctx.token.clone();
        (ctx, token)
    }

    /// Add a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The token shared with this context.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Whether the context was cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `f` on a watcher thread once the context is done.
    ///
    /// Dropping the returned [`Watch`] stops the watcher; `f` never runs
    /// after the drop returns.
    pub fn on_done<F>(&self, f: F) -> Watch
    where
        F: FnOnce() + Send + 'static,
    {
        let ctx = self.clone();
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let (stopped, wake) = &*stop;
                let Ok(mut stopped) = stopped.lock() else {
                    return;
                };
                while !*stopped {
                    if ctx.is_done() {
                        f();
                        return;
                    }
                    stopped = match wake.wait_timeout(stopped, POLL_INTERVAL) {
                        Ok((guard, _)) => guard,
                        Err(_) => return,
                    };
                }
            })
        };
        Watch {
            stop,
            handle: Some(handle),
        }
    }

    pub(crate) fn check(&self, namespace: &str) -> MigrateResult<()> {
        if self.is_done() {
            return Err(MigrateError::Cancelled {
                namespace: namespace.to_string(),
            });
        }
        Ok(())
    }
}

/// A running [`Context::on_done`] watcher; stops it on drop.
#[derive(Debug)]
pub struct Watch {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Watch {
    fn drop(&mut self) {
        let (stopped, wake) = &*self.stop;
        if let Ok(mut stopped) = stopped.lock() {
            *stopped = true;
        }
        wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Cancellation watcher panicked");
            }
        }
    }
}
