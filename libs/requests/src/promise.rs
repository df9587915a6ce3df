//! One-shot results of asynchronously dispatched requests.
//!
//! [`Promise`] is returned by the `*_async` methods of
//! [`Client`](crate::Client). The request runs on its own thread; the
//! promise moves from pending to fulfilled or failed exactly once, and any
//! number of threads may block on it and read the outcome afterwards.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{ClientError, TransportErrorKind};
use crate::response::Response;

type Outcome = Result<Response, ClientError>;

/// Write-once, read-many cell with blocking waits
pub(crate) struct Completion<T> {
    value: OnceLock<T>,
    lock: Mutex<()>,
    ready: Condvar,
}

impl<T> Completion<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: OnceLock::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Store `value` and wake all waiters. Returns false if already completed.
    pub(crate) fn complete(&self, value: T) -> bool {
        if self.value.set(value).is_err() {
            return false;
        }
        // Taking the lock orders this wake-up after any waiter's last check.
        let _guard = self.lock.lock();
        self.ready.notify_all();
        true
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub(crate) fn wait(&self) -> &T {
        if let Some(value) = self.value.get() {
            return value;
        }
        let mut guard = self.lock.lock();
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            self.ready.wait(&mut guard);
        }
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<&T> {
        if let Some(value) = self.value.get() {
            return Some(value);
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        loop {
            if let Some(value) = self.value.get() {
                return Some(value);
            }
            if self.ready.wait_until(&mut guard, deadline).timed_out() {
                return self.value.get();
            }
        }
    }

    pub(crate) fn into_inner(self) -> Option<T> {
        self.value.into_inner()
    }
}

/// Pending result of a request running on a background thread.
///
/// Share a promise between threads by reference or behind an `Arc`; every
/// waiter observes the same outcome.
#[must_use = "dropping a promise detaches the request"]
pub struct Promise {
    completion: Arc<Completion<Outcome>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.completion.get() {
            None => "Pending",
            Some(Ok(_)) => "Fulfilled",
            Some(Err(_)) => "Failed",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl Promise {
    /// Run `task` on a new thread named `thread_name`.
    ///
    /// The promise is completed exactly once: with the task's result, with
    /// `ClientError::TaskPanicked` if it panics, or with a transport error if
    /// the thread cannot be spawned.
    pub(crate) fn spawn<F>(thread_name: &str, task: F) -> Self
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let cell = Arc::clone(&completion);

        let spawned = thread::Builder::new()
            .name(thread_name.to_owned())
            .spawn(move || {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(%message, "request task panicked");
                        Err(ClientError::TaskPanicked(message))
                    });
                let state = if outcome.is_ok() { "fulfilled" } else { "failed" };
                cell.complete(outcome);
                tracing::trace!(state, "promise completed");
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(error = %err, "failed to spawn request thread");
                completion.complete(Err(ClientError::transport(TransportErrorKind::Other, err)));
                None
            }
        };

        Self {
            completion,
            worker,
        }
    }

    /// Block until the request finishes and borrow its outcome.
    ///
    /// May be called repeatedly and from several threads at once.
    ///
    /// # Errors
    /// Returns the error the request failed with.
    pub fn wait(&self) -> Result<&Response, &ClientError> {
        self.completion.wait().as_ref()
    }

    /// Like [`wait`](Promise::wait) but gives up after `timeout`, returning
    /// `None` if the request is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<&Response, &ClientError>> {
        self.completion.wait_timeout(timeout).map(Result::as_ref)
    }

    /// Whether the outcome is available without blocking
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.completion.get().is_some()
    }

    /// Block until the request finishes, then call exactly one of the
    /// continuations and return its result.
    pub fn then<T>(
        &self,
        on_success: impl FnOnce(&Response) -> T,
        on_failure: impl FnOnce(&ClientError) -> T,
    ) -> T {
        match self.wait() {
            Ok(response) => on_success(response),
            Err(err) => on_failure(err),
        }
    }

    /// Block until the request finishes and take ownership of its outcome.
    ///
    /// # Errors
    /// Returns the error the request failed with.
    pub fn into_result(self) -> Outcome {
        self.completion.wait();
        // The worker holds the other reference to the cell until it exits.
        if let Some(worker) = self.worker
            && worker.join().is_err()
        {
            tracing::warn!("request thread exited abnormally after completing");
        }
        match Arc::try_unwrap(self.completion) {
            Ok(completion) => completion.into_inner().unwrap_or_else(|| {
                Err(ClientError::TaskPanicked("promise was never completed".into()))
            }),
            Err(_) => Err(ClientError::TaskPanicked("promise outcome is still shared".into())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
