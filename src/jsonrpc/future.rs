//! Single-assignment completion cell with any number of subscribers.
//!
//! A [`Deferred`] starts out pending and is completed exactly once, either
//! with a success value or with an error. Subscribers registered before
//! completion run in the completing task; subscribers registered afterwards
//! run immediately in the registering task. Every subscriber observes the
//! terminal state exactly once.
//!
//! Each subscriber runs in isolation: a panic inside one callback is caught,
//! counted in the returned [`Completion`], and does not prevent the other
//! subscribers from running.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

type Callback<V> = Box<dyn FnOnce(&V) + Send>;

enum Subscriber<T, E> {
    Success(Callback<T>),
    Failure(Callback<E>),
    Complete(Box<dyn FnOnce(Result<&T, &E>) + Send>),
}

enum State<T, E> {
    Pending {
        subscribers: Vec<Subscriber<T, E>>,
        wakers: Vec<Waker>,
    },
    Done(Arc<Result<T, E>>),
}

/// Returned when a second completion is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FutureError {
    #[error("deferred value was already completed")]
    AlreadyCompleted,
}

/// Outcome of a successful completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    /// Subscribers that ran to the end
    pub notified: usize,
    /// Subscribers that panicked
    pub faulted: usize,
}

/// Cloneable handle to a single-assignment result
pub struct Deferred<T, E> {
    state: Arc<Mutex<State<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.is_pending() { "pending" } else { "completed" };
        f.debug_struct("Deferred").field("status", &status).finish()
    }
}

impl<T, E> Deferred<T, E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending {
                subscribers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    // Callbacks never run under the lock, so poisoning can only come from
    // a panic inside this module's own bookkeeping.
    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), State::Pending { .. })
    }

    /// Complete with a success value
    pub fn succeed(&self, value: T) -> Result<Completion, FutureError> {
        self.complete(Ok(value))
    }

    /// Complete with an error
    pub fn fail(&self, error: E) -> Result<Completion, FutureError> {
        self.complete(Err(error))
    }

    /// Move from pending to the given terminal state and notify subscribers.
    ///
    /// Fails without touching the stored state if the value was already
    /// completed.
    pub fn complete(&self, outcome: Result<T, E>) -> Result<Completion, FutureError> {
        let outcome = Arc::new(outcome);
        let (subscribers, wakers) = {
            let mut state = self.lock();
            let taken = match &mut *state {
                State::Done(_) => return Err(FutureError::AlreadyCompleted),
                State::Pending {
                    subscribers,
                    wakers,
                } => (std::mem::take(subscribers), std::mem::take(wakers)),
            };
            *state = State::Done(Arc::clone(&outcome));
            taken
        };

        let mut completion = Completion::default();
        for subscriber in subscribers {
            if Self::notify(subscriber, &outcome) {
                completion.notified += 1;
            } else {
                completion.faulted += 1;
            }
        }
        for waker in wakers {
            waker.wake();
        }
        Ok(completion)
    }

    /// Run one subscriber against the terminal state; `false` if it panicked
    fn notify(subscriber: Subscriber<T, E>, outcome: &Result<T, E>) -> bool {
        catch_unwind(AssertUnwindSafe(|| match (subscriber, outcome) {
            (Subscriber::Success(callback), Ok(value)) => callback(value),
            (Subscriber::Failure(callback), Err(error)) => callback(error),
            (Subscriber::Complete(callback), outcome) => callback(outcome.as_ref()),
            _ => {}
        }))
        .is_ok()
    }

    fn subscribe(&self, subscriber: Subscriber<T, E>) -> bool {
        let done = {
            let mut state = self.lock();
            match &mut *state {
                State::Pending { subscribers, .. } => {
                    subscribers.push(subscriber);
                    return true;
                }
                State::Done(outcome) => Arc::clone(outcome),
            }
        };
        Self::notify(subscriber, &done)
    }

    /// Run `callback` with the success value; replays immediately if the
    /// value is already there.
    ///
    /// Returns `false` only when a replayed callback panicked.
    pub fn on_success<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.subscribe(Subscriber::Success(Box::new(callback)))
    }

    /// Run `callback` with the error; replays immediately if already failed
    pub fn on_failure<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.subscribe(Subscriber::Failure(Box::new(callback)))
    }

    /// Run `callback` with whichever terminal state is reached
    pub fn on_complete<F>(&self, callback: F) -> bool
    where
        F: FnOnce(Result<&T, &E>) + Send + 'static,
    {
        self.subscribe(Subscriber::Complete(Box::new(callback)))
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    /// Snapshot of the terminal state, `None` while pending
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &*self.lock() {
            State::Pending { .. } => None,
            State::Done(outcome) => Some(outcome.as_ref().clone()),
        }
    }
}

impl<T: Clone, E: Clone> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.lock();
        match &mut *state {
            State::Done(outcome) => Poll::Ready(outcome.as_ref().clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
