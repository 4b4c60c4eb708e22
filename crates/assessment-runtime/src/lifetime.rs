//! Session lifetimes and request ordering.
//!
//! Every session owns a [`Lifetime`]. Requests started by the session carry a
//! [`LifetimeGuard`] and resolve as [`RuntimeError::Cancelled`] once the
//! session is cancelled or dropped. [`RequestTokens`] orders overlapping
//! requests so that only the most recently issued one may update the session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::error::{RuntimeError, RuntimeResult};

#[derive(Debug)]
pub struct Lifetime {
    tx: watch::Sender<bool>,
}

impl Lifetime {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn guard(&self) -> LifetimeGuard {
        LifetimeGuard {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct LifetimeGuard {
    rx: watch::Receiver<bool>,
}

impl LifetimeGuard {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the owning session is cancelled or dropped.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Runs `future` unless the session goes away first.
    pub async fn run<T, F>(mut self, future: F) -> RuntimeResult<T>
    where
        F: Future<Output = RuntimeResult<T>>,
    {
        if self.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RuntimeError::Cancelled),
            result = future => result,
        }
    }
}

/// Monotonic request counter; the last issued token wins.
#[derive(Debug, Clone, Default)]
pub struct RequestTokens {
    latest: Arc<AtomicU64>,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}

pub type BoxedRequest<T> = Pin<Box<dyn Future<Output = RuntimeResult<T>> + Send + 'static>>;

/// A request issued by a session, detached from it so callers may overlap
/// several and feed the completions back in any order.
pub struct PendingRequest<T> {
    token: u64,
    guard: LifetimeGuard,
    request: BoxedRequest<T>,
}

impl<T> PendingRequest<T> {
    pub fn new(token: u64, guard: LifetimeGuard, request: BoxedRequest<T>) -> Self {
        Self {
            token,
            guard,
            request,
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub async fn run(self) -> Completion<T> {
        let result = self.guard.run(self.request).await;
        Completion {
            token: self.token,
            result,
        }
    }
}

/// Outcome of a [`PendingRequest`], tagged with its token.
#[derive(Debug)]
pub struct Completion<T> {
    pub token: u64,
    pub result: RuntimeResult<T>,
}
