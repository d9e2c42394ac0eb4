//! Cancellation context carried by each worker.
//!
//! The runtime never cancels anything itself. A [`Context`] is advisory
//! information that wrapping code sets up (for example, to scope a timeout)
//! and that outbound calls consult.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellable context with an optional deadline.
///
/// Children observe their parent's cancellation and deadline; cancelling a
/// child leaves the parent untouched.
///
/// # Examples
///
/// ```
/// use ferrous_pool::Context;
/// use std::time::Duration;
///
/// let root = Context::background();
/// let scoped = root.with_timeout(Duration::from_secs(30));
///
/// assert!(scoped.deadline().is_some());
/// assert!(!scoped.is_cancelled());
///
/// root.cancel();
/// assert!(scoped.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
    created_at: Instant,
}

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl Context {
    /// A root context that is never done unless cancelled.
    pub fn background() -> Self {
        Self::build(None, None)
    }

    fn build(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
                created_at: Instant::now(),
            }),
        }
    }

    /// Derives a child that can be cancelled independently.
    pub fn child(&self) -> Self {
        Self::build(Some(self.clone()), None)
    }

    /// Derives a child that is done once `timeout` has elapsed.
    ///
    /// A timeout too large to represent as an `Instant` adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derives a child that is done at `deadline`.
    ///
    /// The effective deadline never extends past the parent's.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self::build(Some(self.clone()), Some(effective))
    }

    /// Marks this context (and every child) as cancelled.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(Context::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Time left before the deadline, `None` without one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns why the context is done, or `None` while it is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancelled_in_chain() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// `Err` once the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Time since this context was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.created_at.elapsed()
    }

    fn cancelled_in_chain(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match &self.inner.parent {
            Some(parent) => parent.cancelled_in_chain(),
            None => false,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.deadline())
            .finish()
    }
}
