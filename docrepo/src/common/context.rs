use crate::errors::{ErrorKind, RepoError, RepoResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Request-scoped context handed to every repository operation, every lifecycle hook and
/// every store call.
///
/// A context carries a cancellation flag, an optional deadline and an optional session
/// binding. Child contexts derived with [`Context::with_timeout`], [`Context::with_deadline`]
/// or [`Context::with_session`] observe cancellation of any ancestor; cancelling a child
/// leaves its parent untouched. Clones share state.
///
/// The repository never enforces the deadline itself. Store implementations call
/// [`Context::check`] (or read [`Context::remaining`]) and stop work accordingly.
///
/// # Examples
///
/// ```rust,ignore
/// let ctx = Context::background().with_timeout(Duration::from_secs(5));
/// let users = repo.find(&ctx, doc! { age: 30 })?;
/// ```
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    session_id: Option<String>,
    parent: Option<Context>,
}

impl Context {
    /// Creates a root context with no deadline and no session.
    pub fn background() -> Context {
        Context {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                session_id: None,
                parent: None,
            }),
        }
    }

    fn child(&self, deadline: Option<Instant>, session_id: Option<String>) -> Context {
        Context {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline,
                session_id,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Derives a child that expires `timeout` from now, or at the parent's deadline if
    /// that comes first. A timeout too large to represent adds no deadline of its own.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(self.deadline(), None),
        }
    }

    /// Derives a child that expires at `deadline`, or at the parent's deadline if that
    /// comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let effective = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.child(Some(effective), None)
    }

    /// Derives a child bound to the store session `session_id`.
    pub fn with_session(&self, session_id: impl Into<String>) -> Context {
        self.child(self.deadline(), Some(session_id.into()))
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.inner.cancelled.load(Ordering::SeqCst) {
                return true;
            }
            current = ctx.inner.parent.as_ref();
        }
        false
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The session this context is bound to, inherited from the nearest ancestor.
    pub fn session_id(&self) -> Option<&str> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(id) = &ctx.inner.session_id {
                return Some(id);
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` when the context is no longer live.
    pub fn check(&self) -> RepoResult<()> {
        if self.is_cancelled() {
            return Err(RepoError::new("Context cancelled", ErrorKind::Cancelled));
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Err(RepoError::new(
                    "Context deadline exceeded",
                    ErrorKind::DeadlineExceeded,
                ));
            }
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}
