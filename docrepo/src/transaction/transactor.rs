use crate::common::Context;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::store::{Client, Session, TransactionOptions};
use std::fmt::{Display, Formatter};

/// The lifecycle of one orchestrated transaction.
///
/// `Idle → SessionStarted → InCallback → {Committed | Aborted} → Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    SessionStarted,
    InCallback,
    Committed,
    Aborted,
    Ended,
}

impl Display for TransactionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Idle => write!(f, "idle"),
            TransactionState::SessionStarted => write!(f, "session started"),
            TransactionState::InCallback => write!(f, "in callback"),
            TransactionState::Committed => write!(f, "committed"),
            TransactionState::Aborted => write!(f, "aborted"),
            TransactionState::Ended => write!(f, "ended"),
        }
    }
}

/// Owns a started session and ends it exactly once when dropped.
struct SessionGuard<'a> {
    ctx: &'a Context,
    session: Session,
    session_id: String,
    state: TransactionState,
}

impl<'a> SessionGuard<'a> {
    fn new(ctx: &'a Context, session: Session) -> Self {
        let session_id = session.id();
        let mut guard = SessionGuard {
            ctx,
            session,
            session_id,
            state: TransactionState::Idle,
        };
        guard.transition(TransactionState::SessionStarted);
        guard
    }

    fn transition(&mut self, next: TransactionState) {
        log::debug!(
            "Transaction on session {} moved from {} to {}",
            self.session_id,
            self.state,
            next
        );
        self.state = next;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.end_session(self.ctx);
        self.transition(TransactionState::Ended);
    }
}

/// Runs callbacks inside store transactions.
///
/// Each call starts a fresh session, hands the callback a context bound to that session,
/// commits when the callback succeeds and aborts when it fails. The session is ended on
/// every exit path, including a panicking callback.
///
/// Operations inside the callback must use the context it receives. Operations issued
/// with the outer context are not part of the transaction.
///
/// # Examples
///
/// ```rust,ignore
/// let transactor = Transactor::new(client);
/// let paper = transactor.run(&ctx, |tx_ctx| {
///     counters.update_one(tx_ctx, doc! { _id: "paper" }, doc! { "$inc": { seq: 1 } })?;
///     let mut paper = Paper::new(next_id);
///     papers.insert_one(tx_ctx, &mut paper)?;
///     Ok(paper)
/// })?;
/// ```
#[derive(Clone)]
pub struct Transactor {
    client: Client,
}

impl Transactor {
    pub fn new(client: Client) -> Transactor {
        Transactor { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Runs `callback` in a transaction with the store's default transaction options.
    pub fn run<R, F>(&self, ctx: &Context, callback: F) -> RepoResult<R>
    where
        F: FnMut(&Context) -> RepoResult<R>,
    {
        self.run_with_options(ctx, &TransactionOptions::new(), callback)
    }

    /// Runs `callback` in a transaction configured by `options`.
    ///
    /// # Behavior
    ///
    /// - A failure to start the session is returned as is; the callback never runs
    /// - An error from the callback or from the commit aborts the transaction and is
    ///   returned as is
    /// - On commit the callback's last result is returned
    ///
    /// The callback may run more than once if the store retries the transaction.
    pub fn run_with_options<R, F>(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
        mut callback: F,
    ) -> RepoResult<R>
    where
        F: FnMut(&Context) -> RepoResult<R>,
    {
        let session = match self.client.start_session(ctx) {
            Ok(session) => session,
            Err(err) => {
                log::error!("Failed to start a transaction session: {}", err);
                return Err(err);
            }
        };

        let mut guard = SessionGuard::new(ctx, session);
        let session_ctx = ctx.with_session(guard.session_id.clone());
        guard.transition(TransactionState::InCallback);

        let mut output: Option<R> = None;
        let result = guard.session.with_transaction(
            &session_ctx,
            &mut |tx_ctx: &Context| {
                output = Some(callback(tx_ctx)?);
                Ok(())
            },
            options,
        );

        match result {
            Ok(()) => {
                guard.transition(TransactionState::Committed);
                output.ok_or_else(|| {
                    log::error!(
                        "Session {} committed without running the callback",
                        guard.session_id
                    );
                    RepoError::new(
                        "Transaction committed without running the callback",
                        ErrorKind::InternalError,
                    )
                })
            }
            Err(err) => {
                guard.transition(TransactionState::Aborted);
                log::warn!("Transaction on session {} aborted: {}", guard.session_id, err);
                Err(err)
            }
        }
    }
}

/// Runs `callback` in a transaction on a new session of `client`.
pub fn do_transaction<R, F>(client: &Client, ctx: &Context, callback: F) -> RepoResult<R>
where
    F: FnMut(&Context) -> RepoResult<R>,
{
    Transactor::new(client.clone()).run(ctx, callback)
}
