use crate::common::Context;
use crate::errors::RepoResult;
use crate::store::TransactionOptions;
use std::ops::Deref;
use std::sync::Arc;

/// Callback run inside a transaction. It receives the session-bound context and may be
/// invoked more than once if the store retries a transient failure.
pub type TransactionCallback<'a> = dyn FnMut(&Context) -> RepoResult<()> + 'a;

/// The client half of the store collaborator: a source of sessions.
pub trait StoreClient: Send + Sync {
    fn start_session(&self, ctx: &Context) -> RepoResult<Session>;
}

/// A store session able to run transactions.
pub trait StoreSession: Send + Sync {
    /// Identifier that [`Context::with_session`] binds operations to.
    fn id(&self) -> String;

    /// Starts a transaction, runs `callback` with `ctx`, and commits.
    ///
    /// When the callback fails the transaction is aborted and the callback's error is
    /// returned. When the commit fails the error of the commit is returned. Retrying on
    /// transient errors is up to the implementation.
    fn with_transaction(
        &self,
        ctx: &Context,
        callback: &mut TransactionCallback<'_>,
        options: &TransactionOptions,
    ) -> RepoResult<()>;

    /// Releases the session. Must be called exactly once per session.
    fn end_session(&self, ctx: &Context);
}

/// A shared handle to a store client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<dyn StoreClient>,
}

impl Client {
    pub fn new<S: StoreClient + 'static>(inner: S) -> Self {
        Client {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<dyn StoreClient>) -> Self {
        Client { inner }
    }
}

impl Deref for Client {
    type Target = Arc<dyn StoreClient>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A shared handle to a store session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<dyn StoreSession>,
}

impl Session {
    pub fn new<S: StoreSession + 'static>(inner: S) -> Self {
        Session {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<dyn StoreSession>) -> Self {
        Session { inner }
    }
}

impl Deref for Session {
    type Target = Arc<dyn StoreSession>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
