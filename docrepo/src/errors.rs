use backtrace::Backtrace;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for repository operations.
///
/// The kinds fall in two groups: the ones the repository itself raises (mapping, validation,
/// not-found) and the ones a store collaborator reports back through the [`crate::store`]
/// traits (duplicate keys, transport failures, session failures). Callers usually branch on
/// [`RepoError::is_not_found`] and [`RepoError::is_duplicate_key`] rather than matching kinds.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{RepoError, ErrorKind, RepoResult};
///
/// fn example() -> RepoResult<()> {
///     Err(RepoError::new("no document matched", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// No document matched a single-document query
    NotFound,
    /// A unique index rejected a write
    DuplicateKey,

    /// A typed value could not be mapped to or from a document
    ObjectMappingError,
    /// Caller input failed validation
    ValidationError,
    /// The operation is not valid in the current context
    InvalidOperation,

    /// The store could not start or use a session
    SessionError,
    /// The transaction was aborted
    TransactionAborted,

    /// Transport or IO failure reported by the store
    IOError,
    /// Any other error reported by the store
    BackendError,

    /// The request context was cancelled
    Cancelled,
    /// The request context deadline passed
    DeadlineExceeded,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::SessionError => write!(f, "Session error"),
            ErrorKind::TransactionAborted => write!(f, "Transaction aborted"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::DeadlineExceeded => write!(f, "Deadline exceeded"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the repository layer.
///
/// `RepoError` carries a message, an [`ErrorKind`], an optional cause and the backtrace
/// captured at construction. Store implementations build their errors with the same type
/// so that callers see one error vocabulary on both sides of the store seam.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{RepoError, ErrorKind};
///
/// let cause = RepoError::new("connection reset", ErrorKind::IOError);
/// let err = RepoError::new_with_cause("insert failed", ErrorKind::BackendError, cause);
/// assert!(!err.is_duplicate_key());
/// ```
#[derive(Clone)]
pub struct RepoError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RepoError>>,
    backtrace: Arc<RwLock<Backtrace>>,
}

impl RepoError {
    /// Creates a new `RepoError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    /// Creates a new `RepoError` wrapping a cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RepoError) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&RepoError> {
        self.cause.as_deref()
    }

    /// Returns `true` when this error, or any error in its cause chain, reports that no
    /// document matched.
    pub fn is_not_found(&self) -> bool {
        self.any_in_chain(|kind| *kind == ErrorKind::NotFound)
    }

    /// Returns `true` when this error, or any error in its cause chain, is a unique index
    /// violation.
    pub fn is_duplicate_key(&self) -> bool {
        self.any_in_chain(|kind| *kind == ErrorKind::DuplicateKey)
    }

    fn any_in_chain(&self, predicate: impl Fn(&ErrorKind) -> bool) -> bool {
        let mut current = Some(self);
        while let Some(err) = current {
            if predicate(&err.error_kind) {
                return true;
            }
            current = err.cause();
        }
        false
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Maps the outcome of a single-document lookup to an existence flag.
///
/// `Ok(_)` means the document exists, a not-found error means it does not, and every
/// other error is handed back to the caller.
///
/// # Examples
///
/// ```rust,ignore
/// let exists = check_exists(repo.get(&ctx, id))?;
/// ```
pub fn check_exists<T>(result: RepoResult<T>) -> RepoResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Converts a not-found error into `Ok(None)`.
pub trait OptionalExt<T> {
    fn optional(self) -> RepoResult<Option<T>>;
}

impl<T> OptionalExt<T> for RepoResult<T> {
    fn optional(self) -> RepoResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

// From trait implementations for automatic error conversion
impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::DeadlineExceeded,
            std::io::ErrorKind::Interrupted => ErrorKind::Cancelled,
            _ => ErrorKind::IOError,
        };
        RepoError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::num::TryFromIntError> for RepoError {
    fn from(err: std::num::TryFromIntError) -> Self {
        RepoError::new(
            &format!("Integer conversion error: {}", err),
            ErrorKind::ObjectMappingError,
        )
    }
}

impl From<std::convert::Infallible> for RepoError {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl From<std::fmt::Error> for RepoError {
    fn from(err: std::fmt::Error) -> Self {
        RepoError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for RepoError {
    fn from(msg: String) -> Self {
        RepoError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RepoError {
    fn from(msg: &str) -> Self {
        RepoError::new(msg, ErrorKind::InternalError)
    }
}
