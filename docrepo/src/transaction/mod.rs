//! Transaction orchestration.
//!
//! [Transactor] wraps a store session around a caller callback: it starts the session,
//! runs the callback through the session's transaction, and always ends the session
//! afterwards. The callback receives a [`crate::common::Context`] bound to the session;
//! repository calls made with that context take part in the transaction.

mod transactor;

pub use transactor::*;
