//! An in-memory document store and test helpers for exercising docrepo end to end.

pub mod aggregate;
pub mod document_ops;
pub mod memory_store;
pub mod test_util;
