//! The store collaborator seam.
//!
//! The repository never talks to a database directly. It shapes inputs into [Document]s
//! and hands them to a [StoreCollection]; transactions go through a [StoreClient] and
//! the [StoreSession]s it starts. A database driver adapter implements these traits.
//!
//! [Document]: crate::common::Document

mod client;
mod collection;
mod cursor;
mod options;
mod results;

#[cfg(test)]
pub(crate) mod mock;

pub use client::*;
pub use collection::*;
pub use cursor::*;
pub use options::*;
pub use results::*;
