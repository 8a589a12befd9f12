//! The typed repository engine.
//!
//! [Repository] gives every [Entity] type the same CRUD surface over one store
//! collection. Filters and updates are [Query] / [Update] values: typed examples are
//! normalized into documents by the [normalizer], raw documents are passed through.
//! Lifecycle hooks declared on [Entity] run around every operation.

mod entity;
mod hooks;
mod indexes;
pub mod normalizer;
mod query;
mod repository;

pub use entity::*;
pub use indexes::*;
pub use query::*;
pub use repository::*;
