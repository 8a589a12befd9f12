//! Shared types: the document model exchanged with the store, value conversion,
//! identifiers and the request context.

mod constants;
mod context;
mod convertible;
mod document;
mod object_id;
mod sort_order;
mod value;

pub use constants::*;
pub use context::*;
pub use convertible::*;
pub use document::*;
pub use object_id::*;
pub use sort_order::*;
pub use value::*;
