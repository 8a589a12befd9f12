//! Index definitions and the compact index expression compiler.
//!
//! An index expression is a comma-separated list of field tokens, each with an optional
//! leading `+` (ascending, the default) or `-` (descending):
//!
//! ```ignore
//! // one unique index on number_id, one compound index on name asc / age desc
//! let models = indexes_to_models(&["number_id"], &["name,-age"])?;
//! ```

mod compiler;
mod model;
mod options;

pub use compiler::*;
pub use model::*;
pub use options::*;
