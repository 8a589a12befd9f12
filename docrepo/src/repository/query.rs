use crate::common::Document;

/// A filter argument: either a typed example document or a raw filter document.
///
/// A typed example matches on its non-zero fields only, so `Query::Typed(User { age: 2,
/// ..Default::default() })` means "age is 2". A raw document is passed to the store
/// untouched and may use operators.
///
/// ```rust,ignore
/// repo.find(&ctx, Query::Typed(User { age: 2, ..Default::default() }))?;
/// repo.find(&ctx, doc! { age: { "$gte": 2 } })?;
/// ```
#[derive(Clone, Debug)]
pub enum Query<T> {
    Typed(T),
    Raw(Document),
}

impl<T> From<Document> for Query<T> {
    fn from(value: Document) -> Self {
        Query::Raw(value)
    }
}

impl<T> Default for Query<T> {
    /// The empty filter, matching every document.
    fn default() -> Self {
        Query::Raw(Document::new())
    }
}

/// An update argument: either a typed payload or a raw update document.
///
/// A typed payload runs the update hooks and is wrapped in `$set`. A raw document (for
/// example `doc! { "$inc": { count: 1 } }`) is passed to the store untouched and runs no
/// hooks.
#[derive(Clone, Debug)]
pub enum Update<T> {
    Typed(T),
    Raw(Document),
}

impl<T> From<Document> for Update<T> {
    fn from(value: Document) -> Self {
        Update::Raw(value)
    }
}

/// How a typed update payload is turned into `$set` fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Set only the fields that are not zero. Zero values cannot be written through a
    /// typed update; use a raw update to clear a field.
    #[default]
    NonZeroFields,
    /// Set every field except the identifier and the creation time, so zero values in
    /// the payload overwrite stored values.
    AllFields,
}
