use crate::common::Document;
use std::time::Duration;

/// Options attached to one index definition.
///
/// Every field is optional; unset fields are left to the store's defaults. The setters
/// consume and return `self` so options can be built inline:
///
/// ```ignore
/// let opts = IndexOptions::new().unique(true).name("uniq_email");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexOptions {
    name: Option<String>,
    unique: Option<bool>,
    sparse: Option<bool>,
    expire_after: Option<Duration>,
    partial_filter: Option<Document>,
}

impl IndexOptions {
    pub fn new() -> IndexOptions {
        IndexOptions::default()
    }

    /// Sets an explicit index name instead of the generated `field_1_other_-1` form.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    /// Skips documents that lack the indexed fields.
    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = Some(sparse);
        self
    }

    /// Expires documents this long after the time stored in the indexed field.
    pub fn expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    /// Indexes only the documents matching `filter`.
    pub fn partial_filter(mut self, filter: Document) -> Self {
        self.partial_filter = Some(filter);
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse.unwrap_or(false)
    }

    pub fn get_expire_after(&self) -> Option<Duration> {
        self.expire_after
    }

    pub fn get_partial_filter(&self) -> Option<&Document> {
        self.partial_filter.as_ref()
    }
}

/// Creates options for a unique index.
#[inline]
pub fn unique_index() -> IndexOptions {
    IndexOptions::new().unique(true)
}
