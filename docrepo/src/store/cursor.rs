use crate::common::{Convertible, Document, Value};
use crate::errors::RepoResult;

/// A stream of documents returned by the store for `find` and `aggregate`.
///
/// Each item is a `RepoResult` so a store can report a failure part-way through the
/// stream, for example when a batch fetch times out.
pub struct DocumentCursor {
    inner: Box<dyn Iterator<Item = RepoResult<Document>> + Send>,
}

impl DocumentCursor {
    pub fn new(iter: impl Iterator<Item = RepoResult<Document>> + Send + 'static) -> Self {
        DocumentCursor {
            inner: Box::new(iter),
        }
    }

    /// A cursor over documents that are already in memory.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        DocumentCursor::new(documents.into_iter().map(Ok))
    }

    /// Drains the cursor, stopping at the first error.
    pub fn collect_documents(self) -> RepoResult<Vec<Document>> {
        self.collect()
    }

    /// Drains the cursor and decodes every document as `T`.
    pub fn all<T>(self) -> RepoResult<Vec<T>>
    where
        T: Convertible<Output = T>,
    {
        self.map(|doc| T::from_value(&Value::Document(doc?)))
            .collect()
    }
}

impl Iterator for DocumentCursor {
    type Item = RepoResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
