use crate::common::{Context, Document, Value};
use crate::errors::RepoResult;
use crate::index::IndexModel;
use crate::store::{
    AggregateOptions, CollectionOptions, CountOptions, DeleteResult, DocumentCursor,
    FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions,
    InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
};
use std::ops::Deref;
use std::sync::Arc;

/// The collection-scoped half of the store collaborator.
///
/// A store client implements this trait for one named collection. Filters, updates and
/// documents arrive already normalized into [Document] form; the implementation executes
/// them and reports failures with [`crate::errors::RepoError`], using
/// [`crate::errors::ErrorKind::DuplicateKey`] for unique index violations.
///
/// Single-document reads return `Ok(None)` when nothing matches; the repository turns that
/// into its not-found error.
///
/// Every call receives the caller's [Context]. When the context is bound to a session,
/// the work belongs to that session's transaction.
pub trait StoreCollection: Send + Sync {
    /// The collection name.
    fn name(&self) -> String;

    /// A new handle to the same collection with different settings.
    fn clone_with_options(&self, options: &CollectionOptions) -> RepoResult<Collection>;

    fn insert_one(&self, ctx: &Context, document: Document) -> RepoResult<InsertOneResult>;

    fn insert_many(
        &self,
        ctx: &Context,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> RepoResult<InsertManyResult>;

    fn delete_one(&self, ctx: &Context, filter: Document) -> RepoResult<DeleteResult>;

    fn delete_many(&self, ctx: &Context, filter: Document) -> RepoResult<DeleteResult>;

    fn update_one(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult>;

    fn update_many(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult>;

    fn find(
        &self,
        ctx: &Context,
        filter: Document,
        options: &FindOptions,
    ) -> RepoResult<DocumentCursor>;

    fn find_one(
        &self,
        ctx: &Context,
        filter: Document,
        options: &FindOptions,
    ) -> RepoResult<Option<Document>>;

    fn find_one_and_delete(
        &self,
        ctx: &Context,
        filter: Document,
        options: &FindOneAndDeleteOptions,
    ) -> RepoResult<Option<Document>>;

    fn find_one_and_update(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &FindOneAndUpdateOptions,
    ) -> RepoResult<Option<Document>>;

    fn count_documents(
        &self,
        ctx: &Context,
        filter: Document,
        options: &CountOptions,
    ) -> RepoResult<u64>;

    /// A fast count from collection metadata, ignoring any filter.
    fn estimated_document_count(&self, ctx: &Context) -> RepoResult<u64>;

    fn distinct(&self, ctx: &Context, field_name: &str, filter: Document) -> RepoResult<Vec<Value>>;

    fn aggregate(
        &self,
        ctx: &Context,
        pipeline: Vec<Document>,
        options: &AggregateOptions,
    ) -> RepoResult<DocumentCursor>;

    /// Creates the given indexes and returns their names. Creating an index that already
    /// exists with the same definition succeeds.
    fn create_indexes(&self, ctx: &Context, models: Vec<IndexModel>) -> RepoResult<Vec<String>>;

    /// Describes the existing indexes, one document per index with at least `name` and
    /// `key` fields.
    fn list_indexes(&self, ctx: &Context) -> RepoResult<Vec<Document>>;
}

/// A shared handle to a store collection.
///
/// `Collection` is cheap to clone; all clones talk to the same [StoreCollection].
///
/// ```ignore
/// let collection = Collection::new(my_store.collection("users"));
/// let repo: Repository<User> = Repository::new(collection);
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<dyn StoreCollection>,
}

impl Collection {
    pub fn new<S: StoreCollection + 'static>(inner: S) -> Self {
        Collection {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<dyn StoreCollection>) -> Self {
        Collection { inner }
    }
}

impl Deref for Collection {
    type Target = Arc<dyn StoreCollection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
