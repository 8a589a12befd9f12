use crate::common::{Context, Convertible, Document, Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::index::{indexes_to_models, IndexModel};
use crate::repository::hooks::AfterHookGuard;
use crate::repository::normalizer::{set_update, to_storage_document, to_update_fields};
use crate::repository::{Entity, Indexes, Query, Update, UpdateMode};
use crate::store::{
    AggregateOptions, Collection, CollectionOptions, CountOptions, FindOneAndDeleteOptions,
    FindOneAndUpdateOptions, FindOptions, InsertManyOptions, InsertManyResult, InsertOneResult,
    ReturnDocument, UpdateOptions, UpdateResult,
};
use std::marker::PhantomData;

/// A typed CRUD surface over one store collection.
///
/// # Purpose
///
/// `Repository<T>` binds an [Entity] type to a [Collection] and runs every operation the
/// same way: filters and update payloads are normalized into documents, lifecycle hooks
/// are threaded around the store call, and store errors are returned unchanged.
///
/// # Characteristics
///
/// - **Stateless**: holds only the collection handle and its [UpdateMode]; cheap to clone
///   and safe to share between threads
/// - **Typed or raw arguments**: every filter is a [Query], every update an [Update]
/// - **Guaranteed after-hooks**: `after_insert` and `after_update` run on every exit path,
///   including store failures
/// - **Context threaded through**: cancellation, deadlines and the transaction session
///   travel in the [Context] handed to the store
///
/// # Examples
///
/// ```rust,ignore
/// let repo: Repository<User> = Repository::new(collection);
///
/// let mut user = User { name: "ada".into(), age: 36, ..Default::default() };
/// repo.insert_one(&ctx, &mut user)?;
///
/// let found = repo.find_one(&ctx, Query::Typed(User { age: 36, ..Default::default() }))?;
/// repo.update_by_id(&ctx, found.id(), doc! { "$inc": { age: 1 } })?;
/// ```
pub struct Repository<T: Entity> {
    collection: Collection,
    update_mode: UpdateMode,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            collection: self.collection.clone(),
            update_mode: self.update_mode,
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    /// Creates a repository with the default [UpdateMode].
    pub fn new(collection: Collection) -> Repository<T> {
        Repository::builder(collection).build()
    }

    pub fn builder(collection: Collection) -> RepositoryBuilder<T> {
        RepositoryBuilder::new(collection)
    }

    /// The name of the bound collection.
    pub fn name(&self) -> String {
        self.collection.name()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// A repository of the same type over the collection reconfigured with `options`.
    pub fn clone_with_options(&self, options: &CollectionOptions) -> RepoResult<Repository<T>> {
        let collection = self.collection.clone_with_options(options)?;
        Ok(Repository {
            collection,
            update_mode: self.update_mode,
            _phantom: PhantomData,
        })
    }

    /// Inserts one entity.
    ///
    /// # Behavior
    ///
    /// - Calls `before_insert`, which for [`crate::repository::DefaultFields`] assigns the
    ///   identifier and timestamps
    /// - Stores the entity without its unset fields
    /// - Calls `after_insert` when the call returns, whether or not the store succeeded
    ///
    /// The entity is taken by mutable reference so the caller keeps every change made by
    /// the hooks, including on the failure path.
    pub fn insert_one(&self, ctx: &Context, entity: &mut T) -> RepoResult<InsertOneResult> {
        log::debug!("insert_one into {}", self.name());
        entity.before_insert(ctx);
        let guard = AfterHookGuard::new(ctx, std::slice::from_mut(entity), T::after_insert);

        let document = to_storage_document(&guard[0])?;
        self.collection.insert_one(ctx, document)
    }

    /// Inserts every entity in one store call. See [`Repository::insert_many_with_options`].
    pub fn insert_many(&self, ctx: &Context, entities: &mut [T]) -> RepoResult<InsertManyResult> {
        self.insert_many_with_options(ctx, entities, &InsertManyOptions::new())
    }

    /// Inserts every entity in one store call.
    ///
    /// `before_insert` runs on all entities first. `after_insert` runs on all of them when
    /// the call returns, even if encoding failed part-way through or the store rejected
    /// the batch.
    pub fn insert_many_with_options(
        &self,
        ctx: &Context,
        entities: &mut [T],
        options: &InsertManyOptions,
    ) -> RepoResult<InsertManyResult> {
        log::debug!("insert_many of {} entities into {}", entities.len(), self.name());
        for entity in entities.iter_mut() {
            entity.before_insert(ctx);
        }
        let guard = AfterHookGuard::new(ctx, entities, T::after_insert);

        let documents = guard
            .iter()
            .map(to_storage_document)
            .collect::<RepoResult<Vec<Document>>>()?;
        self.collection.insert_many(ctx, documents, options)
    }

    /// Deletes the first document matching `filter` and returns the deleted count.
    pub fn delete_one(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<u64> {
        log::debug!("delete_one from {}", self.name());
        let filter = filter.into().into_document()?;
        Ok(self.collection.delete_one(ctx, filter)?.deleted_count())
    }

    /// Deletes every document matching `filter` and returns the deleted count.
    pub fn delete_many(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<u64> {
        log::debug!("delete_many from {}", self.name());
        let filter = filter.into().into_document()?;
        Ok(self.collection.delete_many(ctx, filter)?.deleted_count())
    }

    /// Updates the document whose `_id` is `id`.
    pub fn update_by_id(
        &self,
        ctx: &Context,
        id: impl Into<Value>,
        update: impl Into<Update<T>>,
    ) -> RepoResult<UpdateResult> {
        self.update_one(ctx, id_filter(id), update)
    }

    pub fn update_one(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
    ) -> RepoResult<UpdateResult> {
        self.update_one_with_options(ctx, filter, update, &UpdateOptions::new())
    }

    /// Updates the first document matching `filter`.
    ///
    /// # Behavior
    ///
    /// - A typed payload runs `before_update`, is turned into `{ "$set": fields }` following
    ///   the repository's [UpdateMode], and runs `after_update` when the call returns
    /// - A raw update document is submitted as is and runs no hooks
    pub fn update_one_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        log::debug!("update_one in {}", self.name());
        let filter = filter.into().into_document()?;
        self.submit_update(ctx, update.into(), |update| {
            self.collection.update_one(ctx, filter, update, options)
        })
    }

    pub fn update_many(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
    ) -> RepoResult<UpdateResult> {
        self.update_many_with_options(ctx, filter, update, &UpdateOptions::new())
    }

    /// Updates every document matching `filter`. Typed and raw payloads are handled as in
    /// [`Repository::update_one_with_options`].
    pub fn update_many_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        log::debug!("update_many in {}", self.name());
        let filter = filter.into().into_document()?;
        self.submit_update(ctx, update.into(), |update| {
            self.collection.update_many(ctx, filter, update, options)
        })
    }

    pub fn find(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<Vec<T>> {
        self.find_with_options(ctx, filter, &FindOptions::new())
    }

    /// Returns every entity matching `filter`, after running `after_find` on each in
    /// order. No match yields an empty `Vec`.
    pub fn find_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        options: &FindOptions,
    ) -> RepoResult<Vec<T>> {
        log::debug!("find in {}", self.name());
        let filter = filter.into().into_document()?;
        let cursor = self.collection.find(ctx, filter, options)?;

        let mut entities = cursor.all::<T>()?;
        for entity in entities.iter_mut() {
            entity.after_find(ctx);
        }
        Ok(entities)
    }

    pub fn find_one(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<T> {
        self.find_one_with_options(ctx, filter, &FindOptions::new())
    }

    /// Returns the first entity matching `filter`, or an [`ErrorKind::NotFound`] error.
    pub fn find_one_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        options: &FindOptions,
    ) -> RepoResult<T> {
        log::debug!("find_one in {}", self.name());
        let filter = filter.into().into_document()?;
        let document = self.collection.find_one(ctx, filter, options)?;
        self.found(ctx, document, "find_one")
    }

    /// Finds the entity whose `_id` is `id`.
    pub fn get(&self, ctx: &Context, id: impl Into<Value>) -> RepoResult<T> {
        self.find_one(ctx, id_filter(id))
    }

    pub fn find_one_and_delete(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<T> {
        self.find_one_and_delete_with_options(ctx, filter, &FindOneAndDeleteOptions::new())
    }

    /// Deletes the first document matching `filter` and returns it, or an
    /// [`ErrorKind::NotFound`] error.
    pub fn find_one_and_delete_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        options: &FindOneAndDeleteOptions,
    ) -> RepoResult<T> {
        log::debug!("find_one_and_delete in {}", self.name());
        let filter = filter.into().into_document()?;
        let document = self.collection.find_one_and_delete(ctx, filter, options)?;
        self.found(ctx, document, "find_one_and_delete")
    }

    pub fn find_one_and_update(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
    ) -> RepoResult<T> {
        self.find_one_and_update_with_options(
            ctx,
            filter,
            update,
            &FindOneAndUpdateOptions::new(),
        )
    }

    /// Updates the first document matching `filter` and returns it as it is after the
    /// update, whatever `options` asks for.
    ///
    /// A typed payload runs `before_update` on the payload and `after_update` on the
    /// returned entity. A raw update runs `after_find` on the returned entity.
    pub fn find_one_and_update_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        update: impl Into<Update<T>>,
        options: &FindOneAndUpdateOptions,
    ) -> RepoResult<T> {
        log::debug!("find_one_and_update in {}", self.name());
        let filter = filter.into().into_document()?;
        let options = options.clone().return_document(ReturnDocument::After);

        match update.into() {
            Update::Typed(mut entity) => {
                entity.before_update(ctx);
                let mut guard =
                    AfterHookGuard::new(ctx, std::slice::from_mut(&mut entity), T::after_update);

                let update = set_update(to_update_fields(&guard[0], self.update_mode)?);
                let document = self
                    .collection
                    .find_one_and_update(ctx, filter, update, &options)?;
                let document = self.require(document, "find_one_and_update")?;
                guard[0] = decode(document)?;
                drop(guard);
                Ok(entity)
            }
            Update::Raw(update) => {
                let document = self
                    .collection
                    .find_one_and_update(ctx, filter, update, &options)?;
                self.found(ctx, document, "find_one_and_update")
            }
        }
    }

    pub fn count(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<u64> {
        self.count_with_options(ctx, filter, &CountOptions::new())
    }

    pub fn count_with_options(
        &self,
        ctx: &Context,
        filter: impl Into<Query<T>>,
        options: &CountOptions,
    ) -> RepoResult<u64> {
        let filter = filter.into().into_document()?;
        self.collection.count_documents(ctx, filter, options)
    }

    /// Same as [`Repository::count`].
    pub fn count_documents(&self, ctx: &Context, filter: impl Into<Query<T>>) -> RepoResult<u64> {
        self.count(ctx, filter)
    }

    pub fn estimated_count(&self, ctx: &Context) -> RepoResult<u64> {
        self.collection.estimated_document_count(ctx)
    }

    /// Same as [`Repository::estimated_count`].
    pub fn estimated_document_count(&self, ctx: &Context) -> RepoResult<u64> {
        self.estimated_count(ctx)
    }

    pub fn distinct(
        &self,
        ctx: &Context,
        field_name: &str,
        filter: impl Into<Query<T>>,
    ) -> RepoResult<Vec<Value>> {
        let filter = filter.into().into_document()?;
        self.collection.distinct(ctx, field_name, filter)
    }

    pub fn aggregate<R>(
        &self,
        ctx: &Context,
        pipeline: Vec<Document>,
        results: &mut Vec<R>,
    ) -> RepoResult<()>
    where
        R: Convertible<Output = R>,
    {
        self.aggregate_with_options(ctx, pipeline, results, &AggregateOptions::new())
    }

    /// Runs `pipeline` and replaces the contents of `results` with the decoded output.
    /// No hooks run; the output rarely has the shape of `T`.
    pub fn aggregate_with_options<R>(
        &self,
        ctx: &Context,
        pipeline: Vec<Document>,
        results: &mut Vec<R>,
        options: &AggregateOptions,
    ) -> RepoResult<()>
    where
        R: Convertible<Output = R>,
    {
        log::debug!("aggregate in {} with {} stages", self.name(), pipeline.len());
        let cursor = self.collection.aggregate(ctx, pipeline, options)?;
        *results = cursor.all::<R>()?;
        Ok(())
    }

    /// Compiles `uniques` and `indexes` (see [`crate::index`]), appends `models`, and
    /// creates them all in one store call. Returns the names of the created indexes.
    ///
    /// Nothing is sent to the store when there is nothing to create or when an expression
    /// is malformed.
    pub fn ensure_indexes<U, I>(
        &self,
        ctx: &Context,
        uniques: &[U],
        indexes: &[I],
        models: Vec<IndexModel>,
    ) -> RepoResult<Vec<String>>
    where
        U: AsRef<str>,
        I: AsRef<str>,
    {
        let mut all_models = indexes_to_models(uniques, indexes)?;
        all_models.extend(models);
        if all_models.is_empty() {
            log::debug!("No indexes to create on {}", self.name());
            return Ok(vec![]);
        }

        log::debug!("Creating {} indexes on {}", all_models.len(), self.name());
        self.collection.create_indexes(ctx, all_models)
    }

    /// Creates the indexes a type declares through [Indexes].
    pub fn ensure_indexes_by_model(
        &self,
        ctx: &Context,
        model: &impl Indexes,
    ) -> RepoResult<Vec<String>> {
        self.ensure_indexes(ctx, &model.uniques(), &model.indexes(), model.index_models())
    }

    pub fn list_indexes(&self, ctx: &Context) -> RepoResult<Vec<Document>> {
        self.collection.list_indexes(ctx)
    }

    fn submit_update<R>(
        &self,
        ctx: &Context,
        update: Update<T>,
        submit: impl FnOnce(Document) -> RepoResult<R>,
    ) -> RepoResult<R> {
        match update {
            Update::Typed(mut entity) => {
                entity.before_update(ctx);
                let guard =
                    AfterHookGuard::new(ctx, std::slice::from_mut(&mut entity), T::after_update);

                let fields = to_update_fields(&guard[0], self.update_mode)?;
                submit(set_update(fields))
            }
            Update::Raw(update) => submit(update),
        }
    }

    fn require(&self, document: Option<Document>, operation: &str) -> RepoResult<Document> {
        match document {
            Some(document) => Ok(document),
            None => {
                log::error!("{} found no document in {}", operation, self.name());
                Err(RepoError::new(
                    &format!("No matching document in collection {}", self.name()),
                    ErrorKind::NotFound,
                ))
            }
        }
    }

    fn found(&self, ctx: &Context, document: Option<Document>, operation: &str) -> RepoResult<T> {
        let document = self.require(document, operation)?;
        let mut entity: T = decode(document)?;
        entity.after_find(ctx);
        Ok(entity)
    }
}

/// Configures a [Repository] before it is built.
pub struct RepositoryBuilder<T: Entity> {
    collection: Collection,
    update_mode: UpdateMode,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Entity> RepositoryBuilder<T> {
    fn new(collection: Collection) -> RepositoryBuilder<T> {
        RepositoryBuilder {
            collection,
            update_mode: UpdateMode::default(),
            _phantom: PhantomData,
        }
    }

    /// How typed update payloads become `$set` fields.
    pub fn update_mode(mut self, update_mode: UpdateMode) -> RepositoryBuilder<T> {
        self.update_mode = update_mode;
        self
    }

    pub fn build(self) -> Repository<T> {
        Repository {
            collection: self.collection,
            update_mode: self.update_mode,
            _phantom: PhantomData,
        }
    }
}

fn id_filter(id: impl Into<Value>) -> Document {
    let mut filter = Document::new();
    filter.put(DOC_ID, id.into());
    filter
}

fn decode<T: Entity>(document: Document) -> RepoResult<T> {
    T::from_value(&Value::Document(document))
}
