//! An in-memory document store implementing the docrepo store traits.
//!
//! Collections keep their documents in insertion order. Unique indexes are enforced.
//! Transactions work on a private copy of each collection they touch; the copies replace
//! the committed collections on commit and are dropped on abort.

use crate::document_ops::{apply_update, matches, project, sort_documents, upsert_seed};
use docrepo::common::{Context, Document, ObjectId, Value, DOC_ID};
use docrepo::errors::{ErrorKind, RepoError, RepoResult};
use docrepo::index::{IndexModel, IndexOptions};
use docrepo::store::{
    AggregateOptions, Client, Collection, CollectionOptions, CountOptions, DeleteResult,
    DocumentCursor, FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions,
    InsertManyOptions, InsertManyResult, InsertOneResult, ReturnDocument, Session, StoreClient,
    StoreCollection, StoreSession, TransactionCallback, TransactionOptions, UpdateOptions,
    UpdateResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const ID_INDEX_NAME: &str = "_id_";

#[derive(Clone, Default)]
struct CollectionData {
    documents: Vec<Document>,
    indexes: Vec<IndexModel>,
}

impl CollectionData {
    fn position(&self, filter: &Document, sort: Option<&Document>) -> RepoResult<Option<usize>> {
        let mut candidates = vec![];
        for (position, doc) in self.documents.iter().enumerate() {
            if matches(doc, filter)? {
                candidates.push(position);
            }
        }
        match sort {
            Some(sort) if !sort.is_empty() => {
                let mut sorted: Vec<Document> =
                    candidates.iter().map(|p| self.documents[*p].clone()).collect();
                sort_documents(&mut sorted, sort);
                Ok(sorted.first().and_then(|first| {
                    let id = first.get(DOC_ID);
                    self.documents
                        .iter()
                        .position(|d| d.get(DOC_ID) == id)
                }))
            }
            _ => Ok(candidates.first().copied()),
        }
    }

    fn matching(&self, filter: &Document) -> RepoResult<Vec<Document>> {
        let mut found = vec![];
        for doc in self.documents.iter() {
            if matches(doc, filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    /// Rejects `candidate` if it collides with another document on `_id` or on a unique
    /// index. `skip` is the position of the document being replaced, if any.
    fn check_unique(&self, collection: &str, candidate: &Document, skip: Option<usize>) -> RepoResult<()> {
        let others = self
            .documents
            .iter()
            .enumerate()
            .filter(|(position, _)| Some(*position) != skip)
            .map(|(_, doc)| doc);

        for other in others {
            if other.get(DOC_ID) == candidate.get(DOC_ID) {
                return Err(duplicate_key(collection, ID_INDEX_NAME, candidate.get(DOC_ID)));
            }
            for index in self.indexes.iter().filter(|i| i.is_unique()) {
                let sparse = index.options().is_some_and(|o| o.is_sparse());
                let key = index_key(candidate, index);
                if sparse && key.iter().all(|v| v.is_null()) {
                    continue;
                }
                if key == index_key(other, index) {
                    return Err(duplicate_key(collection, &index.name(), key.first()));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, collection: &str, mut doc: Document) -> RepoResult<Value> {
        if !doc.contains_key(DOC_ID) {
            let mut with_id = Document::new();
            with_id.put(DOC_ID, ObjectId::new());
            with_id.merge(doc);
            doc = with_id;
        }
        self.check_unique(collection, &doc, None)?;
        let id = doc.get(DOC_ID).cloned().unwrap_or_default();
        self.documents.push(doc);
        Ok(id)
    }

    fn update_at(&mut self, collection: &str, position: usize, update: &Document) -> RepoResult<bool> {
        let mut updated = self.documents[position].clone();
        apply_update(&mut updated, update)?;
        if updated == self.documents[position] {
            return Ok(false);
        }
        self.check_unique(collection, &updated, Some(position))?;
        self.documents[position] = updated;
        Ok(true)
    }

    fn upsert(&mut self, collection: &str, filter: &Document, update: &Document) -> RepoResult<Value> {
        let mut doc = upsert_seed(filter)?;
        apply_update(&mut doc, update)?;
        self.insert(collection, doc)
    }
}

fn index_key(doc: &Document, index: &IndexModel) -> Vec<Value> {
    index
        .fields()
        .iter()
        .map(|field| doc.get_path(field).cloned().unwrap_or_default())
        .collect()
}

fn duplicate_key(collection: &str, index: &str, value: Option<&Value>) -> RepoError {
    let value = value.cloned().unwrap_or_default();
    log::debug!("Duplicate key {} on index {} of {}", value, index, collection);
    RepoError::new(
        &format!(
            "E11000 duplicate key error collection: {} index: {} dup key: {}",
            collection, index, value
        ),
        ErrorKind::DuplicateKey,
    )
}

/// Counters describing the session traffic a store has seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub started: u32,
    pub ended: u32,
    pub committed: u32,
    pub aborted: u32,
}

#[derive(Default)]
struct SessionData {
    // collections copied into the running transaction, if one is running
    transaction: Option<HashMap<String, CollectionData>>,
}

#[derive(Default)]
struct StoreInner {
    collections: Mutex<HashMap<String, CollectionData>>,
    sessions: Mutex<HashMap<String, SessionData>>,
    stats: Mutex<SessionStats>,
    start_failure: Mutex<Option<RepoError>>,
    commit_failure: Mutex<Option<RepoError>>,
}

/// An in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(MemoryCollection {
            name: name.to_string(),
            store: self.clone(),
            options: CollectionOptions::new(),
        })
    }

    pub fn client(&self) -> Client {
        Client::new(self.clone())
    }

    pub fn stats(&self) -> SessionStats {
        *self.inner.stats.lock()
    }

    /// Sessions started and not yet ended.
    pub fn open_sessions(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// The committed documents of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .collections
            .lock()
            .get(collection)
            .map(|data| data.documents.clone())
            .unwrap_or_default()
    }

    /// The next `start_session` fails with `err`.
    pub fn fail_next_session_start(&self, err: RepoError) {
        *self.inner.start_failure.lock() = Some(err);
    }

    /// The next commit fails with `err` and the transaction is aborted.
    pub fn fail_next_commit(&self, err: RepoError) {
        *self.inner.commit_failure.lock() = Some(err);
    }

    /// Runs `f` on the collection as seen by `ctx`: the transaction's copy when `ctx` is
    /// bound to a session with a running transaction, the committed data otherwise.
    fn with_data<R>(
        &self,
        ctx: &Context,
        collection: &str,
        f: impl FnOnce(&mut CollectionData) -> RepoResult<R>,
    ) -> RepoResult<R> {
        ctx.check()?;

        if let Some(session_id) = ctx.session_id() {
            let mut sessions = self.inner.sessions.lock();
            let session = sessions.get_mut(session_id).ok_or_else(|| {
                RepoError::new(
                    &format!("Session {} has ended", session_id),
                    ErrorKind::SessionError,
                )
            })?;
            if let Some(transaction) = session.transaction.as_mut() {
                let data = transaction.entry(collection.to_string()).or_insert_with(|| {
                    self.inner
                        .collections
                        .lock()
                        .get(collection)
                        .cloned()
                        .unwrap_or_default()
                });
                return f(data);
            }
        }

        let mut collections = self.inner.collections.lock();
        f(collections.entry(collection.to_string()).or_default())
    }

    fn commit(&self, session_id: &str) -> RepoResult<()> {
        let transaction = self
            .inner
            .sessions
            .lock()
            .get_mut(session_id)
            .and_then(|s| s.transaction.take());

        if let Some(err) = self.inner.commit_failure.lock().take() {
            return Err(err);
        }

        let mut collections = self.inner.collections.lock();
        for (name, data) in transaction.unwrap_or_default() {
            collections.insert(name, data);
        }
        Ok(())
    }

    fn abort(&self, session_id: &str) {
        if let Some(session) = self.inner.sessions.lock().get_mut(session_id) {
            session.transaction = None;
        }
        self.inner.stats.lock().aborted += 1;
    }
}

impl StoreClient for MemoryStore {
    fn start_session(&self, ctx: &Context) -> RepoResult<Session> {
        ctx.check()?;
        if let Some(err) = self.inner.start_failure.lock().take() {
            log::error!("Session start failed: {}", err);
            return Err(err);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.inner
            .sessions
            .lock()
            .insert(id.clone(), SessionData::default());
        self.inner.stats.lock().started += 1;
        log::debug!("Started session {}", id);

        Ok(Session::new(MemorySession {
            id,
            store: self.clone(),
        }))
    }
}

struct MemorySession {
    id: String,
    store: MemoryStore,
}

impl StoreSession for MemorySession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn with_transaction(
        &self,
        ctx: &Context,
        callback: &mut TransactionCallback<'_>,
        options: &TransactionOptions,
    ) -> RepoResult<()> {
        {
            let mut sessions = self.store.inner.sessions.lock();
            let session = sessions.get_mut(&self.id).ok_or_else(|| {
                RepoError::new("Session has ended", ErrorKind::SessionError)
            })?;
            if session.transaction.is_some() {
                return Err(RepoError::new(
                    "Transaction already in progress",
                    ErrorKind::SessionError,
                ));
            }
            session.transaction = Some(HashMap::new());
        }
        log::debug!(
            "Session {} started a transaction with read concern {:?}",
            self.id,
            options.get_read_concern()
        );

        if let Err(err) = callback(ctx) {
            self.store.abort(&self.id);
            return Err(err);
        }

        if let Err(err) = ctx.check().and_then(|_| self.store.commit(&self.id)) {
            self.store.abort(&self.id);
            return Err(err);
        }
        self.store.inner.stats.lock().committed += 1;
        Ok(())
    }

    fn end_session(&self, _ctx: &Context) {
        if self.store.inner.sessions.lock().remove(&self.id).is_none() {
            log::warn!("Session {} ended twice", self.id);
        }
        self.store.inner.stats.lock().ended += 1;
    }
}

/// One named collection of a [MemoryStore].
pub struct MemoryCollection {
    name: String,
    store: MemoryStore,
    options: CollectionOptions,
}

impl MemoryCollection {
    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    fn with_data<R>(
        &self,
        ctx: &Context,
        f: impl FnOnce(&mut CollectionData) -> RepoResult<R>,
    ) -> RepoResult<R> {
        self.store.with_data(ctx, &self.name, f)
    }
}

impl StoreCollection for MemoryCollection {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn clone_with_options(&self, options: &CollectionOptions) -> RepoResult<Collection> {
        Ok(Collection::new(MemoryCollection {
            name: self.name.clone(),
            store: self.store.clone(),
            options: options.clone(),
        }))
    }

    fn insert_one(&self, ctx: &Context, document: Document) -> RepoResult<InsertOneResult> {
        let name = self.name.as_str();
        self.with_data(ctx, |data| Ok(InsertOneResult::new(data.insert(name, document)?)))
    }

    fn insert_many(
        &self,
        ctx: &Context,
        documents: Vec<Document>,
        options: &InsertManyOptions,
    ) -> RepoResult<InsertManyResult> {
        if documents.is_empty() {
            return Err(RepoError::new(
                "insert_many needs at least one document",
                ErrorKind::InvalidOperation,
            ));
        }

        let name = self.name.as_str();
        self.with_data(ctx, |data| {
            let mut ids = vec![];
            let mut first_error = None;
            for document in documents {
                match data.insert(name, document) {
                    Ok(id) => ids.push(id),
                    Err(err) if options.is_ordered() => return Err(err),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }
            match first_error {
                Some(err) => Err(err),
                None => Ok(InsertManyResult::new(ids)),
            }
        })
    }

    fn delete_one(&self, ctx: &Context, filter: Document) -> RepoResult<DeleteResult> {
        self.with_data(ctx, |data| match data.position(&filter, None)? {
            Some(position) => {
                data.documents.remove(position);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        })
    }

    fn delete_many(&self, ctx: &Context, filter: Document) -> RepoResult<DeleteResult> {
        self.with_data(ctx, |data| {
            let mut doomed = Vec::with_capacity(data.documents.len());
            for doc in data.documents.iter() {
                doomed.push(matches(doc, &filter)?);
            }
            let mut flags = doomed.iter();
            data.documents.retain(|_| !flags.next().copied().unwrap_or(false));
            let deleted = doomed.iter().filter(|d| **d).count();
            Ok(DeleteResult::new(deleted as u64))
        })
    }

    fn update_one(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        let name = self.name.as_str();
        self.with_data(ctx, |data| match data.position(&filter, None)? {
            Some(position) => {
                let modified = data.update_at(name, position, &update)?;
                Ok(UpdateResult::new(1, modified as u64, None))
            }
            None if options.is_upsert() => {
                let id = data.upsert(name, &filter, &update)?;
                Ok(UpdateResult::new(0, 0, Some(id)))
            }
            None => Ok(UpdateResult::new(0, 0, None)),
        })
    }

    fn update_many(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        let name = self.name.as_str();
        self.with_data(ctx, |data| {
            let mut positions = vec![];
            for (position, doc) in data.documents.iter().enumerate() {
                if matches(doc, &filter)? {
                    positions.push(position);
                }
            }

            if positions.is_empty() && options.is_upsert() {
                let id = data.upsert(name, &filter, &update)?;
                return Ok(UpdateResult::new(0, 0, Some(id)));
            }

            let mut modified = 0;
            for position in positions.iter() {
                if data.update_at(name, *position, &update)? {
                    modified += 1;
                }
            }
            Ok(UpdateResult::new(positions.len() as u64, modified, None))
        })
    }

    fn find(&self, ctx: &Context, filter: Document, options: &FindOptions) -> RepoResult<DocumentCursor> {
        let mut found = self.with_data(ctx, |data| data.matching(&filter))?;
        if let Some(sort) = options.get_sort() {
            sort_documents(&mut found, sort);
        }

        let skip = options.get_skip().unwrap_or(0) as usize;
        let limit = options.get_limit().map(|l| l as usize).unwrap_or(usize::MAX);
        let projection = options.get_projection().cloned();
        let page: Vec<Document> = found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &projection {
                Some(projection) => project(doc, projection),
                None => doc,
            })
            .collect();
        Ok(DocumentCursor::from_documents(page))
    }

    fn find_one(
        &self,
        ctx: &Context,
        filter: Document,
        options: &FindOptions,
    ) -> RepoResult<Option<Document>> {
        let options = options.clone().limit(1);
        let mut cursor = self.find(ctx, filter, &options)?;
        cursor.next().transpose()
    }

    fn find_one_and_delete(
        &self,
        ctx: &Context,
        filter: Document,
        options: &FindOneAndDeleteOptions,
    ) -> RepoResult<Option<Document>> {
        let deleted = self.with_data(ctx, |data| {
            Ok(data
                .position(&filter, options.get_sort())?
                .map(|position| data.documents.remove(position)))
        })?;
        Ok(deleted.map(|doc| match options.get_projection() {
            Some(projection) => project(doc, projection),
            None => doc,
        }))
    }

    fn find_one_and_update(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: &FindOneAndUpdateOptions,
    ) -> RepoResult<Option<Document>> {
        let name = self.name.as_str();
        let result = self.with_data(ctx, |data| match data.position(&filter, options.get_sort())? {
            Some(position) => {
                let before = data.documents[position].clone();
                data.update_at(name, position, &update)?;
                Ok(Some(match options.get_return_document() {
                    ReturnDocument::Before => before,
                    ReturnDocument::After => data.documents[position].clone(),
                }))
            }
            None if options.is_upsert() => {
                let id = data.upsert(name, &filter, &update)?;
                Ok(match options.get_return_document() {
                    ReturnDocument::Before => None,
                    ReturnDocument::After => {
                        data.documents.iter().find(|d| d.get(DOC_ID) == Some(&id)).cloned()
                    }
                })
            }
            None => Ok(None),
        })?;

        Ok(result.map(|doc| match options.get_projection() {
            Some(projection) => project(doc, projection),
            None => doc,
        }))
    }

    fn count_documents(
        &self,
        ctx: &Context,
        filter: Document,
        options: &CountOptions,
    ) -> RepoResult<u64> {
        let found = self.with_data(ctx, |data| data.matching(&filter))?.len() as u64;
        let remaining = found.saturating_sub(options.get_skip().unwrap_or(0));
        Ok(match options.get_limit() {
            Some(limit) => remaining.min(limit),
            None => remaining,
        })
    }

    fn estimated_document_count(&self, ctx: &Context) -> RepoResult<u64> {
        ctx.check()?;
        Ok(self.store.documents(&self.name).len() as u64)
    }

    fn distinct(&self, ctx: &Context, field_name: &str, filter: Document) -> RepoResult<Vec<Value>> {
        let found = self.with_data(ctx, |data| data.matching(&filter))?;
        let mut values: Vec<Value> = vec![];
        for doc in found.iter() {
            let candidates = match doc.get_path(field_name) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => vec![],
            };
            for candidate in candidates {
                if !values.contains(&candidate) {
                    values.push(candidate);
                }
            }
        }
        Ok(values)
    }

    fn aggregate(
        &self,
        ctx: &Context,
        pipeline: Vec<Document>,
        _options: &AggregateOptions,
    ) -> RepoResult<DocumentCursor> {
        let mut documents = self.with_data(ctx, |data| Ok(data.documents.clone()))?;
        for stage in pipeline.iter() {
            documents = crate::aggregate::run_stage(documents, stage)?;
        }
        Ok(DocumentCursor::from_documents(documents))
    }

    fn create_indexes(&self, ctx: &Context, models: Vec<IndexModel>) -> RepoResult<Vec<String>> {
        let name = self.name.as_str();
        self.with_data(ctx, |data| {
            let mut names = vec![];
            for model in models {
                let index_name = model.name();
                if !data.indexes.iter().any(|i| i.name() == index_name) {
                    data.indexes.push(model);
                    if let Err(err) = validate_existing(data, name) {
                        data.indexes.pop();
                        return Err(err);
                    }
                }
                names.push(index_name);
            }
            Ok(names)
        })
    }

    fn list_indexes(&self, ctx: &Context) -> RepoResult<Vec<Document>> {
        self.with_data(ctx, |data| {
            let id_index = IndexModel::with_options(
                docrepo::doc! { _id: 1 },
                IndexOptions::new().name(ID_INDEX_NAME),
            );
            Ok(std::iter::once(&id_index)
                .chain(data.indexes.iter())
                .map(|index| {
                    let mut doc = Document::new();
                    doc.put("name", index.name());
                    doc.put("key", index.keys().clone());
                    if index.is_unique() {
                        doc.put("unique", true);
                    }
                    doc
                })
                .collect())
        })
    }
}

fn validate_existing(data: &CollectionData, collection: &str) -> RepoResult<()> {
    for (position, doc) in data.documents.iter().enumerate() {
        data.check_unique(collection, doc, Some(position))?;
    }
    Ok(())
}
