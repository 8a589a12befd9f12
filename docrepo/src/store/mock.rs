//! Recording store doubles for unit tests.

use crate::common::{Context, Document, Value, DOC_ID};
use crate::errors::{RepoError, RepoResult};
use crate::index::IndexModel;
use crate::store::{
    AggregateOptions, Collection, CollectionOptions, CountOptions, DeleteResult, DocumentCursor,
    FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions,
    InsertManyResult, InsertOneResult, ReturnDocument, Session, StoreClient, StoreCollection,
    StoreSession, TransactionCallback, TransactionOptions, UpdateOptions, UpdateResult,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    InsertOne(Document),
    InsertMany(Vec<Document>),
    DeleteOne(Document),
    DeleteMany(Document),
    UpdateOne(Document, Document),
    UpdateMany(Document, Document),
    Find(Document),
    FindOne(Document),
    FindOneAndDelete(Document),
    FindOneAndUpdate(Document, Document, ReturnDocument),
    Count(Document),
    EstimatedCount,
    Distinct(String, Document),
    Aggregate(Vec<Document>),
    CreateIndexes(Vec<IndexModel>),
    ListIndexes,
}

#[derive(Default)]
struct CollectionState {
    calls: Vec<Call>,
    documents: Vec<Document>,
    count: u64,
    failure: Option<RepoError>,
}

/// A collection that records every call and answers from canned documents.
#[derive(Clone, Default)]
pub(crate) struct MockCollection {
    state: Arc<Mutex<CollectionState>>,
}

impl MockCollection {
    pub(crate) fn new() -> Self {
        MockCollection::default()
    }

    /// Documents returned by reads; `count` also answers counts and write results.
    pub(crate) fn with_documents(self, documents: Vec<Document>) -> Self {
        {
            let mut state = self.state.lock();
            state.count = documents.len() as u64;
            state.documents = documents;
        }
        self
    }

    /// Every call fails with `err` after being recorded.
    pub(crate) fn failing(self, err: RepoError) -> Self {
        self.state.lock().failure = Some(err);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn collection(&self) -> Collection {
        Collection::new(self.clone())
    }

    fn record(&self, call: Call) -> RepoResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match &state.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn first(&self) -> Option<Document> {
        self.state.lock().documents.first().cloned()
    }

    fn count(&self) -> u64 {
        self.state.lock().count
    }
}

impl StoreCollection for MockCollection {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn clone_with_options(&self, _options: &CollectionOptions) -> RepoResult<Collection> {
        Ok(Collection::new(self.clone()))
    }

    fn insert_one(&self, _ctx: &Context, document: Document) -> RepoResult<InsertOneResult> {
        let id = document.get(DOC_ID).cloned().unwrap_or_default();
        self.record(Call::InsertOne(document))?;
        Ok(InsertOneResult::new(id))
    }

    fn insert_many(
        &self,
        _ctx: &Context,
        documents: Vec<Document>,
        _options: &InsertManyOptions,
    ) -> RepoResult<InsertManyResult> {
        let ids = documents
            .iter()
            .map(|d| d.get(DOC_ID).cloned().unwrap_or_default())
            .collect();
        self.record(Call::InsertMany(documents))?;
        Ok(InsertManyResult::new(ids))
    }

    fn delete_one(&self, _ctx: &Context, filter: Document) -> RepoResult<DeleteResult> {
        self.record(Call::DeleteOne(filter))?;
        Ok(DeleteResult::new(self.count().min(1)))
    }

    fn delete_many(&self, _ctx: &Context, filter: Document) -> RepoResult<DeleteResult> {
        self.record(Call::DeleteMany(filter))?;
        Ok(DeleteResult::new(self.count()))
    }

    fn update_one(
        &self,
        _ctx: &Context,
        filter: Document,
        update: Document,
        _options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        self.record(Call::UpdateOne(filter, update))?;
        let n = self.count().min(1);
        Ok(UpdateResult::new(n, n, None))
    }

    fn update_many(
        &self,
        _ctx: &Context,
        filter: Document,
        update: Document,
        _options: &UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        self.record(Call::UpdateMany(filter, update))?;
        Ok(UpdateResult::new(self.count(), self.count(), None))
    }

    fn find(
        &self,
        _ctx: &Context,
        filter: Document,
        _options: &FindOptions,
    ) -> RepoResult<DocumentCursor> {
        self.record(Call::Find(filter))?;
        Ok(DocumentCursor::from_documents(self.state.lock().documents.clone()))
    }

    fn find_one(
        &self,
        _ctx: &Context,
        filter: Document,
        _options: &FindOptions,
    ) -> RepoResult<Option<Document>> {
        self.record(Call::FindOne(filter))?;
        Ok(self.first())
    }

    fn find_one_and_delete(
        &self,
        _ctx: &Context,
        filter: Document,
        _options: &FindOneAndDeleteOptions,
    ) -> RepoResult<Option<Document>> {
        self.record(Call::FindOneAndDelete(filter))?;
        Ok(self.first())
    }

    fn find_one_and_update(
        &self,
        _ctx: &Context,
        filter: Document,
        update: Document,
        options: &FindOneAndUpdateOptions,
    ) -> RepoResult<Option<Document>> {
        self.record(Call::FindOneAndUpdate(filter, update, options.get_return_document()))?;
        Ok(self.first())
    }

    fn count_documents(
        &self,
        _ctx: &Context,
        filter: Document,
        _options: &CountOptions,
    ) -> RepoResult<u64> {
        self.record(Call::Count(filter))?;
        Ok(self.count())
    }

    fn estimated_document_count(&self, _ctx: &Context) -> RepoResult<u64> {
        self.record(Call::EstimatedCount)?;
        Ok(self.count())
    }

    fn distinct(&self, _ctx: &Context, field_name: &str, filter: Document) -> RepoResult<Vec<Value>> {
        self.record(Call::Distinct(field_name.to_string(), filter))?;
        let mut values: Vec<Value> = vec![];
        for doc in self.state.lock().documents.iter() {
            if let Some(value) = doc.get(field_name) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }

    fn aggregate(
        &self,
        _ctx: &Context,
        pipeline: Vec<Document>,
        _options: &AggregateOptions,
    ) -> RepoResult<DocumentCursor> {
        self.record(Call::Aggregate(pipeline))?;
        Ok(DocumentCursor::from_documents(self.state.lock().documents.clone()))
    }

    fn create_indexes(&self, _ctx: &Context, models: Vec<IndexModel>) -> RepoResult<Vec<String>> {
        let names = models.iter().map(|m| m.name()).collect();
        self.record(Call::CreateIndexes(models))?;
        Ok(names)
    }

    fn list_indexes(&self, _ctx: &Context) -> RepoResult<Vec<Document>> {
        self.record(Call::ListIndexes)?;
        Ok(vec![])
    }
}

#[derive(Default)]
pub(crate) struct SessionLog {
    pub(crate) started: u32,
    pub(crate) ended: u32,
    pub(crate) committed: u32,
    pub(crate) aborted: u32,
    pub(crate) callback_sessions: Vec<Option<String>>,
    pub(crate) start_failure: Option<RepoError>,
    pub(crate) commit_failure: Option<RepoError>,
}

/// A client whose sessions run the callback once and record the outcome.
#[derive(Clone, Default)]
pub(crate) struct MockClient {
    pub(crate) log: Arc<Mutex<SessionLog>>,
}

impl MockClient {
    pub(crate) fn new() -> Self {
        MockClient::default()
    }

    pub(crate) fn failing_start(self, err: RepoError) -> Self {
        self.log.lock().start_failure = Some(err);
        self
    }

    pub(crate) fn failing_commit(self, err: RepoError) -> Self {
        self.log.lock().commit_failure = Some(err);
        self
    }
}

impl StoreClient for MockClient {
    fn start_session(&self, _ctx: &Context) -> RepoResult<Session> {
        let mut log = self.log.lock();
        if let Some(err) = &log.start_failure {
            return Err(err.clone());
        }
        log.started += 1;
        Ok(Session::new(MockSession {
            id: format!("session-{}", log.started),
            log: self.log.clone(),
        }))
    }
}

pub(crate) struct MockSession {
    id: String,
    log: Arc<Mutex<SessionLog>>,
}

impl StoreSession for MockSession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn with_transaction(
        &self,
        ctx: &Context,
        callback: &mut TransactionCallback<'_>,
        _options: &TransactionOptions,
    ) -> RepoResult<()> {
        self.log
            .lock()
            .callback_sessions
            .push(ctx.session_id().map(|s| s.to_string()));

        if let Err(err) = callback(ctx) {
            self.log.lock().aborted += 1;
            return Err(err);
        }

        let mut log = self.log.lock();
        if let Some(err) = log.commit_failure.clone() {
            log.aborted += 1;
            return Err(err);
        }
        log.committed += 1;
        Ok(())
    }

    fn end_session(&self, _ctx: &Context) {
        self.log.lock().ended += 1;
    }
}
