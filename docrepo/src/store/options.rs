use crate::common::{Document, SortOrder};
use std::time::Duration;

/// Options for `find` and `find_one`.
///
/// ```ignore
/// let opts = FindOptions::new().sort_by("age", SortOrder::Descending).limit(10);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    sort: Option<Document>,
    skip: Option<u64>,
    limit: Option<u64>,
    projection: Option<Document>,
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    /// Appends a sort key. Keys apply in the order they are added.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort
            .get_or_insert_with(Document::new)
            .put(field_name, sort_order.as_i32());
        self
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Document) -> FindOptions {
        self.projection = Some(projection);
        self
    }

    pub fn get_sort(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_projection(&self) -> Option<&Document> {
        self.projection.as_ref()
    }
}

/// Options for `insert_many`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InsertManyOptions {
    ordered: Option<bool>,
}

impl InsertManyOptions {
    pub fn new() -> InsertManyOptions {
        InsertManyOptions::default()
    }

    /// When ordered (the store default), the batch stops at the first failed document.
    pub fn ordered(mut self, ordered: bool) -> InsertManyOptions {
        self.ordered = Some(ordered);
        self
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered.unwrap_or(true)
    }
}

/// Options for `update_one` and `update_many`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOptions {
    upsert: Option<bool>,
}

impl UpdateOptions {
    pub fn new() -> UpdateOptions {
        UpdateOptions::default()
    }

    /// Inserts a new document built from the filter and update when nothing matches.
    pub fn upsert(mut self, upsert: bool) -> UpdateOptions {
        self.upsert = Some(upsert);
        self
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }
}

/// Which version of the document `find_one_and_update` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    #[default]
    Before,
    /// The document as it is after the update.
    After,
}

/// Options for `find_one_and_update`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneAndUpdateOptions {
    return_document: ReturnDocument,
    upsert: Option<bool>,
    sort: Option<Document>,
    projection: Option<Document>,
}

impl FindOneAndUpdateOptions {
    pub fn new() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::default()
    }

    pub fn return_document(mut self, return_document: ReturnDocument) -> FindOneAndUpdateOptions {
        self.return_document = return_document;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> FindOneAndUpdateOptions {
        self.upsert = Some(upsert);
        self
    }

    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOneAndUpdateOptions {
        self.sort
            .get_or_insert_with(Document::new)
            .put(field_name, sort_order.as_i32());
        self
    }

    pub fn projection(mut self, projection: Document) -> FindOneAndUpdateOptions {
        self.projection = Some(projection);
        self
    }

    pub fn get_return_document(&self) -> ReturnDocument {
        self.return_document
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }

    pub fn get_sort(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    pub fn get_projection(&self) -> Option<&Document> {
        self.projection.as_ref()
    }
}

/// Options for `find_one_and_delete`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneAndDeleteOptions {
    sort: Option<Document>,
    projection: Option<Document>,
}

impl FindOneAndDeleteOptions {
    pub fn new() -> FindOneAndDeleteOptions {
        FindOneAndDeleteOptions::default()
    }

    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOneAndDeleteOptions {
        self.sort
            .get_or_insert_with(Document::new)
            .put(field_name, sort_order.as_i32());
        self
    }

    pub fn projection(mut self, projection: Document) -> FindOneAndDeleteOptions {
        self.projection = Some(projection);
        self
    }

    pub fn get_sort(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    pub fn get_projection(&self) -> Option<&Document> {
        self.projection.as_ref()
    }
}

/// Options for `count_documents`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountOptions {
    skip: Option<u64>,
    limit: Option<u64>,
}

impl CountOptions {
    pub fn new() -> CountOptions {
        CountOptions::default()
    }

    pub fn skip(mut self, skip: u64) -> CountOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> CountOptions {
        self.limit = Some(limit);
        self
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }
}

/// Options for `aggregate`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateOptions {
    allow_disk_use: Option<bool>,
    batch_size: Option<u32>,
}

impl AggregateOptions {
    pub fn new() -> AggregateOptions {
        AggregateOptions::default()
    }

    pub fn allow_disk_use(mut self, allow: bool) -> AggregateOptions {
        self.allow_disk_use = Some(allow);
        self
    }

    pub fn batch_size(mut self, batch_size: u32) -> AggregateOptions {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn is_disk_use_allowed(&self) -> bool {
        self.allow_disk_use.unwrap_or(false)
    }

    pub fn get_batch_size(&self) -> Option<u32> {
        self.batch_size
    }
}

/// Read routing preference of a collection handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPreference {
    #[default]
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

/// Isolation level of reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadConcern {
    Local,
    Majority,
    Snapshot,
}

/// Acknowledgement required for writes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteConcern {
    /// Number of nodes that must acknowledge; `None` means `majority`.
    pub nodes: Option<u32>,
    /// Wait for the write to reach the journal.
    pub journal: bool,
    pub timeout: Option<Duration>,
}

impl WriteConcern {
    pub fn majority() -> WriteConcern {
        WriteConcern::default()
    }

    pub fn nodes(nodes: u32) -> WriteConcern {
        WriteConcern {
            nodes: Some(nodes),
            ..WriteConcern::default()
        }
    }
}

/// Settings of a cloned collection handle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionOptions {
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
}

impl CollectionOptions {
    pub fn new() -> CollectionOptions {
        CollectionOptions::default()
    }

    pub fn read_preference(mut self, read_preference: ReadPreference) -> CollectionOptions {
        self.read_preference = Some(read_preference);
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> CollectionOptions {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn get_read_preference(&self) -> Option<ReadPreference> {
        self.read_preference
    }

    pub fn get_write_concern(&self) -> Option<&WriteConcern> {
        self.write_concern.as_ref()
    }
}

/// Settings of one transaction run by the [`crate::transaction::Transactor`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionOptions {
    read_concern: Option<ReadConcern>,
    write_concern: Option<WriteConcern>,
    max_commit_time: Option<Duration>,
}

impl TransactionOptions {
    pub fn new() -> TransactionOptions {
        TransactionOptions::default()
    }

    pub fn read_concern(mut self, read_concern: ReadConcern) -> TransactionOptions {
        self.read_concern = Some(read_concern);
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> TransactionOptions {
        self.write_concern = Some(write_concern);
        self
    }

    /// Upper bound for the commit step alone.
    pub fn max_commit_time(mut self, max_commit_time: Duration) -> TransactionOptions {
        self.max_commit_time = Some(max_commit_time);
        self
    }

    pub fn get_read_concern(&self) -> Option<ReadConcern> {
        self.read_concern
    }

    pub fn get_write_concern(&self) -> Option<&WriteConcern> {
        self.write_concern.as_ref()
    }

    pub fn get_max_commit_time(&self) -> Option<Duration> {
        self.max_commit_time
    }
}
