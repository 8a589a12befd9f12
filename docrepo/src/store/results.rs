use crate::common::Value;

/// Result of a single-document insert.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertOneResult {
    inserted_id: Value,
}

impl InsertOneResult {
    pub fn new(inserted_id: Value) -> Self {
        Self { inserted_id }
    }

    /// The `_id` of the inserted document, as stored.
    pub fn inserted_id(&self) -> &Value {
        &self.inserted_id
    }
}

/// Result of a batched insert.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertManyResult {
    inserted_ids: Vec<Value>,
}

impl InsertManyResult {
    pub fn new(inserted_ids: Vec<Value>) -> Self {
        Self { inserted_ids }
    }

    /// The `_id`s of the inserted documents, in batch order.
    pub fn inserted_ids(&self) -> &Vec<Value> {
        &self.inserted_ids
    }
}

/// Result of an update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateResult {
    matched_count: u64,
    modified_count: u64,
    upserted_id: Option<Value>,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<Value>) -> Self {
        Self {
            matched_count,
            modified_count,
            upserted_id,
        }
    }

    pub fn matched_count(&self) -> u64 {
        self.matched_count
    }

    /// Number of documents actually changed. A matched document whose fields already had
    /// the new values is not counted.
    pub fn modified_count(&self) -> u64 {
        self.modified_count
    }

    pub fn upserted_id(&self) -> Option<&Value> {
        self.upserted_id.as_ref()
    }
}

/// Result of a delete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteResult {
    deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self { deleted_count }
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }
}
