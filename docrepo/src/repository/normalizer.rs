use crate::common::{to_document, Convertible, Document, Value, DOC_CREATED_AT, DOC_ID, SET_OPERATOR};
use crate::errors::RepoResult;
use crate::repository::{Query, UpdateMode};

/// Keeps the non-zero fields of `doc`, flattening embedded documents into dotted paths
/// such as `address.city`.
///
/// Only the populated leaves of an embedded document end up in the result, so a filter
/// or `$set` built from it leaves the sibling fields of the stored subdocument alone.
/// Arrays are leaves and are kept unless empty.
pub fn flatten_non_zero_fields(doc: Document) -> Document {
    let mut flattened = Document::new();
    collect_non_zero(None, doc, &mut flattened);
    flattened
}

fn collect_non_zero(prefix: Option<&str>, doc: Document, out: &mut Document) {
    for (key, value) in doc {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Document(inner) => collect_non_zero(Some(&path), inner, out),
            value if value.is_zero() => {}
            value => {
                out.put(path, value);
            }
        }
    }
}

/// Removes null fields, descending into embedded documents. Other zero values are kept.
pub fn strip_null_fields(doc: Document) -> Document {
    let mut stripped = Document::new();
    for (key, value) in doc {
        match value {
            Value::Null => {}
            Value::Document(inner) => {
                stripped.put(key, Value::Document(strip_null_fields(inner)));
            }
            other => {
                stripped.put(key, other);
            }
        }
    }
    stripped
}

/// Converts a typed example into a filter document holding its non-zero fields, with
/// embedded fields addressed by dotted path.
pub fn to_filter_document<T: Convertible>(value: &T) -> RepoResult<Document> {
    Ok(flatten_non_zero_fields(to_document(value)?))
}

/// Converts a typed value into the document that is stored on insert. Only unset (null)
/// fields are left out so the store can assign defaults such as `_id`.
pub fn to_storage_document<T: Convertible>(value: &T) -> RepoResult<Document> {
    Ok(strip_null_fields(to_document(value)?))
}

/// Converts a typed update payload into the fields of a `$set`.
///
/// The identifier is never part of the set. With [`UpdateMode::NonZeroFields`] embedded
/// fields are set by dotted path. With [`UpdateMode::AllFields`] embedded documents are
/// replaced whole and the creation time is left out.
pub fn to_update_fields<T: Convertible>(value: &T, mode: UpdateMode) -> RepoResult<Document> {
    let mut fields = match mode {
        UpdateMode::NonZeroFields => to_filter_document(value)?,
        UpdateMode::AllFields => {
            let mut fields = to_document(value)?;
            fields.remove(DOC_CREATED_AT);
            fields
        }
    };
    fields.remove(DOC_ID);
    Ok(fields)
}

/// Wraps update fields as `{ "$set": fields }`.
pub fn set_update(fields: Document) -> Document {
    let mut update = Document::new();
    update.put(SET_OPERATOR, fields);
    update
}

impl<T: Convertible> Query<T> {
    /// The filter document the store receives.
    pub fn into_document(self) -> RepoResult<Document> {
        match self {
            Query::Typed(value) => to_filter_document(&value),
            Query::Raw(doc) => Ok(doc),
        }
    }
}
