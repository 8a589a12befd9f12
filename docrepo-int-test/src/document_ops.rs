//! Filter, update, sort and projection evaluation for the in-memory store.

use docrepo::common::{Document, Value, DOC_ID};
use docrepo::errors::{ErrorKind, RepoError, RepoResult};
use std::cmp::Ordering;

/// Whether `doc` satisfies `filter`. Supports equality, `$eq`, `$ne`, `$gt`, `$gte`,
/// `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$and`, `$or` and dotted paths.
pub fn matches(doc: &Document, filter: &Document) -> RepoResult<bool> {
    for (key, condition) in filter.iter() {
        let matched = match key.as_str() {
            "$and" => all_match(doc, condition)?,
            "$or" => any_match(doc, condition)?,
            _ if key.starts_with('$') => {
                return Err(invalid(&format!("Unsupported top level operator {}", key)))
            }
            _ => field_matches(doc.get_path(key), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_match(doc: &Document, filters: &Value) -> RepoResult<bool> {
    for filter in filter_list(filters)? {
        if !matches(doc, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(doc: &Document, filters: &Value) -> RepoResult<bool> {
    for filter in filter_list(filters)? {
        if matches(doc, filter)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn filter_list(value: &Value) -> RepoResult<Vec<&Document>> {
    let array = value
        .as_array()
        .ok_or_else(|| invalid("$and and $or take an array of filters"))?;
    array
        .iter()
        .map(|v| v.as_document().ok_or_else(|| invalid("Filter must be a document")))
        .collect()
}

fn is_operator_document(value: &Value) -> bool {
    match value.as_document() {
        Some(doc) => !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')),
        None => false,
    }
}

fn field_matches(field: Option<&Value>, condition: &Value) -> RepoResult<bool> {
    if !is_operator_document(condition) {
        return Ok(equals(field, condition));
    }

    let operators = match condition.as_document() {
        Some(operators) => operators,
        None => return Ok(false),
    };
    for (operator, operand) in operators.iter() {
        let matched = match operator.as_str() {
            "$eq" => equals(field, operand),
            "$ne" => !equals(field, operand),
            "$gt" => compares(field, operand, |o| o == Ordering::Greater),
            "$gte" => compares(field, operand, |o| o != Ordering::Less),
            "$lt" => compares(field, operand, |o| o == Ordering::Less),
            "$lte" => compares(field, operand, |o| o != Ordering::Greater),
            "$in" => in_list(field, operand)?,
            "$nin" => !in_list(field, operand)?,
            "$exists" => field.is_some() == operand.as_bool().unwrap_or(true),
            other => return Err(invalid(&format!("Unsupported operator {}", other))),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
    }
}

fn compares(field: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        Some(value) => value.compare(operand).is_some_and(accept),
        None => false,
    }
}

fn in_list(field: Option<&Value>, operand: &Value) -> RepoResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| invalid("$in and $nin take an array"))?;
    Ok(candidates.iter().any(|c| equals(field, c)))
}

/// Applies an update document made of `$set`, `$unset` and `$inc` operators.
pub fn apply_update(doc: &mut Document, update: &Document) -> RepoResult<()> {
    if update.is_empty() || !update.keys().all(|k| k.starts_with('$')) {
        return Err(invalid("Update document must contain only update operators"));
    }

    for (operator, fields) in update.iter() {
        let fields = fields
            .as_document()
            .ok_or_else(|| invalid(&format!("{} takes a document", operator)))?;
        for (path, value) in fields.iter() {
            let changes_id = path == DOC_ID
                && doc.contains_key(DOC_ID)
                && (operator != "$set" || doc.get(DOC_ID) != Some(value));
            if changes_id {
                return Err(invalid("The field '_id' is immutable"));
            }
            match operator.as_str() {
                "$set" => set_path(doc, path, value.clone())?,
                "$unset" => {
                    remove_path(doc, path);
                }
                "$inc" => {
                    let current = doc.get_path(path).cloned();
                    set_path(doc, path, increment(current, value)?)?;
                }
                other => return Err(invalid(&format!("Unsupported update operator {}", other))),
            }
        }
    }
    Ok(())
}

fn increment(current: Option<Value>, by: &Value) -> RepoResult<Value> {
    if !by.is_number() {
        return Err(invalid("$inc takes a number"));
    }
    match (current.unwrap_or(Value::I32(0)), by) {
        (Value::I32(a), Value::I32(b)) => Ok(match a.checked_add(*b) {
            Some(sum) => Value::I32(sum),
            None => Value::I64(a as i64 + *b as i64),
        }),
        (Value::F64(a), b) => Ok(Value::F64(a + b.as_f64().unwrap_or_default())),
        (a, Value::F64(b)) if a.is_number() => Ok(Value::F64(a.as_f64().unwrap_or_default() + b)),
        (a, b) if a.is_number() => {
            let a = a.as_integer().unwrap_or_default();
            let b = b.as_integer().unwrap_or_default();
            Ok(Value::I64(a.wrapping_add(b)))
        }
        (other, _) => Err(invalid(&format!(
            "Cannot apply $inc to a value of type {}",
            other.kind_name()
        ))),
    }
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> RepoResult<()> {
    match path.split_once('.') {
        None => {
            doc.put(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.put(head, Document::new());
            }
            match doc.get_mut(head).and_then(|v| v.as_document_mut()) {
                Some(inner) => set_path(inner, rest, value),
                None => Err(invalid(&format!("Cannot create field {} in a non-document", path))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(inner) = doc.get_mut(head).and_then(|v| v.as_document_mut()) {
                remove_path(inner, rest);
            }
        }
    }
}

/// The document an upsert starts from: the plain equality fields of the filter, with
/// dotted paths expanded into embedded documents.
pub fn upsert_seed(filter: &Document) -> RepoResult<Document> {
    let mut seed = Document::new();
    for (key, value) in filter.iter() {
        if !key.starts_with('$') && !is_operator_document(value) {
            set_path(&mut seed, key, value.clone())?;
        }
    }
    Ok(seed)
}

/// Sorts by a `{ field: 1 | -1 }` document, keeping the store order for ties.
pub fn sort_documents(docs: &mut [Document], sort: &Document) {
    docs.sort_by(|a, b| {
        for (field, direction) in sort.iter() {
            let left = a.get_path(field).cloned().unwrap_or_default();
            let right = b.get_path(field).cloned().unwrap_or_default();
            let ordering = left.compare(&right).unwrap_or(Ordering::Equal);
            let ordering = if direction.as_integer().unwrap_or(1) < 0 {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Applies an inclusion (`{ a: 1 }`) or exclusion (`{ a: 0 }`) projection. `_id` is kept
/// unless excluded explicitly.
pub fn project(doc: Document, projection: &Document) -> Document {
    let included = |value: &Value| value.as_integer().map(|v| v != 0).or(value.as_bool());
    let inclusive = projection
        .iter()
        .any(|(k, v)| k != DOC_ID && included(v).unwrap_or(true));

    let mut projected = Document::new();
    for (key, value) in doc {
        let rule = projection.get(&key).and_then(included);
        let keep = match rule {
            Some(keep) => keep,
            None => !inclusive || key == DOC_ID,
        };
        if keep {
            projected.put(key, value);
        }
    }
    projected
}

fn invalid(message: &str) -> RepoError {
    RepoError::new(message, ErrorKind::ValidationError)
}
