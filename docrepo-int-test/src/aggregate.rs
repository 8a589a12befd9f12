//! Pipeline stages for the in-memory store: `$match`, `$sort`, `$skip`, `$limit`,
//! `$project`, `$group` and `$count`.

use crate::document_ops::{matches, project, sort_documents};
use docrepo::common::{Document, Value, DOC_ID};
use docrepo::errors::{ErrorKind, RepoError, RepoResult};

pub fn run_stage(documents: Vec<Document>, stage: &Document) -> RepoResult<Vec<Document>> {
    if stage.len() != 1 {
        return Err(invalid("A pipeline stage must have exactly one operator"));
    }
    let (operator, spec) = match stage.iter().next() {
        Some(entry) => entry,
        None => return Err(invalid("Empty pipeline stage")),
    };

    match operator.as_str() {
        "$match" => {
            let filter = stage_document(operator, spec)?;
            let mut kept = vec![];
            for doc in documents {
                if matches(&doc, filter)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }
        "$sort" => {
            let mut documents = documents;
            sort_documents(&mut documents, stage_document(operator, spec)?);
            Ok(documents)
        }
        "$skip" => Ok(documents.into_iter().skip(stage_count(operator, spec)?).collect()),
        "$limit" => Ok(documents.into_iter().take(stage_count(operator, spec)?).collect()),
        "$project" => {
            let projection = stage_document(operator, spec)?;
            Ok(documents.into_iter().map(|d| project(d, projection)).collect())
        }
        "$group" => group(documents, stage_document(operator, spec)?),
        "$count" => {
            let field = spec
                .as_str()
                .ok_or_else(|| invalid("$count takes a field name"))?;
            let mut counted = Document::new();
            counted.put(field, documents.len() as i64);
            Ok(vec![counted])
        }
        other => Err(invalid(&format!("Unsupported pipeline stage {}", other))),
    }
}

fn group(documents: Vec<Document>, spec: &Document) -> RepoResult<Vec<Document>> {
    let key_spec = spec
        .get(DOC_ID)
        .ok_or_else(|| invalid("$group needs an _id expression"))?;

    let mut groups: Vec<(Value, Document)> = vec![];
    for doc in documents.iter() {
        let key = resolve(doc, key_spec);
        let position = match groups.iter().position(|(k, _)| *k == key) {
            Some(position) => position,
            None => {
                let mut seed = Document::new();
                seed.put(DOC_ID, key.clone());
                groups.push((key, seed));
                groups.len() - 1
            }
        };

        let accumulated = &mut groups[position].1;
        for (field, accumulator) in spec.iter().filter(|(k, _)| k.as_str() != DOC_ID) {
            let expression = accumulator
                .as_document()
                .and_then(|a| a.get("$sum"))
                .ok_or_else(|| invalid(&format!("Only $sum is supported for {}", field)))?;
            let addend = resolve(doc, expression);
            let total = match accumulated.get(field) {
                Some(current) => add(current, &addend),
                None => add(&Value::I64(0), &addend),
            };
            accumulated.put(field.as_str(), total);
        }
    }
    Ok(groups.into_iter().map(|(_, doc)| doc).collect())
}

// "$field" reads a field; anything else is a constant.
fn resolve(doc: &Document, expression: &Value) -> Value {
    match expression.as_str().and_then(|s| s.strip_prefix('$')) {
        Some(path) => doc.get_path(path).cloned().unwrap_or_default(),
        None => expression.clone(),
    }
}

fn add(current: &Value, addend: &Value) -> Value {
    if !addend.is_number() {
        return current.clone();
    }
    match (current, addend) {
        (Value::F64(_), _) | (_, Value::F64(_)) => Value::F64(
            current.as_f64().unwrap_or_default() + addend.as_f64().unwrap_or_default(),
        ),
        _ => Value::I64(
            current
                .as_integer()
                .unwrap_or_default()
                .wrapping_add(addend.as_integer().unwrap_or_default()),
        ),
    }
}

fn stage_document<'a>(operator: &str, spec: &'a Value) -> RepoResult<&'a Document> {
    spec.as_document()
        .ok_or_else(|| invalid(&format!("{} takes a document", operator)))
}

fn stage_count(operator: &str, spec: &Value) -> RepoResult<usize> {
    spec.as_integer()
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .ok_or_else(|| invalid(&format!("{} takes a non negative number", operator)))
}

fn invalid(message: &str) -> RepoError {
    RepoError::new(message, ErrorKind::ValidationError)
}
