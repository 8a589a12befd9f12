use crate::common::{Document, SortOrder};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::index::{unique_index, IndexModel};

/// Splits a field token into its name and sort direction.
///
/// A leading `+` means ascending and a leading `-` means descending; anything else is part
/// of the field name and the direction defaults to ascending.
///
/// ```ignore
/// assert_eq!(split_sort_field("-age"), ("age", SortOrder::Descending));
/// assert_eq!(split_sort_field("*f"), ("*f", SortOrder::Ascending));
/// ```
pub fn split_sort_field(field: &str) -> (&str, SortOrder) {
    if let Some(name) = field.strip_prefix('-') {
        (name, SortOrder::Descending)
    } else if let Some(name) = field.strip_prefix('+') {
        (name, SortOrder::Ascending)
    } else {
        (field, SortOrder::Ascending)
    }
}

/// Compiles one compound-key expression such as `name,-age` into an ordered key document.
///
/// Tokens are trimmed. An empty expression, an empty token or a bare sort marker is a
/// [ErrorKind::ValidationError].
pub fn index_keys(expression: &str) -> RepoResult<Document> {
    if expression.trim().is_empty() {
        log::error!("Index expression has no fields");
        return Err(RepoError::new(
            "Index expression has no fields",
            ErrorKind::ValidationError,
        ));
    }

    let mut keys = Document::new();
    for token in expression.split(',').map(str::trim) {
        let (field, order) = split_sort_field(token);
        if field.is_empty() {
            log::error!("Empty field name in index expression {:?}", expression);
            return Err(RepoError::new(
                &format!("Empty field name in index expression {:?}", expression),
                ErrorKind::ValidationError,
            ));
        }
        keys.put(field, order.as_i32());
    }
    Ok(keys)
}

/// Compiles unique and plain index expressions into index models.
///
/// Every unique expression yields one model marked unique, followed by one model without
/// options for every plain expression, in input order. The first malformed expression
/// fails the whole batch.
///
/// # Examples
///
/// ```ignore
/// let models = indexes_to_models(&["name"], &["name,-age", "-name"])?;
/// assert_eq!(models.len(), 3);
/// assert!(models[0].is_unique());
/// ```
pub fn indexes_to_models<U, I>(uniques: &[U], indexes: &[I]) -> RepoResult<Vec<IndexModel>>
where
    U: AsRef<str>,
    I: AsRef<str>,
{
    let mut models = Vec::with_capacity(uniques.len() + indexes.len());

    for expression in uniques {
        let keys = index_keys(expression.as_ref())?;
        models.push(IndexModel::with_options(keys, unique_index()));
    }

    for expression in indexes {
        let keys = index_keys(expression.as_ref())?;
        models.push(IndexModel::new(keys));
    }

    Ok(models)
}
