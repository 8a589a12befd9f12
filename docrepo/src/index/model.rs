use crate::common::{Document, Value, INDEX_NAME_SEPARATOR};
use crate::index::IndexOptions;
use itertools::Itertools;

/// A structured index definition handed to the store.
///
/// `keys` is an ordered document mapping each field to its direction (`1` or `-1`) or to a
/// special index kind such as `"text"`. Key order is the compound-index order.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexModel {
    keys: Document,
    options: Option<IndexOptions>,
}

impl IndexModel {
    pub fn new(keys: Document) -> IndexModel {
        IndexModel { keys, options: None }
    }

    pub fn with_options(keys: Document, options: IndexOptions) -> IndexModel {
        IndexModel {
            keys,
            options: Some(options),
        }
    }

    pub fn keys(&self) -> &Document {
        &self.keys
    }

    pub fn options(&self) -> Option<&IndexOptions> {
        self.options.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.is_unique())
    }

    /// Indexed field names in key order.
    pub fn fields(&self) -> Vec<&str> {
        self.keys.keys().collect()
    }

    /// The explicit name from the options, or the conventional name built from the keys,
    /// for example `name_1_age_-1`.
    pub fn name(&self) -> String {
        if let Some(name) = self.options.as_ref().and_then(|o| o.get_name()) {
            return name.to_string();
        }

        self.keys
            .iter()
            .map(|(field, direction)| match direction {
                Value::String(kind) => format!("{}{}{}", field, INDEX_NAME_SEPARATOR, kind),
                other => format!("{}{}{}", field, INDEX_NAME_SEPARATOR, other),
            })
            .join(INDEX_NAME_SEPARATOR)
    }
}
