use crate::common::Value;
use indexmap::map::{IntoIter, Iter};
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

/// The generic document form exchanged with the store.
///
/// A `Document` is an insertion-ordered map from field names to [Value]s. Field order is
/// significant: it is the key order of an index definition and the order in which update
/// fields are applied, so it is preserved through every operation of this type.
///
/// Keys are taken literally. Operator keys such as `$set` and dotted paths such as
/// `address.city` are plain keys here; [`Document::get_path`] walks dotted paths on read.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::doc;
///
/// let filter = doc! {
///     name: "alice",
///     age: { "$gte": 18 },
/// };
/// assert_eq!(filter.keys().collect::<Vec<_>>(), vec!["name", "age"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`, returning the previous value if any.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Looks up a dotted path such as `address.city` through embedded documents.
    ///
    /// A key that exists verbatim at the top level wins over path traversal.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = match current {
                Value::Document(doc) => doc.get(segment)?,
                Value::Array(items) => {
                    let index: usize = segment.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Removes `key`, keeping the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.data.iter()
    }

    /// Copies every field of `other` into this document, overwriting existing keys.
    pub fn merge(&mut self, other: Document) {
        for (key, value) in other {
            self.data.insert(key, value);
        }
    }

    /// Retains only the fields for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut Value) -> bool) {
        self.data.retain(|k, v| keep(k, v));
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.put(k, v);
        }
        doc
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys in [`doc!`].
#[doc(hidden)]
pub fn normalize_key(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys may be identifiers or string literals (needed for operator keys such as `"$set"`).
/// Values are literals, nested `{ ... }` documents, `[ ... ]` arrays or parenthesized
/// expressions.
///
/// # Examples
///
/// ```rust
/// use docrepo::doc;
///
/// let update = doc! {
///     "$inc": { count: 1 },
///     "$set": { name: "counter", tags: ["a", "b"], order: (-1) },
/// };
/// assert_eq!(update.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::common::Document::new()
    };

    () => {
        $crate::common::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::common::Document::new();
            $(
                doc.put($crate::common::normalize_key(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Helper macro converting the values of [`doc!`].
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
