use crate::common::{
    field_or_default, Context, Convertible, Document, ObjectId, Value, DOC_CREATED_AT, DOC_ID,
    DOC_UPDATED_AT,
};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};

/// The contract every type stored through a [`crate::repository::Repository`] implements.
///
/// Besides conversion to and from documents, an entity exposes five lifecycle hooks. The
/// repository calls them around every operation:
///
/// | hook            | called                                                        |
/// |-----------------|---------------------------------------------------------------|
/// | `before_insert` | before an insert is submitted                                 |
/// | `after_insert`  | when an insert returns, on success and on failure             |
/// | `before_update` | before a typed update payload is submitted                    |
/// | `after_update`  | when a typed update returns, on success and on failure        |
/// | `after_find`    | on every document decoded from a read                         |
///
/// Hooks cannot fail an operation. The provided implementations delegate to the
/// [DefaultFields] returned by [`Entity::default_fields`], so a type that embeds
/// `DefaultFields` gets identifier and timestamp maintenance without writing any hook:
///
/// ```rust,ignore
/// #[derive(Default, Convertible)]
/// struct User {
///     #[converter(flatten)]
///     meta: DefaultFields,
///     name: String,
///     age: i32,
/// }
///
/// impl Entity for User {
///     fn default_fields(&mut self) -> Option<&mut DefaultFields> {
///         Some(&mut self.meta)
///     }
///
///     fn after_find(&mut self, _ctx: &Context) {
///         log::debug!("loaded {}", self.name);
///     }
/// }
/// ```
pub trait Entity: Convertible<Output = Self> + Default + Send + Sync {
    /// The embedded identifier and timestamp fields, if the type has them.
    fn default_fields(&mut self) -> Option<&mut DefaultFields> {
        None
    }

    fn before_insert(&mut self, ctx: &Context) {
        if let Some(fields) = self.default_fields() {
            fields.before_insert(ctx);
        }
    }

    fn after_insert(&mut self, ctx: &Context) {
        if let Some(fields) = self.default_fields() {
            fields.after_insert(ctx);
        }
    }

    fn before_update(&mut self, ctx: &Context) {
        if let Some(fields) = self.default_fields() {
            fields.before_update(ctx);
        }
    }

    fn after_update(&mut self, ctx: &Context) {
        if let Some(fields) = self.default_fields() {
            fields.after_update(ctx);
        }
    }

    fn after_find(&mut self, ctx: &Context) {
        if let Some(fields) = self.default_fields() {
            fields.after_find(ctx);
        }
    }
}

/// Identifier, creation time and last-modified time, stored as `_id`, `created_at` and
/// `updated_at`.
///
/// Unset fields encode as null and are left out of stored documents and filters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DefaultFields {
    pub id: Option<ObjectId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DefaultFields {
    /// Assigns a fresh identifier unless one is already set.
    pub fn default_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(ObjectId::new());
        }
    }

    /// Sets the creation time unless one is already set.
    pub fn default_created_at(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    /// Sets the last-modified time to now.
    pub fn default_updated_at(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

impl Convertible for DefaultFields {
    type Output = DefaultFields;

    fn to_value(&self) -> RepoResult<Value> {
        let mut doc = Document::new();
        doc.put(DOC_ID, self.id);
        doc.put(DOC_CREATED_AT, self.created_at);
        doc.put(DOC_UPDATED_AT, self.updated_at);
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Document(doc) => Ok(DefaultFields {
                id: field_or_default(doc, DOC_ID)?,
                created_at: field_or_default(doc, DOC_CREATED_AT)?,
                updated_at: field_or_default(doc, DOC_UPDATED_AT)?,
            }),
            _ => {
                log::error!("Value {} is not a document", value);
                Err(RepoError::new(
                    "Value is not a document",
                    ErrorKind::ObjectMappingError,
                ))
            }
        }
    }
}

impl Entity for DefaultFields {
    fn before_insert(&mut self, _ctx: &Context) {
        self.default_id();
        self.default_created_at();
        self.default_updated_at();
    }

    fn after_insert(&mut self, _ctx: &Context) {}

    fn before_update(&mut self, _ctx: &Context) {
        self.default_updated_at();
    }

    fn after_update(&mut self, _ctx: &Context) {}

    fn after_find(&mut self, _ctx: &Context) {}
}
