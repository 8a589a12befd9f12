use crate::index::IndexModel;
use crate::repository::DefaultFields;

/// Index definitions declared by a document type.
///
/// `uniques` and `indexes` return compact index expressions (see [`crate::index`]);
/// `index_models` returns fully built models for anything the expression language cannot
/// say, such as TTL or text indexes. All three default to empty. The `Indexes` derive in
/// `docrepo_derive` generates the first two from attributes:
///
/// ```rust,ignore
/// #[derive(Default, Convertible, Indexes)]
/// #[indexes(unique = "number_id", index = "title,-created_at")]
/// struct Paper { number_id: i64, title: String }
///
/// repo.ensure_indexes_by_model(&ctx, &Paper::default())?;
/// ```
pub trait Indexes {
    fn uniques(&self) -> Vec<String> {
        vec![]
    }

    fn indexes(&self) -> Vec<String> {
        vec![]
    }

    fn index_models(&self) -> Vec<IndexModel> {
        vec![]
    }
}

impl Indexes for DefaultFields {}
