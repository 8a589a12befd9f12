mod transaction_repository_test;

use docrepo::common::Context;
use docrepo::doc;
use docrepo::errors::RepoResult;
use docrepo::repository::{DefaultFields, Entity, Repository};
use docrepo::store::UpdateOptions;
use docrepo_derive::{Convertible, Indexes};
use fake::faker::lorem::en::Sentence;
use fake::Fake;

/// A named sequence, stored under its name as `_id`.
#[derive(Debug, Clone, Default, PartialEq, Convertible)]
pub struct Counter {
    #[converter(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

impl Entity for Counter {}

#[derive(Debug, Clone, Default, Convertible, Indexes)]
#[indexes(unique = "number_id")]
pub struct Paper {
    #[converter(flatten)]
    pub meta: DefaultFields,
    pub number_id: i64,
    pub title: String,
}

impl Entity for Paper {
    fn default_fields(&mut self) -> Option<&mut DefaultFields> {
        Some(&mut self.meta)
    }
}

impl Paper {
    pub fn new(number_id: i64) -> Self {
        Paper {
            number_id,
            title: Sentence(3..6).fake(),
            ..Default::default()
        }
    }
}

/// Bumps the counter named `name` and returns nothing; the new value is read back later.
pub fn bump(counters: &Repository<Counter>, ctx: &Context, name: &str) -> RepoResult<()> {
    counters.update_one_with_options(
        ctx,
        doc! { _id: name },
        doc! { "$inc": { seq: (1i64) } },
        &UpdateOptions::new().upsert(true),
    )?;
    Ok(())
}
