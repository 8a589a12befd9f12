use docrepo::doc;
use docrepo::errors::RepoResult;
use docrepo::repository::{DefaultFields, Entity, Repository};
use docrepo_derive::{Convertible, Indexes};
use docrepo_int_test::test_util::{cleanup, create_test_context};

#[derive(Debug, Convertible, Default, Indexes)]
#[indexes(index = "processed,-first_name")]
pub struct StressRecord {
    #[converter(flatten)]
    pub meta: DefaultFields,
    pub first_name: String,
    pub last_name: String,
    pub processed: bool,
    pub failed: bool,
}

impl Entity for StressRecord {
    fn default_fields(&mut self) -> Option<&mut DefaultFields> {
        Some(&mut self.meta)
    }
}

fn main() -> RepoResult<()> {
    println!("Starting stress test...");
    let test_ctx = create_test_context()?;
    let ctx = test_ctx.ctx().clone();

    let count = 10000;
    let repo: Repository<StressRecord> = test_ctx.repository("stress_records");
    repo.ensure_indexes_by_model(&ctx, &StressRecord::default())?;

    let start = std::time::Instant::now();
    let mut records: Vec<StressRecord> = (0..count)
        .map(|_| StressRecord {
            first_name: uuid::Uuid::new_v4().to_string(),
            last_name: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        })
        .collect();
    repo.insert_many(&ctx, &mut records)?;
    println!("Inserted {} records in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let found = repo.find(&ctx, doc! { failed: false })?;
    println!("Found {} records in {:?}", found.len(), start.elapsed());

    let start = std::time::Instant::now();
    let result = repo.update_many(&ctx, doc! {}, doc! { "$set": { processed: true } })?;
    println!(
        "Updated {} records in {:?}",
        result.modified_count(),
        start.elapsed()
    );

    let start = std::time::Instant::now();
    let processed = repo.count(&ctx, doc! { processed: true })?;
    println!("Counted {} processed records in {:?}", processed, start.elapsed());

    cleanup(test_ctx)
}
