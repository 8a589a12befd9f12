use docrepo::common::Value;
use docrepo::doc;
use docrepo::errors::ErrorKind;
use docrepo::index::{unique_index, IndexModel};
use docrepo::repository::Repository;
use docrepo_int_test::test_util::{cleanup, create_test_context, run_test};

use crate::repository::TestUser;

fn index_names(repo: &Repository<TestUser>, ctx: &docrepo::common::Context) -> Vec<String> {
    repo.list_indexes(ctx)
        .expect("list indexes")
        .iter()
        .filter_map(|index| index.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

#[test]
fn test_ensure_indexes_compiles_expressions() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");

            let names = repo.ensure_indexes(
                ctx.ctx(),
                &["email"],
                &["name,-age", " created_at "],
                vec![IndexModel::new(doc! { bio: "text" })],
            )?;

            assert_eq!(names, vec!["email_1", "name_1_age_-1", "created_at_1", "bio_text"]);
            assert_eq!(
                index_names(&repo, ctx.ctx()),
                vec!["_id_", "email_1", "name_1_age_-1", "created_at_1", "bio_text"]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_expression_creates_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");

            let err = repo
                .ensure_indexes(ctx.ctx(), &["email"], &["name,-age", " , created_at"], vec![])
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(index_names(&repo, ctx.ctx()), vec!["_id_"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_ensure_indexes_with_nothing_to_create() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let none: [&str; 0] = [];

            let names = repo.ensure_indexes(ctx.ctx(), &none, &none, vec![])?;

            assert!(names.is_empty());
            assert_eq!(index_names(&repo, ctx.ctx()), vec!["_id_"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_declared_indexes_enforce_uniqueness() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let names = repo.ensure_indexes_by_model(ctx.ctx(), &TestUser::default())?;
            assert_eq!(names, vec!["email_1", "name_1_age_-1"]);

            repo.insert_one(ctx.ctx(), &mut TestUser::new("Ada", 36))?;
            let err = repo
                .insert_one(ctx.ctx(), &mut TestUser::new("Ada", 37))
                .unwrap_err();
            assert!(err.is_duplicate_key());
            assert_eq!(repo.count(ctx.ctx(), doc! {})?, 1);

            // creating the same indexes again is a no-op
            let again = repo.ensure_indexes_by_model(ctx.ctx(), &TestUser::default())?;
            assert_eq!(again, names);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_index_over_duplicates_fails() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            repo.insert_one(ctx.ctx(), &mut TestUser::new("Ada", 36))?;
            repo.insert_one(ctx.ctx(), &mut TestUser::new("Grace", 36))?;

            let by_age = IndexModel::with_options(doc! { age: 1 }, unique_index());
            let err = repo
                .ensure_indexes::<&str, &str>(ctx.ctx(), &[], &[], vec![by_age])
                .unwrap_err();
            assert!(err.is_duplicate_key());
            assert_eq!(index_names(&repo, ctx.ctx()), vec!["_id_"]);
            Ok(())
        },
        cleanup,
    )
}
