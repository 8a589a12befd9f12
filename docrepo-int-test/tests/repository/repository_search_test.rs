use docrepo::common::{SortOrder, Value};
use docrepo::doc;
use docrepo::repository::{Query, Repository};
use docrepo::store::{CountOptions, FindOptions};
use docrepo_int_test::test_util::{cleanup, create_test_context, run_test, TestContext};

use crate::repository::{Address, AgeGroup, Resident, TestUser};

fn seed(ctx: &TestContext) -> Repository<TestUser> {
    let repo: Repository<TestUser> = ctx.repository("users");
    let mut users = vec![
        TestUser::new("Ada", 36),
        TestUser::new("Grace", 45),
        TestUser::new("Linus", 28),
        TestUser::new("Barbara", 36),
    ];
    repo.insert_many(ctx.ctx(), &mut users)
        .expect("seed users");
    repo
}

#[test]
fn test_find_runs_after_find_on_every_entity() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);
            let users = repo.find(ctx.ctx(), doc! {})?;

            assert_eq!(users.len(), 4);
            assert_eq!(users[0].bio, "Ada is 36 years old.");
            assert!(users.iter().all(|u| !u.bio.is_empty()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_without_match_is_empty() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);
            let users = repo.find(ctx.ctx(), doc! { age: { "$gt": 100 } })?;
            assert!(users.is_empty());

            let err = repo.find_one(ctx.ctx(), doc! { name: "Nobody" }).unwrap_err();
            assert!(err.is_not_found());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_filter_uses_populated_fields_only() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);

            let by_age = repo.find(
                ctx.ctx(),
                Query::Typed(TestUser {
                    age: 36,
                    ..Default::default()
                }),
            )?;
            assert_eq!(by_age.len(), 2);

            let grace = repo.find_one(
                ctx.ctx(),
                Query::Typed(TestUser {
                    name: "Grace".into(),
                    ..Default::default()
                }),
            )?;
            assert_eq!(grace.age, 45);

            let everyone = repo.count(ctx.ctx(), Query::Typed(TestUser::default()))?;
            assert_eq!(everyone, 4);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_filter_matches_embedded_fields_by_path() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<Resident> = ctx.repository("residents");
            let mut residents = vec![
                Resident::new("Ada", "Oslo", 0),
                Resident::new("Grace", "Oslo", 150),
                Resident::new("Linus", "Helsinki", 100),
            ];
            repo.insert_many(ctx.ctx(), &mut residents)?;

            let in_oslo = repo.find(
                ctx.ctx(),
                Query::Typed(Resident {
                    address: Address {
                        city: "Oslo".into(),
                        zip: 0,
                    },
                    ..Default::default()
                }),
            )?;
            let names: Vec<&str> = in_oslo.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["Ada", "Grace"]);

            let grace = repo.find_one(
                ctx.ctx(),
                Query::Typed(Resident {
                    name: "Grace".into(),
                    address: Address {
                        city: "Oslo".into(),
                        zip: 0,
                    },
                    ..Default::default()
                }),
            )?;
            assert_eq!(grace.address.zip, 150);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_sort_skip_and_limit() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);
            let options = FindOptions::new()
                .sort_by("age", SortOrder::Descending)
                .skip(1)
                .limit(2);

            let users = repo.find_with_options(ctx.ctx(), doc! {}, &options)?;
            let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
            assert_eq!(names, vec!["Ada", "Barbara"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_counts_and_distinct() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);

            assert_eq!(repo.count(ctx.ctx(), doc! { age: 36 })?, 2);
            assert_eq!(repo.count_documents(ctx.ctx(), doc! {})?, 4);
            assert_eq!(
                repo.count_with_options(ctx.ctx(), doc! {}, &CountOptions::new().skip(1).limit(2))?,
                2
            );
            assert_eq!(repo.estimated_document_count(ctx.ctx())?, 4);

            let ages = repo.distinct(ctx.ctx(), "age", doc! {})?;
            assert_eq!(ages, vec![Value::I32(36), Value::I32(45), Value::I32(28)]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_aggregate_replaces_results() {
    run_test(
        create_test_context,
        |ctx| {
            let repo = seed(&ctx);
            let mut groups = vec![AgeGroup {
                age: 1,
                total: 99,
            }];

            repo.aggregate(
                ctx.ctx(),
                vec![
                    doc! { "$group": { _id: "$age", total: { "$sum": 1 } } },
                    doc! { "$sort": { _id: 1 } },
                ],
                &mut groups,
            )?;

            assert_eq!(
                groups,
                vec![
                    AgeGroup { age: 28, total: 1 },
                    AgeGroup { age: 36, total: 2 },
                    AgeGroup { age: 45, total: 1 },
                ]
            );
            Ok(())
        },
        cleanup,
    )
}
