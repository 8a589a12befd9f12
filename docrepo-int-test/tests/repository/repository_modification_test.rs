use std::thread;
use std::time::Duration;

use docrepo::common::{Value, DOC_ID};
use docrepo::doc;
use docrepo::repository::{Query, Repository, Update, UpdateMode};
use docrepo::store::UpdateOptions;
use docrepo_int_test::test_util::{cleanup, create_test_context, run_test};

use crate::repository::{Address, Resident, TestUser};

#[test]
fn test_insert_assigns_id_and_timestamps() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut user = TestUser::new("Ada", 36);

            let result = repo.insert_one(ctx.ctx(), &mut user)?;

            let id = user.meta.id.expect("id assigned");
            assert_eq!(result.inserted_id(), &Value::from(id));
            assert!(user.meta.created_at.is_some());
            assert!(user.meta.updated_at.is_some());

            let stored = ctx.store().documents("users");
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].get(DOC_ID), Some(&Value::from(id)));
            assert!(!stored[0].contains_key("bio"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_keeps_existing_id() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut first = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut first)?;

            let mut copy = TestUser::new("Grace", 40);
            copy.meta.id = first.meta.id;
            let err = repo.insert_one(ctx.ctx(), &mut copy).unwrap_err();

            assert!(err.is_duplicate_key());
            assert_eq!(copy.meta.id, first.meta.id);
            assert_eq!(repo.count(ctx.ctx(), doc! {})?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_many_assigns_distinct_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut users: Vec<TestUser> = (0..5).map(|_| TestUser::generate()).collect();

            let result = repo.insert_many(ctx.ctx(), &mut users)?;

            assert_eq!(result.inserted_ids().len(), 5);
            let mut ids: Vec<_> = users.iter().filter_map(|u| u.meta.id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 5);
            assert_eq!(repo.estimated_count(ctx.ctx())?, 5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_update_refreshes_updated_at() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut user = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut user)?;
            let id = user.meta.id.expect("id assigned");

            thread::sleep(Duration::from_millis(5));
            let mut patch = repo.get(ctx.ctx(), id)?;
            patch.age = 37;
            let result = repo.update_by_id(ctx.ctx(), id, Update::Typed(patch))?;
            assert_eq!(result.matched_count(), 1);
            assert_eq!(result.modified_count(), 1);

            let updated = repo.get(ctx.ctx(), id)?;
            assert_eq!(updated.age, 37);
            assert_eq!(updated.meta.created_at, user.meta.created_at);
            assert!(updated.meta.updated_at > updated.meta.created_at);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_update_skips_zero_fields() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut user = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut user)?;

            let patch = TestUser {
                age: 50,
                ..Default::default()
            };
            repo.update_one(
                ctx.ctx(),
                Query::Typed(TestUser {
                    name: "Ada".into(),
                    ..Default::default()
                }),
                Update::Typed(patch),
            )?;

            let found = repo.find_one(ctx.ctx(), doc! { name: "Ada" })?;
            assert_eq!(found.age, 50);
            assert_eq!(found.email, "ada@example.com");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_update_keeps_embedded_siblings() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<Resident> = ctx.repository("residents");
            let mut resident = Resident::new("Ada", "Oslo", 123);
            repo.insert_one(ctx.ctx(), &mut resident)?;
            let id = resident.meta.id.expect("id assigned");

            let result = repo.update_by_id(
                ctx.ctx(),
                id,
                Update::Typed(Resident {
                    address: Address {
                        city: "Bergen".into(),
                        zip: 0,
                    },
                    ..Default::default()
                }),
            )?;
            assert_eq!(result.modified_count(), 1);

            let stored = repo.get(ctx.ctx(), id)?;
            assert_eq!(stored.name, "Ada");
            assert_eq!(
                stored.address,
                Address {
                    city: "Bergen".into(),
                    zip: 123,
                }
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_typed_upsert_seeds_embedded_fields() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<Resident> = ctx.repository("residents");

            let result = repo.update_one_with_options(
                ctx.ctx(),
                Query::Typed(Resident {
                    address: Address {
                        city: "Oslo".into(),
                        zip: 0,
                    },
                    ..Default::default()
                }),
                Update::Typed(Resident {
                    name: "Ada".into(),
                    ..Default::default()
                }),
                &UpdateOptions::new().upsert(true),
            )?;
            assert!(result.upserted_id().is_some());

            let stored = ctx.store().documents("residents");
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].get_path("address.city"), Some(&Value::from("Oslo")));
            assert!(!stored[0].contains_key("address.city"));

            let ada = repo.find_one(ctx.ctx(), doc! { name: "Ada" })?;
            assert_eq!(ada.address.city, "Oslo");
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_all_fields_mode_writes_zero_values() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = Repository::builder(ctx.store().collection("users"))
                .update_mode(UpdateMode::AllFields)
                .build();
            let mut user = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut user)?;
            let id = user.meta.id.expect("id assigned");

            let mut patch = repo.get(ctx.ctx(), id)?;
            patch.email = String::new();
            repo.update_by_id(ctx.ctx(), id, Update::Typed(patch))?;

            let stored = repo.get(ctx.ctx(), id)?;
            assert_eq!(stored.email, "");
            assert_eq!(stored.meta.created_at, user.meta.created_at);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_raw_update_many_and_upsert() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut users = vec![TestUser::new("Ada", 36), TestUser::new("Grace", 40)];
            repo.insert_many(ctx.ctx(), &mut users)?;

            let result = repo.update_many(ctx.ctx(), doc! {}, doc! { "$inc": { age: 1 } })?;
            assert_eq!(result.matched_count(), 2);
            assert_eq!(result.modified_count(), 2);
            assert_eq!(repo.count(ctx.ctx(), doc! { age: 41 })?, 1);

            let result = repo.update_one_with_options(
                ctx.ctx(),
                doc! { name: "Linus" },
                doc! { "$set": { age: 28 } },
                &UpdateOptions::new().upsert(true),
            )?;
            assert_eq!(result.matched_count(), 0);
            assert!(result.upserted_id().is_some());

            let linus = repo.find_one(ctx.ctx(), doc! { name: "Linus" })?;
            assert_eq!(linus.age, 28);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_one_and_many() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut users = vec![
                TestUser::new("Ada", 36),
                TestUser::new("Grace", 36),
                TestUser::new("Linus", 28),
            ];
            repo.insert_many(ctx.ctx(), &mut users)?;

            assert_eq!(repo.delete_one(ctx.ctx(), doc! { age: 36 })?, 1);
            assert_eq!(repo.delete_many(ctx.ctx(), doc! { age: { "$gte": 20 } })?, 2);
            assert_eq!(repo.delete_many(ctx.ctx(), doc! {})?, 0);
            assert!(ctx.store().documents("users").is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_update_returns_updated_entity() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut user = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut user)?;

            let raw = repo.find_one_and_update(ctx.ctx(), doc! { name: "Ada" }, doc! { "$inc": { age: 1 } })?;
            assert_eq!(raw.age, 37);
            assert_eq!(raw.bio, "Ada is 37 years old.");

            let typed = repo.find_one_and_update(
                ctx.ctx(),
                doc! { name: "Ada" },
                Update::Typed(TestUser {
                    age: 40,
                    ..Default::default()
                }),
            )?;
            assert_eq!(typed.age, 40);
            assert_eq!(typed.meta.id, user.meta.id);

            let err = repo
                .find_one_and_update(ctx.ctx(), doc! { name: "Nobody" }, doc! { "$inc": { age: 1 } })
                .unwrap_err();
            assert!(err.is_not_found());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_and_delete() {
    run_test(
        create_test_context,
        |ctx| {
            let repo: Repository<TestUser> = ctx.repository("users");
            let mut user = TestUser::new("Ada", 36);
            repo.insert_one(ctx.ctx(), &mut user)?;

            let deleted = repo.find_one_and_delete(ctx.ctx(), doc! { name: "Ada" })?;
            assert_eq!(deleted.meta.id, user.meta.id);
            assert_eq!(deleted.bio, "Ada is 36 years old.");
            assert_eq!(repo.count(ctx.ctx(), doc! {})?, 0);

            let err = repo.find_one_and_delete(ctx.ctx(), doc! { name: "Ada" }).unwrap_err();
            assert!(err.is_not_found());
            Ok(())
        },
        cleanup,
    )
}
