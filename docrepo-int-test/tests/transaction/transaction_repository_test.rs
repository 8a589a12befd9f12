use docrepo::doc;
use docrepo::errors::{ErrorKind, RepoError};
use docrepo::repository::Repository;
use docrepo::store::{ReadConcern, TransactionOptions};
use docrepo::transaction::do_transaction;
use docrepo_int_test::memory_store::SessionStats;
use docrepo_int_test::test_util::{cleanup, create_test_context, run_test, TestContext};

use crate::transaction::{bump, Counter, Paper};

fn repositories(ctx: &TestContext) -> (Repository<Counter>, Repository<Paper>) {
    let counters: Repository<Counter> = ctx.repository("counters");
    let papers: Repository<Paper> = ctx.repository("papers");
    papers
        .ensure_indexes_by_model(ctx.ctx(), &Paper::default())
        .expect("paper indexes");
    (counters, papers)
}

#[test]
fn test_commit_applies_every_write() {
    run_test(
        create_test_context,
        |ctx| {
            let (counters, papers) = repositories(&ctx);

            let paper = ctx.transactor().run(ctx.ctx(), |tx_ctx| {
                bump(&counters, tx_ctx, "papers")?;
                let mut paper = Paper::new(1);
                papers.insert_one(tx_ctx, &mut paper)?;
                Ok(paper)
            })?;

            assert!(paper.meta.id.is_some());
            assert_eq!(counters.get(ctx.ctx(), "papers")?.seq, 1);
            assert_eq!(papers.get(ctx.ctx(), paper.meta.id.unwrap())?.number_id, 1);
            assert_eq!(
                ctx.store().stats(),
                SessionStats {
                    started: 1,
                    ended: 1,
                    committed: 1,
                    aborted: 0,
                }
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_writes_are_invisible_until_commit() {
    run_test(
        create_test_context,
        |ctx| {
            let (_, papers) = repositories(&ctx);

            ctx.transactor().run(ctx.ctx(), |tx_ctx| {
                papers.insert_one(tx_ctx, &mut Paper::new(7))?;
                assert_eq!(papers.count(tx_ctx, doc! {})?, 1);
                assert_eq!(papers.count(ctx.ctx(), doc! {})?, 0);
                Ok(())
            })?;

            assert_eq!(papers.count(ctx.ctx(), doc! {})?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_key_aborts_the_whole_transaction() {
    run_test(
        create_test_context,
        |ctx| {
            let (counters, papers) = repositories(&ctx);
            let transactor = ctx.transactor();

            transactor.run(ctx.ctx(), |tx_ctx| {
                bump(&counters, tx_ctx, "papers")?;
                papers.insert_one(tx_ctx, &mut Paper::new(1))
            })?;

            let err = transactor
                .run(ctx.ctx(), |tx_ctx| {
                    bump(&counters, tx_ctx, "papers")?;
                    papers.insert_one(tx_ctx, &mut Paper::new(1))
                })
                .unwrap_err();

            assert!(err.is_duplicate_key());
            assert_eq!(counters.get(ctx.ctx(), "papers")?.seq, 1);
            assert_eq!(papers.count(ctx.ctx(), doc! {})?, 1);
            assert_eq!(
                ctx.store().stats(),
                SessionStats {
                    started: 2,
                    ended: 2,
                    committed: 1,
                    aborted: 1,
                }
            );
            assert_eq!(ctx.store().open_sessions(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_callback_error_is_returned_unchanged() {
    run_test(
        create_test_context,
        |ctx| {
            let (_, papers) = repositories(&ctx);

            let err = ctx
                .transactor()
                .run(ctx.ctx(), |tx_ctx| -> docrepo::errors::RepoResult<()> {
                    papers.insert_one(tx_ctx, &mut Paper::new(3))?;
                    Err(RepoError::new("title rejected", ErrorKind::ValidationError))
                })
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(err.message(), "title rejected");
            assert_eq!(papers.count(ctx.ctx(), doc! {})?, 0);
            assert_eq!(ctx.store().stats().aborted, 1);
            assert_eq!(ctx.store().stats().ended, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_commit_failure_discards_writes() {
    run_test(
        create_test_context,
        |ctx| {
            let (_, papers) = repositories(&ctx);
            ctx.store().fail_next_commit(RepoError::new(
                "write conflict",
                ErrorKind::TransactionAborted,
            ));

            let err = ctx
                .transactor()
                .run(ctx.ctx(), |tx_ctx| {
                    papers.insert_one(tx_ctx, &mut Paper::new(4))
                })
                .unwrap_err();

            assert_eq!(err.kind(), &ErrorKind::TransactionAborted);
            assert_eq!(papers.count(ctx.ctx(), doc! {})?, 0);
            assert_eq!(ctx.store().stats().committed, 0);
            assert_eq!(ctx.store().stats().ended, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_session_start_failure_skips_callback() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.store().fail_next_session_start(RepoError::new(
                "no servers available",
                ErrorKind::SessionError,
            ));

            let mut ran = false;
            let err = ctx
                .transactor()
                .run(ctx.ctx(), |_| {
                    ran = true;
                    Ok(())
                })
                .unwrap_err();

            assert!(!ran);
            assert_eq!(err.kind(), &ErrorKind::SessionError);
            assert_eq!(ctx.store().stats(), SessionStats::default());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_do_transaction_with_snapshot_reads() {
    run_test(
        create_test_context,
        |ctx| {
            let (_, papers) = repositories(&ctx);
            papers.insert_many(ctx.ctx(), &mut [Paper::new(1), Paper::new(2)])?;

            let seen = do_transaction(&ctx.client(), ctx.ctx(), |tx_ctx| {
                papers.count(tx_ctx, doc! { number_id: { "$gt": (1i64) } })
            })?;
            assert_eq!(seen, 1);

            let options = TransactionOptions::new().read_concern(ReadConcern::Snapshot);
            let removed = ctx.transactor().run_with_options(ctx.ctx(), &options, |tx_ctx| {
                papers.delete_many(tx_ctx, doc! {})
            })?;
            assert_eq!(removed, 2);
            assert_eq!(papers.count(ctx.ctx(), doc! {})?, 0);
            Ok(())
        },
        cleanup,
    )
}
