use crate::memory_store::MemoryStore;
use docrepo::common::Context;
use docrepo::errors::RepoResult;
use docrepo::repository::{Entity, Repository};
use docrepo::store::Client;
use docrepo::transaction::Transactor;
use std::backtrace::Backtrace;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread so a failing test reports its own backtrace.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> RepoResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> RepoResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> RepoResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();
        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", message)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A fresh store plus a background request context.
#[derive(Clone)]
pub struct TestContext {
    store: MemoryStore,
    ctx: Context,
}

impl TestContext {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            ctx: Context::background(),
        }
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn client(&self) -> Client {
        self.store.client()
    }

    pub fn transactor(&self) -> Transactor {
        Transactor::new(self.store.client())
    }

    pub fn repository<T: Entity>(&self, collection: &str) -> Repository<T> {
        Repository::new(self.store.collection(collection))
    }
}

pub fn create_test_context() -> RepoResult<TestContext> {
    Ok(TestContext::new(MemoryStore::new()))
}

pub fn cleanup(ctx: TestContext) -> RepoResult<()> {
    let stats = ctx.store().stats();
    if stats.started != stats.ended {
        log::warn!(
            "{} sessions started but {} ended",
            stats.started,
            stats.ended
        );
    }
    Ok(())
}
