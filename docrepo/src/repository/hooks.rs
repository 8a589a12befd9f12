use crate::common::Context;
use crate::repository::Entity;
use std::ops::{Deref, DerefMut};

/// Runs an after-hook on every guarded entity when the guard goes out of scope.
///
/// The guard is created right after the matching before-hook, so the after-hook fires on
/// every exit path of the operation: success, an early `?` return, or a panic unwinding
/// through the repository.
pub(crate) struct AfterHookGuard<'a, T: Entity> {
    ctx: &'a Context,
    entities: &'a mut [T],
    hook: fn(&mut T, &Context),
}

impl<'a, T: Entity> AfterHookGuard<'a, T> {
    pub(crate) fn new(ctx: &'a Context, entities: &'a mut [T], hook: fn(&mut T, &Context)) -> Self {
        AfterHookGuard {
            ctx,
            entities,
            hook,
        }
    }
}

impl<T: Entity> Deref for AfterHookGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.entities
    }
}

impl<T: Entity> DerefMut for AfterHookGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.entities
    }
}

impl<T: Entity> Drop for AfterHookGuard<'_, T> {
    fn drop(&mut self) {
        log::debug!("Running after-hooks on {} entities", self.entities.len());
        for entity in self.entities.iter_mut() {
            (self.hook)(entity, self.ctx);
        }
    }
}
